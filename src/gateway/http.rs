//! REST gateway client.
//!
//! Every response is wrapped in a `{code, message, data}` envelope where
//! `code = 200` is success. Non-200 envelopes become
//! [`GatewayFailure::Rejected`] carrying the envelope message; HTTP errors
//! without a decodable envelope become [`GatewayFailure::Network`].
//!
//! Invocation requests carry no client-side timeout: the dispatcher owns the
//! ceiling and cancels through the token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, RequestBuilder, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tokio_util::sync::CancellationToken;

use crate::config::{GatewayConfig, resolve_env_vars};
use crate::error::SwitchboardError;
use crate::gateway::{Gateway, GatewayFailure, GatewayResult};
use crate::record::{ServerRecord, ToolCallResult, ToolDescriptor};

#[derive(Debug, Deserialize)]
struct Envelope {
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

/// Gateway backed by the backend's REST API.
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: Url,
    request_timeout: Duration,
}

impl HttpGateway {
    /// Build a client from config, resolving `${VAR}` header references.
    pub fn new(config: &GatewayConfig) -> crate::Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            SwitchboardError::Config(format!(
                "gateway.base_url '{}' is not a valid URL: {}",
                config.base_url, e
            ))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(SwitchboardError::Config(format!(
                "gateway.base_url '{}' cannot be used as a base URL",
                config.base_url
            )));
        }

        let mut headers = HeaderMap::new();
        for (key, value) in resolve_env_vars(&config.headers) {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                SwitchboardError::Config(format!("invalid header name '{}': {}", key, e))
            })?;
            let value = HeaderValue::from_str(&value).map_err(|e| {
                SwitchboardError::Config(format!("invalid value for header '{}': {}", key, e))
            })?;
            headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| SwitchboardError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            request_timeout: config.request_timeout(),
        })
    }

    /// Append percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        self.client
            .request(method, self.endpoint(segments))
            .timeout(self.request_timeout)
    }

    /// Send a request and unwrap the envelope, returning its `data`.
    async fn send(&self, request: RequestBuilder) -> GatewayResult<Option<Value>> {
        let response = request
            .send()
            .await
            .map_err(|e| GatewayFailure::Network(e.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| GatewayFailure::Network(e.to_string()))?;

        let envelope: Envelope = match serde_json::from_slice(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(GatewayFailure::Network(format!("HTTP {}", status)));
            }
            Err(e) => return Err(GatewayFailure::Malformed(e.to_string())),
        };

        if envelope.code != 200 {
            let message = if envelope.message.is_empty() {
                format!("request failed with code {}", envelope.code)
            } else {
                envelope.message
            };
            return Err(GatewayFailure::Rejected {
                code: envelope.code,
                message,
            });
        }

        Ok(envelope.data)
    }
}

/// Decode `data.{field}`, failing when it is absent.
fn required_field<T: DeserializeOwned>(data: Option<Value>, field: &str) -> GatewayResult<T> {
    let value = data
        .and_then(|mut d| d.get_mut(field).map(Value::take))
        .filter(|v| !v.is_null())
        .ok_or_else(|| GatewayFailure::Malformed(format!("response data is missing '{}'", field)))?;
    serde_json::from_value(value).map_err(|e| GatewayFailure::Malformed(format!("'{}': {}", field, e)))
}

/// Decode a list at `data.{field}`; absent or null means empty.
fn list_field<T: DeserializeOwned>(data: Option<Value>, field: &str) -> GatewayResult<Vec<T>> {
    match data.and_then(|mut d| d.get_mut(field).map(Value::take)) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value)
            .map_err(|e| GatewayFailure::Malformed(format!("'{}': {}", field, e))),
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn list_servers(&self) -> GatewayResult<Vec<ServerRecord>> {
        let data = self.send(self.request(Method::GET, &["servers"])).await?;
        list_field(data, "servers")
    }

    async fn get_server(&self, name: &str) -> GatewayResult<ServerRecord> {
        let data = self.send(self.request(Method::GET, &["servers", name])).await?;
        required_field(data, "server")
    }

    async fn create_server(&self, record: &ServerRecord) -> GatewayResult<ServerRecord> {
        let request = self.request(Method::POST, &["servers"]).json(record);
        required_field(self.send(request).await?, "server")
    }

    async fn update_server(&self, name: &str, record: &ServerRecord) -> GatewayResult<ServerRecord> {
        let request = self.request(Method::PUT, &["servers", name]).json(record);
        required_field(self.send(request).await?, "server")
    }

    async fn delete_server(&self, name: &str) -> GatewayResult<()> {
        self.send(self.request(Method::DELETE, &["servers", name]))
            .await
            .map(|_| ())
    }

    async fn toggle_server(&self, name: &str, is_active: bool) -> GatewayResult<ServerRecord> {
        let request = self
            .request(Method::PATCH, &["servers", name, "toggle"])
            .json(&json!({ "isActive": is_active }));
        required_field(self.send(request).await?, "server")
    }

    async fn list_tools(&self, name: &str) -> GatewayResult<Vec<ToolDescriptor>> {
        let data = self
            .send(self.request(Method::GET, &["servers", name, "tools"]))
            .await?;
        list_field(data, "tools")
    }

    async fn toggle_tool(
        &self,
        name: &str,
        tool: &str,
        is_enabled: bool,
    ) -> GatewayResult<ToolDescriptor> {
        let request = self
            .request(Method::PATCH, &["servers", name, "tools", tool, "toggle"])
            .json(&json!({ "isEnabled": is_enabled }));
        required_field(self.send(request).await?, "tool")
    }

    async fn call_tool(
        &self,
        name: &str,
        tool: &str,
        arguments: Map<String, Value>,
        cancel: CancellationToken,
    ) -> GatewayResult<ToolCallResult> {
        let request = self
            .client
            .post(self.endpoint(&["servers", name, "tools", tool, "test"]))
            .json(&arguments);

        // Dropping the in-flight request closes the connection.
        let data = tokio::select! {
            result = self.send(request) => result?,
            _ = cancel.cancelled() => {
                return Err(GatewayFailure::Network("call cancelled".to_string()));
            }
        };
        required_field(data, "result")
    }
}
