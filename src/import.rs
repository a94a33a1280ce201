//! Bulk import of `{"mcpServers": {...}}` documents.
//!
//! The format is the one desktop MCP clients write: each map key is a server
//! name and each value a transport definition. Definitions without a `type`
//! are inferred as stdio when they carry a `command`, SSE when they carry a
//! `url`.

use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{OpContext, SwitchboardError};
use crate::gateway::{Gateway, GatewayOp};
use crate::record::ServerRecord;
use crate::registry::Registry;

/// Outcome of one bulk import.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub imported: Vec<String>,
    /// Names already registered, left untouched.
    pub skipped: Vec<String>,
    pub failed: Vec<ImportFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportFailure {
    pub name: String,
    pub error: String,
}

impl ImportReport {
    fn fail(&mut self, name: &str, error: impl ToString) {
        self.failed.push(ImportFailure {
            name: name.to_string(),
            error: error.to_string(),
        });
    }
}

fn invalid_document(msg: &str) -> SwitchboardError {
    SwitchboardError::Validation("import".to_string(), msg.to_string())
}

/// Turn one `mcpServers` entry into a record, filling the name and type.
fn decode_definition(name: &str, definition: Value) -> crate::Result<ServerRecord> {
    let Value::Object(mut fields) = definition else {
        return Err(SwitchboardError::Validation(
            name.to_string(),
            "server definition must be a JSON object".to_string(),
        ));
    };
    fields.insert("name".to_string(), Value::String(name.to_string()));
    if !fields.contains_key("type") {
        let inferred = if fields.contains_key("command") {
            "stdio"
        } else if fields.contains_key("url") || fields.contains_key("baseUrl") {
            "sse"
        } else {
            return Err(SwitchboardError::Validation(
                name.to_string(),
                "cannot infer transport: definition has neither command nor url".to_string(),
            ));
        };
        fields.insert("type".to_string(), Value::String(inferred.to_string()));
    }
    if !fields.contains_key("isActive") {
        fields.insert("isActive".to_string(), Value::Bool(true));
    }

    let record: ServerRecord = serde_json::from_value(Value::Object(fields))
        .map_err(|e| SwitchboardError::Validation(name.to_string(), e.to_string()))?;
    record.validate()?;
    Ok(record)
}

impl<G: Gateway> Registry<G> {
    /// Register every server in an `mcpServers` document.
    ///
    /// Existing names are skipped and per-entry failures collected; only a
    /// malformed document or a failed list refresh abort the import. The view
    /// is refreshed once at the end.
    pub async fn import_servers(&self, document: Value) -> crate::Result<ImportReport> {
        let Value::Object(mut root) = document else {
            return Err(invalid_document("import document must be a JSON object"));
        };
        let servers: Map<String, Value> = match root.remove("mcpServers") {
            Some(Value::Object(servers)) => servers,
            Some(_) => return Err(invalid_document("mcpServers must be an object")),
            None => return Err(invalid_document("document has no mcpServers section")),
        };

        let existing = self.refresh().await?;
        let mut report = ImportReport::default();

        for (name, definition) in servers {
            if existing.iter().any(|s| s.name == name) {
                tracing::debug!(server = %name, "already registered, skipping");
                report.skipped.push(name);
                continue;
            }
            let record = match decode_definition(&name, definition) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(server = %name, error = %e, "invalid server definition");
                    report.fail(&name, e);
                    continue;
                }
            };
            match self.gateway().create_server(&record).await {
                Ok(_) => {
                    tracing::info!(server = %name, transport = %record.transport.kind(), "server imported");
                    report.imported.push(name);
                }
                Err(failure) => {
                    let e = SwitchboardError::from_gateway(
                        GatewayOp::CreateServer,
                        OpContext::server(&name),
                        failure,
                    );
                    tracing::warn!(server = %name, error = %e, "import failed");
                    report.fail(&name, e);
                }
            }
        }

        if !report.imported.is_empty() {
            self.refresh().await?;
        }
        Ok(report)
    }

    /// Read an `mcpServers` JSON file and import it.
    pub async fn import_file(&self, path: &Path) -> crate::Result<ImportReport> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            invalid_document(&format!("failed to read {}: {}", path.display(), e))
        })?;
        let document: Value = serde_json::from_str(&content)
            .map_err(|e| invalid_document(&format!("{} is not valid JSON: {}", path.display(), e)))?;
        self.import_servers(document).await
    }
}
