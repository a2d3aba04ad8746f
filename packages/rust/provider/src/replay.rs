//! Scripted provider harness.
//!
//! [`ReplayProvider`] plays canned [`OperationOutcome`]s back from
//! per-operation queues, with call accounting so tests can assert how often
//! an operation or the catalog was touched. [`ReplayBundle`] is the JSON
//! form of a scripted provider (catalog + connection + responses) shared by
//! tests and the CLI.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use docbridge_shared::{
    Connection, ConnectionId, ConnectionStatus, DocBridgeError, Result,
};

use crate::{OperationDescriptor, OperationOutcome, Provider};

// ---------------------------------------------------------------------------
// ReplayProvider
// ---------------------------------------------------------------------------

/// One recorded execution, kept for test assertions.
#[derive(Debug, Clone)]
pub struct ExecutedCall {
    pub operation_id: String,
    pub params: Value,
}

/// A provider whose operation outcomes are scripted ahead of time.
pub struct ReplayProvider {
    name: String,
    display_name: String,
    operations: Vec<OperationDescriptor>,
    responses: Mutex<HashMap<String, VecDeque<OperationOutcome>>>,
    calls: Mutex<Vec<ExecutedCall>>,
    introspections: AtomicUsize,
    fail_introspection: bool,
}

impl ReplayProvider {
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            operations: Vec::new(),
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            introspections: AtomicUsize::new(0),
            fail_introspection: false,
        }
    }

    /// Declare the operation catalog.
    pub fn with_operations(mut self, ids: &[&str]) -> Self {
        self.operations = ids.iter().map(|id| OperationDescriptor::new(*id)).collect();
        self
    }

    /// Make catalog introspection fail, to exercise degraded detection.
    pub fn with_failing_introspection(mut self) -> Self {
        self.fail_introspection = true;
        self
    }

    /// Queue an outcome for one operation; outcomes replay in queue order.
    pub fn enqueue(&self, operation_id: &str, outcome: OperationOutcome) {
        self.responses
            .lock()
            .expect("response queue lock")
            .entry(operation_id.to_string())
            .or_default()
            .push_back(outcome);
    }

    /// Queue a successful outcome wrapping `data`.
    pub fn enqueue_data(&self, operation_id: &str, data: Value) {
        self.enqueue(operation_id, OperationOutcome::ok(data));
    }

    /// Every execution so far, in order.
    pub fn calls(&self) -> Vec<ExecutedCall> {
        self.calls.lock().expect("call log lock").clone()
    }

    /// How many times one operation has been executed.
    pub fn calls_for(&self, operation_id: &str) -> usize {
        self.calls
            .lock()
            .expect("call log lock")
            .iter()
            .filter(|c| c.operation_id == operation_id)
            .count()
    }

    /// How many times the catalog has been introspected.
    pub fn introspection_count(&self) -> usize {
        self.introspections.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for ReplayProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn operations(&self) -> Result<Vec<OperationDescriptor>> {
        self.introspections.fetch_add(1, Ordering::SeqCst);
        if self.fail_introspection {
            return Err(DocBridgeError::operation(
                &self.name,
                "operation catalog unavailable",
            ));
        }
        Ok(self.operations.clone())
    }

    async fn execute(
        &self,
        operation_id: &str,
        params: Value,
        _connection: &Connection,
    ) -> Result<OperationOutcome> {
        self.calls.lock().expect("call log lock").push(ExecutedCall {
            operation_id: operation_id.to_string(),
            params,
        });

        let next = self
            .responses
            .lock()
            .expect("response queue lock")
            .get_mut(operation_id)
            .and_then(VecDeque::pop_front);

        Ok(next.unwrap_or_else(|| {
            OperationOutcome::failure(format!("no scripted response for {operation_id}"))
        }))
    }
}

// ---------------------------------------------------------------------------
// ReplayBundle
// ---------------------------------------------------------------------------

/// Provider descriptor inside a bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleProvider {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub operations: Vec<String>,
}

/// Connection descriptor inside a bundle; unset fields take local defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleConnection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ConnectionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ConnectionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// One scripted response: either a full outcome envelope (an object with a
/// `success` flag) or a bare data value, shorthand for a successful outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BundleOutcome {
    Envelope(OperationOutcome),
    Data(Value),
}

impl From<BundleOutcome> for OperationOutcome {
    fn from(outcome: BundleOutcome) -> Self {
        match outcome {
            BundleOutcome::Envelope(envelope) => envelope,
            BundleOutcome::Data(data) => OperationOutcome::ok(data),
        }
    }
}

/// JSON script of one provider: catalog, connection, canned responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayBundle {
    pub provider: BundleProvider,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<BundleConnection>,
    #[serde(default)]
    pub responses: HashMap<String, Vec<BundleOutcome>>,
}

impl ReplayBundle {
    /// Load a bundle from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DocBridgeError::io(path, e))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Build the scripted provider with all responses queued.
    pub fn build_provider(&self) -> ReplayProvider {
        let display_name = self
            .provider
            .display_name
            .clone()
            .unwrap_or_else(|| self.provider.name.clone());

        let ops: Vec<&str> = self.provider.operations.iter().map(String::as_str).collect();
        let provider = ReplayProvider::new(&self.provider.name, display_name).with_operations(&ops);

        for (operation_id, outcomes) in &self.responses {
            for outcome in outcomes {
                provider.enqueue(operation_id, outcome.clone().into());
            }
        }
        provider
    }

    /// Build the connection record, filling unset fields with local defaults.
    pub fn build_connection(&self) -> Connection {
        let desc = self.connection.clone().unwrap_or_default();
        Connection {
            id: desc.id.unwrap_or_default(),
            provider_name: self.provider.name.clone(),
            workspace_id: desc.workspace_id.unwrap_or_else(|| "local".into()),
            display_name: desc.display_name,
            status: desc.status.unwrap_or(ConnectionStatus::Active),
            credentials: Some(Value::Object(serde_json::Map::new())),
            created_at: Utc::now(),
            last_used_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_connection() -> Connection {
        Connection {
            id: ConnectionId::new(),
            provider_name: "drive-x".into(),
            workspace_id: "ws-1".into(),
            display_name: None,
            status: ConnectionStatus::Active,
            credentials: None,
            created_at: Utc::now(),
            last_used_at: None,
        }
    }

    #[tokio::test]
    async fn outcomes_replay_in_queue_order() {
        let provider = ReplayProvider::new("drive-x", "Drive X").with_operations(&["listFiles"]);
        provider.enqueue_data("listFiles", json!({"page": 1}));
        provider.enqueue_data("listFiles", json!({"page": 2}));

        let conn = test_connection();
        let first = provider
            .execute("listFiles", json!({}), &conn)
            .await
            .expect("execute");
        let second = provider
            .execute("listFiles", json!({}), &conn)
            .await
            .expect("execute");

        assert_eq!(first.data, Some(json!({"page": 1})));
        assert_eq!(second.data, Some(json!({"page": 2})));
        assert_eq!(provider.calls_for("listFiles"), 2);
    }

    #[tokio::test]
    async fn exhausted_script_reports_failure_outcome() {
        let provider = ReplayProvider::new("drive-x", "Drive X").with_operations(&["listFiles"]);
        let outcome = provider
            .execute("listFiles", json!({}), &test_connection())
            .await
            .expect("execute");

        assert!(!outcome.success);
        let err = outcome.into_data("drive-x").unwrap_err();
        assert!(err.to_string().contains("no scripted response"));
    }

    #[test]
    fn failing_introspection_counts_attempts() {
        let provider = ReplayProvider::new("flaky", "Flaky").with_failing_introspection();
        assert!(provider.operations().is_err());
        assert!(provider.operations().is_err());
        assert_eq!(provider.introspection_count(), 2);
    }

    #[test]
    fn bundle_parses_shorthand_and_envelope_responses() {
        let raw = json!({
            "provider": {
                "name": "drive-x",
                "displayName": "Drive X",
                "operations": ["listFiles", "downloadFile"]
            },
            "connection": {"workspaceId": "ws-1"},
            "responses": {
                "listFiles": [
                    {"files": [], "nextPageToken": null},
                    {"success": false, "error": {"message": "quota exceeded"}}
                ]
            }
        });

        let bundle: ReplayBundle = serde_json::from_value(raw).expect("parse bundle");
        let provider = bundle.build_provider();
        let ops = provider.operations().expect("catalog");
        assert_eq!(ops.len(), 2);

        let conn = bundle.build_connection();
        assert_eq!(conn.workspace_id, "ws-1");
        assert_eq!(conn.provider_name, "drive-x");
        assert!(conn.is_active());
    }

    #[tokio::test]
    async fn bundle_envelope_failure_replays_as_failure() {
        let raw = json!({
            "provider": {"name": "drive-x", "operations": ["listFiles"]},
            "responses": {
                "listFiles": [
                    {"success": false, "error": {"message": "quota exceeded"}}
                ]
            }
        });

        let bundle: ReplayBundle = serde_json::from_value(raw).expect("parse bundle");
        let provider = bundle.build_provider();
        let outcome = provider
            .execute("listFiles", json!({}), &test_connection())
            .await
            .expect("execute");

        assert!(!outcome.success);
        assert_eq!(outcome.error.expect("error").message, "quota exceeded");
    }
}
