//! Provider execution contract for DocBridge.
//!
//! A provider is an opaque integration: it declares an operation catalog and
//! executes operations against its remote API. This crate owns that contract
//! plus the collaborator traits around it:
//! - [`Provider`] — catalog introspection + generic operation execution
//! - [`ProviderRegistry`] — name-keyed provider loading
//! - [`ConnectionStore`] — connection lookup and the mark-as-used signal
//! - [`ReplayProvider`] / [`ReplayBundle`] — a scripted harness standing in
//!   for live integrations in tests and the CLI
//!
//! Nothing here interprets operation semantics; the capability detector and
//! adapters do that by matching operation ids.

pub mod registry;
pub mod replay;
pub mod store;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use docbridge_shared::{Connection, DocBridgeError, Result};

// Re-export public API at crate root for ergonomic imports.
pub use registry::{ProviderRegistry, StaticRegistry};
pub use replay::{ReplayBundle, ReplayProvider};
pub use store::{ConnectionStore, InMemoryConnectionStore};

// ---------------------------------------------------------------------------
// Operation catalog
// ---------------------------------------------------------------------------

/// One entry in a provider's declared operation catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    /// Operation identifier, matched case-insensitively but preserved as-is.
    pub id: String,
    /// One-line description, when the provider ships one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl OperationDescriptor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Operation outcome
// ---------------------------------------------------------------------------

/// Error detail reported by a failed operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationFailure {
    pub message: String,
}

/// Result envelope of one provider operation execution.
///
/// Providers report failure in-band (`success: false` plus an optional
/// message) rather than through the transport error channel, which is
/// reserved for the call not happening at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationFailure>,
}

impl OperationOutcome {
    /// Successful outcome carrying a data payload.
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Failed outcome carrying the provider's message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(OperationFailure {
                message: message.into(),
            }),
        }
    }

    /// Unwrap the data payload, or surface the provider's failure message
    /// (falling back to a generic one when the provider supplied none).
    pub fn into_data(self, provider: &str) -> Result<Value> {
        if self.success {
            return Ok(self.data.unwrap_or(Value::Null));
        }
        let message = self
            .error
            .map(|e| e.message)
            .unwrap_or_else(|| "provider reported an unspecified failure".into());
        Err(DocBridgeError::operation(provider, message))
    }
}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// A loaded integration provider.
///
/// Identity and display name are opaque strings. The catalog may come from a
/// lazily loaded manifest, so introspection is fallible; execution performs
/// the actual remote call and is owned entirely by the implementation.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable provider name (e.g. `"internal-drive"`).
    fn name(&self) -> &str;

    /// Human-readable label (e.g. `"Internal Drive"`).
    fn display_name(&self) -> &str;

    /// Declared operation catalog.
    fn operations(&self) -> Result<Vec<OperationDescriptor>>;

    /// Execute one operation against the provider's remote API.
    async fn execute(
        &self,
        operation_id: &str,
        params: Value,
        connection: &Connection,
    ) -> Result<OperationOutcome>;
}
