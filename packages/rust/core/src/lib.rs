//! Orchestration layer for DocBridge.
//!
//! Ties connection storage, capability detection, and the adapter
//! strategies together into the import-facing service surface.

pub mod service;

pub use service::{
    ConnectionValidation, IntegrationDocumentService, ListSourceOptions,
};
