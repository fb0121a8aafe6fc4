//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `api` - hyper HTTP server exposing create/download/metadata routes
//! - `client` - reqwest client for the export API (consumer side)
//! - `authority` - reqwest client for the external proof authority
//! - `prometheus` - Prometheus text exposition served at /metrics

pub mod api;
pub mod authority;
pub mod client;
pub mod prometheus;

// Re-export commonly used types
pub use api::{serve, start_api_server, ApiState};
pub use authority::AuthorityAttestor;
pub use client::{DownloadedExport, ExportClient};
