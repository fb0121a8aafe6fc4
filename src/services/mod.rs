//! Services - the export pipeline
//!
//! This module contains the core business logic:
//! - `canonicalizer` - filters a store snapshot down to a customer subset
//! - `fingerprint` - SHA-256 over the canonical document encoding
//! - `registry` - in-memory export id -> export record map
//! - `attestation` - pluggable proof providers with local fallback
//! - `export_service` - create/retrieve orchestration
//! - `verification` - consumer-side fingerprint comparison

pub mod attestation;
pub mod canonicalizer;
pub mod export_service;
pub mod fingerprint;
pub mod registry;
pub mod verification;

// Re-export commonly used types
pub use attestation::{AttestationProvider, FallbackAttestor, LocalFallbackAttestor};
pub use canonicalizer::canonicalize;
pub use export_service::{ExportService, RetrievedExport};
pub use fingerprint::fingerprint;
pub use registry::ExportRegistry;
pub use verification::{verify_document, verify_download, VerificationOutcome, VerificationReport};
