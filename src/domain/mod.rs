//! Domain models - CRM records and export types
//!
//! This module contains the canonical data types used throughout the system:
//! - `Customer`, `Job`, `Note` - the three record kinds
//! - `StoreSnapshot` - the client-held record store
//! - `ExportDocument` - canonical, id-ordered projection of a customer subset
//! - `ExportRecord` / `ExportReceipt` - stored export and its creation metadata
//! - `ExportError` - error taxonomy shared by every layer

pub mod error;
pub mod request;
pub mod store;
pub mod types;

// Re-export commonly used types at module level
pub use error::ExportError;
pub use request::CreateExportRequest;
pub use store::{NewJob, NewNote, StoreSnapshot};
pub use types::{
    Attestation, AttestationSource, Customer, ExportDocument, ExportId, ExportReceipt,
    ExportRecord, Fingerprint, Job, JobStatus, Note, ParentType, RecordId,
};
