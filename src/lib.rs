//! CRM export library
//!
//! Deterministic export pipeline for customer/job/note records: canonical
//! document projection, SHA-256 fingerprinting, in-memory export registry,
//! HTTP transport and consumer-side verification.

pub mod domain;
pub mod infra;
pub mod io;
pub mod services;
