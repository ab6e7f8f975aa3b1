//! Courier Common Library
//!
//! Shared types, validators, and utilities for the Courier file handoff service.

pub mod hash;
pub mod manifest;
pub mod time;
pub mod validators;

pub use manifest::{Manifest, ManifestEntry, format_size};

/// Default number of days a transfer stays downloadable
pub const DEFAULT_RETENTION_DAYS: u32 = 7;

/// Upper bound accepted for a per-transfer retention period
pub const MAX_RETENTION_DAYS: u32 = 365;

/// Buffer size for SHA-256 hashing operations (1MB for fewer syscalls)
pub const HASH_BUFFER_SIZE: usize = 1024 * 1024;

/// SMTP port that selects an implicit-TLS connection.
///
/// Every other port uses a plaintext connection upgraded with STARTTLS.
pub const SMTP_IMPLICIT_TLS_PORT: u16 = 465;

/// Default SMTP submission port (STARTTLS)
pub const DEFAULT_SMTP_PORT: u16 = 587;
