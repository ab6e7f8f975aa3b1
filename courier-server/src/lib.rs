//! Courier file handoff service library
//!
//! The transfer lifecycle: ingest files into a single artifact, persist a
//! fingerprinted, expiring record, notify sender and recipient by email,
//! gate downloads on expiry, and sweep expired transfers.

pub mod constants;
pub mod db;
pub mod errors;
pub mod files;
pub mod notify;
pub mod sweeper;
pub mod testing;
pub mod transfers;

pub use errors::{NotFoundReason, TransferError};
pub use sweeper::{SweepReport, Sweeper};
pub use transfers::{
    Download, DownloadWarning, IngestOutcome, IngestRequest, ServiceConfig, TransferService,
    TransferState, TransferStatus, VerifyReport,
};
