//! Transfer lifecycle service
//!
//! **Ingest:** validate → assemble artifact → fingerprint → persist record →
//! notify recipient and sender.
//!
//! **Download:** check expiry → open blob → flip `downloaded` once → notify
//! sender on the first download only.
//!
//! The service holds no lock of its own. Concurrent operations on different
//! transfers proceed independently; operations on the same transfer are
//! serialized only where the database requires it.

mod download;
mod helpers;
mod ingest;
mod status;
mod types;

use crate::db::TransferDb;
use crate::files::StorageArea;
use crate::notify::Notifier;

pub use types::{
    Download, DownloadWarning, IngestOutcome, IngestRequest, ServiceConfig, TransferState,
    TransferStatus, VerifyReport,
};

/// Entry point for every transfer operation
#[derive(Clone)]
pub struct TransferService {
    db: TransferDb,
    storage: StorageArea,
    notifier: Notifier,
    config: ServiceConfig,
}

impl TransferService {
    pub fn new(
        db: TransferDb,
        storage: StorageArea,
        notifier: Notifier,
        config: ServiceConfig,
    ) -> Self {
        Self {
            db,
            storage,
            notifier,
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Download link for a transfer id
    pub fn download_link(&self, id: &str) -> String {
        helpers::download_link(&self.config.base_url, id)
    }
}
