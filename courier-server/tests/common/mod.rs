//! Shared setup for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use courier_server::db::{Database, init_db};
use courier_server::files::{IncomingFile, StorageArea};
use courier_server::notify::{MailTransport, Notifier};
use courier_server::testing::{RecordingTransport, init_test_tracing, test_smtp_settings};
use courier_server::{IngestRequest, ServiceConfig, TransferService};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tokio::io::AsyncReadExt;

pub const BASE_URL: &str = "https://files.example.com";
pub const SENDER: &str = "sender@x.com";
pub const RECIPIENT: &str = "rcpt@y.com";

/// A service wired to a temporary database and storage area
pub struct TestEnv {
    pub service: TransferService,
    pub database: Database,
    pub storage: StorageArea,
    pub pool: SqlitePool,
    pub transport: Arc<RecordingTransport>,
    _dir: TempDir,
}

/// Environment whose notifications are recorded
pub async fn setup() -> TestEnv {
    let transport = Arc::new(RecordingTransport::new());
    setup_with(transport.clone(), transport).await
}

/// Environment sending through `mailer`; `transport` is kept for inspection
pub async fn setup_with(
    mailer: Arc<dyn MailTransport>,
    transport: Arc<RecordingTransport>,
) -> TestEnv {
    init_test_tracing();

    let dir = TempDir::new().expect("Failed to create temp dir");
    let pool = init_db(&dir.path().join("courier.db"))
        .await
        .expect("Failed to create test database");
    let storage =
        StorageArea::init(&dir.path().join("storage")).expect("Failed to create storage area");
    let database = Database::new(pool.clone());

    let notifier = Notifier::new(Arc::new(test_smtp_settings()), mailer);
    let service = TransferService::new(
        database.transfers.clone(),
        storage.clone(),
        notifier,
        ServiceConfig {
            base_url: BASE_URL.to_string(),
            default_retention_days: 7,
        },
    );

    TestEnv {
        service,
        database,
        storage,
        pool,
        transport,
        _dir: dir,
    }
}

/// Ingest request from `SENDER` to `RECIPIENT`
pub fn request(files: Vec<IncomingFile>, retention_days: Option<u32>) -> IngestRequest {
    IngestRequest {
        files,
        recipient_email: RECIPIENT.to_string(),
        sender_email: SENDER.to_string(),
        retention_days,
    }
}

/// In-memory files from `(path, content)` pairs
pub fn files(entries: &[(&str, &[u8])]) -> Vec<IncomingFile> {
    entries
        .iter()
        .map(|(path, data)| IncomingFile::from_bytes(*path, data.to_vec()))
        .collect()
}

/// Read an open artifact to the end
pub async fn read_all(file: &mut tokio::fs::File) -> Vec<u8> {
    let mut data = Vec::new();
    file.read_to_end(&mut data)
        .await
        .expect("Failed to read artifact");
    data
}

/// Number of entries in a storage subdirectory
pub fn count_entries(storage: &StorageArea, subdir: &str) -> usize {
    std::fs::read_dir(storage.root().join(subdir))
        .map(|entries| entries.count())
        .unwrap_or(0)
}
