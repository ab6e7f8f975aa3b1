//! Database module for SQLite persistence

mod config;
pub mod sql;
mod transfers;

use std::path::{Path, PathBuf};
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::warn;

use crate::constants::{
    DATA_DIR_NAME, DATABASE_FILENAME, DB_BUSY_TIMEOUT_SECS, DB_CONNECT_ATTEMPTS,
    DB_CONNECT_RETRY_DELAY_MS, DB_MAX_CONNECTIONS, ERR_NO_DATA_DIR,
};
use crate::errors::DbInitError;

pub use config::ConfigDb;
pub use transfers::{TransferDb, TransferRecord};

/// Database handle bundling the per-table accessors
///
/// `SqlitePool` is reference counted, so cloning is cheap.
#[derive(Clone)]
pub struct Database {
    pub transfers: TransferDb,
    pub config: ConfigDb,
}

impl Database {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            transfers: TransferDb::new(pool.clone()),
            config: ConfigDb::new(pool),
        }
    }
}

/// Platform default database path (`{data_dir}/courierd/courier.db`)
pub fn default_database_path() -> Result<PathBuf, String> {
    let data_dir = dirs::data_dir().ok_or_else(|| ERR_NO_DATA_DIR.to_string())?;
    Ok(data_dir.join(DATA_DIR_NAME).join(DATABASE_FILENAME))
}

/// Open the database and bring its schema up to date
///
/// Creates the parent directory and the file if needed. Connection is
/// attempted `DB_CONNECT_ATTEMPTS` times with a fixed delay; exhausting
/// the attempts is fatal.
pub async fn init_db(path: &Path) -> Result<SqlitePool, DbInitError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(DbInitError::CreateDir)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(DB_BUSY_TIMEOUT_SECS))
        .foreign_keys(true);

    let pool = connect_with_retry(options).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

async fn connect_with_retry(options: SqliteConnectOptions) -> Result<SqlitePool, DbInitError> {
    let mut attempt = 1;
    loop {
        let result = SqlitePoolOptions::new()
            .max_connections(DB_MAX_CONNECTIONS)
            .connect_with(options.clone())
            .await;

        match result {
            Ok(pool) => return Ok(pool),
            Err(source) if attempt >= DB_CONNECT_ATTEMPTS => {
                return Err(DbInitError::ConnectExhausted {
                    attempts: attempt,
                    source,
                });
            }
            Err(e) => {
                warn!(attempt, error = %e, "database connection failed, retrying");
                tokio::time::sleep(Duration::from_millis(DB_CONNECT_RETRY_DELAY_MS)).await;
                attempt += 1;
            }
        }
    }
}
