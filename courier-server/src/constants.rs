//! Server constants: user-facing messages, config keys, and defaults

// ========================================================================
// Startup Messages
// ========================================================================

pub const MSG_BANNER: &str = "Courier file handoff service v";
pub const MSG_DATABASE: &str = "Database: ";
pub const MSG_STORAGE_ROOT: &str = "Storage: ";
pub const MSG_SWEEP_INTERVAL: &str = "Sweep interval (hours): ";
pub const MSG_SHUTDOWN_RECEIVED: &str = "\nShutdown signal received, stopping...";

// ========================================================================
// Fatal Errors
// ========================================================================

pub const ERR_GENERIC: &str = "Error: ";
pub const ERR_DATABASE_INIT: &str = "Failed to initialize database: ";
pub const ERR_STORAGE_INIT: &str = "Failed to initialize storage area: ";
pub const ERR_SET_PERMISSIONS: &str = "Failed to set database file permissions: ";
pub const ERR_NO_DATA_DIR: &str = "Unable to determine the platform data directory";
pub const ERR_SIGNAL_SIGTERM: &str = "Failed to install SIGTERM handler";
pub const ERR_SIGNAL_SIGINT: &str = "Failed to install SIGINT handler";
pub const ERR_SIGNAL_CTRLC: &str = "Failed to install Ctrl+C handler";

// ========================================================================
// Paths
// ========================================================================

/// Directory under the platform data dir holding everything the daemon owns
pub const DATA_DIR_NAME: &str = "courierd";
pub const DATABASE_FILENAME: &str = "courier.db";
pub const STORAGE_DIR_NAME: &str = "storage";
/// Finished artifacts, one file per transfer id
pub const BLOBS_DIR_NAME: &str = "blobs";
/// Per-attempt ingestion scratch space
pub const STAGING_DIR_NAME: &str = "staging";

// ========================================================================
// Config Keys
// ========================================================================

pub const CONFIG_KEY_SMTP_SERVER: &str = "smtp_server";
pub const CONFIG_KEY_SMTP_PORT: &str = "smtp_port";
pub const CONFIG_KEY_SMTP_USER: &str = "smtp_user";
pub const CONFIG_KEY_SMTP_PASSWORD: &str = "smtp_password";
pub const CONFIG_KEY_SMTP_SENDER: &str = "smtp_sender";

// ========================================================================
// Defaults
// ========================================================================

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Default time between sweeper runs
pub const DEFAULT_SWEEP_INTERVAL_HOURS: u64 = 6;

/// Sweeper must run at least once per this many hours
pub const MAX_SWEEP_INTERVAL_HOURS: u64 = 12;

/// Database connection attempts at startup before giving up
pub const DB_CONNECT_ATTEMPTS: u32 = 5;

/// Delay between database connection attempts (milliseconds)
pub const DB_CONNECT_RETRY_DELAY_MS: u64 = 500;

/// SQLite busy timeout so concurrent writers wait instead of failing
pub const DB_BUSY_TIMEOUT_SECS: u64 = 5;

/// Maximum pooled SQLite connections
pub const DB_MAX_CONNECTIONS: u32 = 8;

/// Default number of rows returned by `list`
pub const DEFAULT_LIST_LIMIT: u32 = 50;

/// Display name prefix for synthesized multi-file archives
pub const ARCHIVE_NAME_PREFIX: &str = "transfer_";

/// Extension of synthesized multi-file archives
pub const ARCHIVE_EXTENSION: &str = "tar.gz";

/// Per-message SMTP connection and command timeout
pub const SMTP_TIMEOUT_SECS: u64 = 30;

/// Staging entries untouched for this long are purged at startup
pub const STALE_STAGING_SECS: u64 = 24 * 60 * 60;
