//! SQL query constants for database operations
//!
//! This module contains all SQL queries used by the database layer.
//! Each query is documented with its parameters and special behaviors.

// ========================================================================
// Configuration Query Operations
// ========================================================================

/// Get a configuration value by key
///
/// **Parameters:**
/// 1. `key: &str` - Configuration key to look up
///
/// **Returns:** `(value: String)`
pub const SQL_GET_CONFIG: &str = "SELECT value FROM config WHERE key = ?";

/// Set a configuration value (insert or update)
///
/// **Parameters:**
/// 1. `key: &str` - Configuration key
/// 2. `value: &str` - New configuration value
pub const SQL_UPSERT_CONFIG: &str = "INSERT INTO config (key, value) VALUES (?, ?) \
     ON CONFLICT(key) DO UPDATE SET value = excluded.value";

// ========================================================================
// Transfer Query Operations
// ========================================================================

/// Column list shared by all transfer selects
///
/// Order matches `TransferRow`.
macro_rules! transfer_columns {
    () => {
        "id, artifact_name, recipient_email, sender_email, manifest, total_size, \
         fingerprint, created_at, expires_at, downloaded, downloaded_at"
    };
}

/// Insert a new transfer record
///
/// **Parameters:**
/// 1. `id: &str`
/// 2. `artifact_name: &str`
/// 3. `recipient_email: &str`
/// 4. `sender_email: &str`
/// 5. `manifest: &str` - JSON array of `{path, size}`
/// 6. `total_size: i64`
/// 7. `fingerprint: &str`
/// 8. `created_at: i64`
/// 9. `expires_at: i64`
/// 10. `id: &str` - Same id again, for the retired check
///
/// **Note:** Fails with a unique violation if the id is live, and inserts
/// nothing (`rows_affected() == 0`) if it was retired. One statement, so the
/// write lock is requested up front and waits out `busy_timeout`.
pub const SQL_INSERT_TRANSFER: &str = "INSERT INTO transfers \
     (id, artifact_name, recipient_email, sender_email, manifest, total_size, \
      fingerprint, created_at, expires_at, downloaded, downloaded_at) \
     SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, NULL \
     WHERE NOT EXISTS (SELECT 1 FROM retired_ids WHERE id = ?)";

/// Select a transfer by id
///
/// **Parameters:**
/// 1. `id: &str`
///
/// **Returns:** `TransferRow`
pub const SQL_SELECT_TRANSFER: &str =
    concat!("SELECT ", transfer_columns!(), " FROM transfers WHERE id = ?");

/// Select transfers whose expiration instant has passed
///
/// **Parameters:**
/// 1. `now: i64` - Current Unix timestamp
///
/// **Returns:** Multiple `TransferRow`, oldest expiry first
pub const SQL_SELECT_EXPIRED_TRANSFERS: &str = concat!(
    "SELECT ",
    transfer_columns!(),
    " FROM transfers WHERE expires_at < ? ORDER BY expires_at"
);

/// Select the most recent transfers
///
/// **Parameters:**
/// 1. `limit: i64`
///
/// **Returns:** Multiple `TransferRow`, newest first
pub const SQL_SELECT_RECENT_TRANSFERS: &str = concat!(
    "SELECT ",
    transfer_columns!(),
    " FROM transfers ORDER BY created_at DESC, id LIMIT ?"
);

/// Flip `downloaded` from 0 to 1 in a single statement
///
/// **Parameters:**
/// 1. `downloaded_at: i64` - Current Unix timestamp
/// 2. `id: &str`
///
/// **Note:** `rows_affected() == 1` only for the caller that performed the
/// transition. A read-then-write pair would let two concurrent downloads both
/// observe `downloaded = 0`.
pub const SQL_MARK_DOWNLOADED_IF_FIRST: &str =
    "UPDATE transfers SET downloaded = 1, downloaded_at = ? WHERE id = ? AND downloaded = 0";

/// Delete a transfer by id
///
/// **Parameters:**
/// 1. `id: &str`
pub const SQL_DELETE_TRANSFER: &str = "DELETE FROM transfers WHERE id = ?";

// ========================================================================
// Retired Id Operations
// ========================================================================

/// Record a swept transfer id so it is never issued again
///
/// **Parameters:**
/// 1. `id: &str`
/// 2. `retired_at: i64`
pub const SQL_RETIRE_ID: &str = "INSERT OR IGNORE INTO retired_ids (id, retired_at) VALUES (?, ?)";
