//! Helper utilities for transfer operations

use chrono::Utc;
use courier_common::validators::{normalize_email, validate_email, validate_transfer_id};
use courier_common::MAX_RETENTION_DAYS;

use crate::errors::{NotFoundReason, TransferError, ValidationError};

/// Generate a random transfer id (32 hex chars, 128 bits)
///
/// The id is the only credential guarding a download, so it comes from the
/// thread-local CSPRNG.
pub(crate) fn generate_transfer_id() -> String {
    let bytes: [u8; 16] = rand::random();
    hex::encode(bytes)
}

/// Public download link for a transfer
pub(crate) fn download_link(base_url: &str, id: &str) -> String {
    format!("{}/download/{id}", base_url.trim_end_matches('/'))
}

/// Current time as Unix seconds
pub(crate) fn now_secs() -> i64 {
    Utc::now().timestamp()
}

/// Normalize and validate the recipient address
pub(crate) fn recipient_address(raw: &str) -> Result<String, ValidationError> {
    let email = normalize_email(raw);
    validate_email(&email).map_err(ValidationError::RecipientEmail)?;
    Ok(email)
}

/// Normalize and validate the sender address
pub(crate) fn sender_address(raw: &str) -> Result<String, ValidationError> {
    let email = normalize_email(raw);
    validate_email(&email).map_err(ValidationError::SenderEmail)?;
    Ok(email)
}

/// Check a retention period in days
pub(crate) fn check_retention(days: u32) -> Result<u32, ValidationError> {
    if days == 0 || days > MAX_RETENTION_DAYS {
        return Err(ValidationError::Retention {
            max: MAX_RETENTION_DAYS,
        });
    }
    Ok(days)
}

/// Reject ids that could never have been issued
///
/// Malformed ids are reported exactly like unknown ones.
pub(crate) fn check_transfer_id(id: &str) -> Result<(), TransferError> {
    validate_transfer_id(id).map_err(|_| TransferError::NotFound(NotFoundReason::Unknown))
}
