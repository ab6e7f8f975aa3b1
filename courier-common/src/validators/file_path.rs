//! Incoming file path validation
//!
//! Validates the raw relative path a sender supplies for an uploaded file.
//! Control characters and traversal segments are not rejected here; they are
//! stripped by the server's path sanitizer. This validator only rejects input
//! that cannot be turned into a safe name at all.

/// Maximum length for incoming relative paths in bytes
pub const MAX_FILE_PATH_LENGTH: usize = 4096;

/// Validation error for incoming file paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilePathError {
    /// Path is empty or only whitespace
    Empty,
    /// Path exceeds maximum length
    TooLong,
    /// Path contains null bytes
    ContainsNull,
}

/// Validate a raw relative path supplied with an upload
///
/// # Errors
///
/// Returns a `FilePathError` variant describing the validation failure.
pub fn validate_file_path(path: &str) -> Result<(), FilePathError> {
    if path.trim().is_empty() {
        return Err(FilePathError::Empty);
    }
    if path.len() > MAX_FILE_PATH_LENGTH {
        return Err(FilePathError::TooLong);
    }
    if path.contains('\0') {
        return Err(FilePathError::ContainsNull);
    }
    Ok(())
}
