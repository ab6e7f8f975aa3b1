//! Input validation functions
//!
//! Reusable validators for the inputs the transfer pipeline accepts. The
//! command-line front end uses them for pre-validation, the server for
//! enforcement.

mod email;
mod file_path;
mod hex_token;

pub use email::{EmailError, MAX_EMAIL_LENGTH, normalize_email, validate_email};
pub use file_path::{FilePathError, MAX_FILE_PATH_LENGTH, validate_file_path};
pub use hex_token::{
    FINGERPRINT_HEX_LENGTH, HexTokenError, TRANSFER_ID_HEX_LENGTH, validate_fingerprint,
    validate_transfer_id,
};
