//! Lowercase hex token validation
//!
//! Transfer ids (128-bit, 32 hex characters) and content fingerprints
//! (SHA-256, 64 hex characters) share the same shape rules.

/// Length of a transfer id in hex characters (128 bits)
pub const TRANSFER_ID_HEX_LENGTH: usize = 32;

/// Length of a SHA-256 fingerprint in hex characters
pub const FINGERPRINT_HEX_LENGTH: usize = 64;

/// Validation error for hex tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HexTokenError {
    /// Token has the wrong length
    InvalidLength,
    /// Token contains non-hexadecimal or uppercase characters
    InvalidCharacters,
}

fn validate_hex_token(token: &str, expected_len: usize) -> Result<(), HexTokenError> {
    if token.len() != expected_len {
        return Err(HexTokenError::InvalidLength);
    }
    if token
        .chars()
        .any(|ch| !ch.is_ascii_hexdigit() || ch.is_ascii_uppercase())
    {
        return Err(HexTokenError::InvalidCharacters);
    }
    Ok(())
}

/// Validate a transfer id as it appears in a download link
///
/// # Errors
///
/// Returns a `HexTokenError` variant describing the validation failure.
pub fn validate_transfer_id(id: &str) -> Result<(), HexTokenError> {
    validate_hex_token(id, TRANSFER_ID_HEX_LENGTH)
}

/// Validate a stored SHA-256 fingerprint
///
/// # Errors
///
/// Returns a `HexTokenError` variant describing the validation failure.
pub fn validate_fingerprint(hash: &str) -> Result<(), HexTokenError> {
    validate_hex_token(hash, FINGERPRINT_HEX_LENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transfer_id() {
        assert!(validate_transfer_id("0123456789abcdef0123456789abcdef").is_ok());
        assert!(validate_transfer_id(&"f".repeat(TRANSFER_ID_HEX_LENGTH)).is_ok());
    }

    #[test]
    fn test_transfer_id_length() {
        assert_eq!(
            validate_transfer_id("abc"),
            Err(HexTokenError::InvalidLength)
        );
        assert_eq!(validate_transfer_id(""), Err(HexTokenError::InvalidLength));
        assert_eq!(
            validate_transfer_id(&"a".repeat(TRANSFER_ID_HEX_LENGTH + 1)),
            Err(HexTokenError::InvalidLength)
        );
    }

    #[test]
    fn test_transfer_id_characters() {
        assert_eq!(
            validate_transfer_id("0123456789ABCDEF0123456789abcdef"),
            Err(HexTokenError::InvalidCharacters)
        );
        assert_eq!(
            validate_transfer_id("../../../../etc/passwd0000000000"),
            Err(HexTokenError::InvalidCharacters)
        );
    }

    #[test]
    fn test_fingerprint() {
        assert!(
            validate_fingerprint(
                "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
            )
            .is_ok()
        );
        assert_eq!(
            validate_fingerprint("e3b0c442"),
            Err(HexTokenError::InvalidLength)
        );
        assert_eq!(
            validate_fingerprint(&"g".repeat(FINGERPRINT_HEX_LENGTH)),
            Err(HexTokenError::InvalidCharacters)
        );
    }
}
