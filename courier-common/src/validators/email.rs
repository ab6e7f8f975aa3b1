//! Email address validation
//!
//! Addresses are normalized (trimmed, lower-cased) before they are stored on a
//! transfer record. Validation is deliberately shallow: one `@`, a non-empty
//! local part, and a dotted domain. Deliverability is the mail server's problem.

/// Maximum length for email addresses (RFC 5321 path limit)
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Validation error for email addresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    /// Address is empty (after trimming)
    Empty,
    /// Address exceeds maximum length
    TooLong,
    /// Address contains whitespace or control characters
    InvalidCharacters,
    /// Address is not of the form `local@domain.tld`
    InvalidFormat,
}

/// Trim and lower-case an address
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate a (normalized) email address
///
/// Checks:
/// - Not empty
/// - Does not exceed maximum length (254 characters)
/// - No whitespace or control characters
/// - Exactly one `@` with a non-empty local part
/// - Domain has at least one `.`, no empty labels, no leading/trailing `-`
///
/// # Errors
///
/// Returns an `EmailError` variant describing the validation failure.
pub fn validate_email(email: &str) -> Result<(), EmailError> {
    if email.is_empty() {
        return Err(EmailError::Empty);
    }
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(EmailError::TooLong);
    }
    if email.chars().any(|ch| ch.is_whitespace() || ch.is_control()) {
        return Err(EmailError::InvalidCharacters);
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(EmailError::InvalidFormat);
    };
    if local.is_empty() || domain.contains('@') {
        return Err(EmailError::InvalidFormat);
    }
    if !domain.contains('.') {
        return Err(EmailError::InvalidFormat);
    }
    for label in domain.split('.') {
        if label.is_empty() || label.starts_with('-') || label.ends_with('-') {
            return Err(EmailError::InvalidFormat);
        }
    }

    Ok(())
}
