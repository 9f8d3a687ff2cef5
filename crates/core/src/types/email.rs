//! Email address type used by the registration form.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    /// The input string is empty.
    #[error("email cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("email must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input does not contain exactly one @ symbol.
    #[error("email must contain a single @ symbol")]
    MissingAtSymbol,
    /// The local part (before @) or the domain (after @) is empty.
    #[error("email must have text on both sides of the @ symbol")]
    EmptyPart,
}

/// An email address with a basic shape check.
///
/// The backend performs the authoritative validation; this only catches the
/// mistakes a browser `type="email"` input would have caught.
///
/// ```
/// use stns_core::Email;
///
/// assert!(Email::parse("admin@stns.website").is_ok());
/// assert!(Email::parse("admin").is_err());
/// assert!(Email::parse("admin@").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Maximum length of an email address (RFC 5321).
    pub const MAX_LENGTH: usize = 254;

    /// Parse an `Email` from user input. Surrounding whitespace is trimmed.
    ///
    /// # Errors
    ///
    /// Returns an [`EmailError`] describing the first problem found.
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(EmailError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        let (local, domain) = s.split_once('@').ok_or(EmailError::MissingAtSymbol)?;
        if domain.contains('@') {
            return Err(EmailError::MissingAtSymbol);
        }
        if local.is_empty() || domain.is_empty() {
            return Err(EmailError::EmptyPart);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the email address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_input() {
        let email = Email::parse("  admin@stns.website ").map(|e| e.to_string());
        assert_eq!(email.as_deref(), Ok("admin@stns.website"));
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert_eq!(Email::parse("   "), Err(EmailError::Empty));
    }

    #[test]
    fn test_parse_rejects_double_at() {
        assert_eq!(Email::parse("a@b@c"), Err(EmailError::MissingAtSymbol));
    }

    #[test]
    fn test_parse_rejects_empty_parts() {
        assert_eq!(Email::parse("@stns.website"), Err(EmailError::EmptyPart));
        assert_eq!(Email::parse("admin@"), Err(EmailError::EmptyPart));
    }

    #[test]
    fn test_parse_rejects_too_long() {
        let long = format!("{}@stns.website", "a".repeat(250));
        assert!(matches!(
            Email::parse(&long),
            Err(EmailError::TooLong { max: 254 })
        ));
    }
}
