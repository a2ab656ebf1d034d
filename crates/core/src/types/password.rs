//! Password type.
//!
//! Passwords are only held long enough to be sent to the auth backend, so this
//! type validates length and keeps the value out of `Debug` output.

use core::fmt;

/// Errors that can occur when parsing a [`Password`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PasswordError {
    /// The password is shorter than the minimum.
    #[error("password must be at least {min} characters")]
    TooShort {
        /// Minimum allowed length.
        min: usize,
    },
}

/// A password that satisfies the sign-up length rule.
///
/// ## Examples
///
/// ```
/// use comfycube_core::Password;
///
/// assert!(Password::parse("secret1").is_ok());
/// assert!(Password::parse("short").is_err());
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    /// Minimum number of characters.
    pub const MIN_LENGTH: usize = 6;

    /// Parse a `Password` from a string.
    ///
    /// Length is counted in characters, not bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PasswordError::TooShort`] if the input has fewer than
    /// [`Self::MIN_LENGTH`] characters.
    pub fn parse(s: &str) -> Result<Self, PasswordError> {
        if s.chars().count() < Self::MIN_LENGTH {
            return Err(PasswordError::TooShort {
                min: Self::MIN_LENGTH,
            });
        }
        Ok(Self(s.to_owned()))
    }

    /// Expose the raw password for transmission.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password([REDACTED])")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_too_short() {
        assert_eq!(
            Password::parse("short"),
            Err(PasswordError::TooShort { min: 6 })
        );
        assert!(Password::parse("").is_err());
    }

    #[test]
    fn test_parse_minimum_length() {
        assert_eq!(Password::parse("sixsix").unwrap().expose(), "sixsix");
    }

    #[test]
    fn test_length_counts_chars() {
        // Six characters, more than six bytes
        assert!(Password::parse("ééééé1").is_ok());
    }

    #[test]
    fn test_debug_redacts() {
        let password = Password::parse("hunter22").unwrap();
        let debug = format!("{password:?}");
        assert!(!debug.contains("hunter22"));
    }
}
