//! User and session types.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use comfycube_core::{Email, Role, UserId};

/// The signed-in storefront user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User ID assigned by the auth backend.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: Email,
    /// Account role.
    pub role: Role,
}

impl User {
    /// Whether the user has administrative access.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// An authenticated identity plus the bearer token the remote API issued.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct AuthSession {
    /// Signed-in user.
    pub user: User,
    /// Bearer token for authenticated API calls; `None` for demo sessions.
    pub access_token: Option<SecretString>,
}

impl AuthSession {
    /// Session without a remote token (demo auth).
    #[must_use]
    pub const fn local(user: User) -> Self {
        Self {
            user,
            access_token: None,
        }
    }

    /// Token as a plain string for request headers.
    #[must_use]
    pub fn bearer(&self) -> Option<&str> {
        self.access_token.as_ref().map(|token| token.expose_secret())
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("user", &self.user)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// On-disk form of an [`AuthSession`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SessionRecord {
    pub user: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl From<&AuthSession> for SessionRecord {
    fn from(session: &AuthSession) -> Self {
        Self {
            user: session.user.clone(),
            access_token: session.bearer().map(str::to_owned),
        }
    }
}

impl From<SessionRecord> for AuthSession {
    fn from(record: SessionRecord) -> Self {
        Self {
            user: record.user,
            access_token: record.access_token.map(SecretString::from),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: UserId::new("u1"),
            name: "Ada".to_string(),
            email: Email::parse("ada@comfycube.test").unwrap(),
            role: Role::Admin,
        }
    }

    #[test]
    fn test_debug_redacts_token() {
        let session = AuthSession {
            user: user(),
            access_token: Some(SecretString::from("tok_live_abc123")),
        };
        let debug = format!("{session:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("tok_live_abc123"));
    }

    #[test]
    fn test_record_roundtrip_keeps_user_fields() {
        let session = AuthSession {
            user: user(),
            access_token: Some(SecretString::from("tok")),
        };
        let json = serde_json::to_string(&SessionRecord::from(&session)).unwrap();
        let restored: AuthSession = serde_json::from_str::<SessionRecord>(&json).unwrap().into();
        assert_eq!(restored.user, session.user);
        assert_eq!(restored.bearer(), Some("tok"));
        assert!(restored.user.is_admin());
    }
}
