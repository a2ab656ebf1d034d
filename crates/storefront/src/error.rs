//! Unified error taxonomy for store operations.
//!
//! Every store and client operation returns `Result<T, StorefrontError>`.
//! Transport-level [`ApiError`]s and [`StorageError`]s are folded into the
//! taxonomy here; the presentation layer decides how to surface each kind.

use thiserror::Error;

use comfycube_core::{EmailError, PasswordError, PriceError, RatingError};

use crate::api::ApiError;
use crate::storage::StorageError;

/// Error returned by storefront operations.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Input rejected on the client before any network call.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Authentication rejected by the remote, or a session is required but absent.
    #[error("Auth error: {0}")]
    Auth(String),

    /// Referenced entity does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Transport failure (connection refused, timeout, DNS).
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Remote rejected the request for a reason other than auth or not-found.
    #[error("Server error{}: {message}", status_suffix(.status))]
    Server {
        /// HTTP status, when the failure came from a response.
        status: Option<u16>,
        /// Message from the remote `{message}` body or a parse failure.
        message: String,
    },

    /// Local persistence failed; in-memory state was left unchanged.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl StorefrontError {
    /// Whether the caller should send the user to the sign-in flow
    /// instead of showing a generic notification.
    #[must_use]
    pub const fn requires_sign_in(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Text safe to show in a transient notification.
    ///
    /// Transport and server details are not exposed.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) | Self::Auth(msg) => msg.clone(),
            Self::NotFound(_) => {
                "The item you're looking for doesn't exist or has been removed.".to_string()
            }
            Self::Network(_) => "Could not reach the store. Check your connection.".to_string(),
            Self::Server { .. } => "The store could not complete the request.".to_string(),
            Self::Storage(_) => "Could not save your changes on this device.".to_string(),
        }
    }
}

impl From<ApiError> for StorefrontError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Http(e) => Self::Network(e),
            ApiError::Unauthorized(message) => Self::Auth(message),
            ApiError::NotFound(message) => Self::NotFound(message),
            ApiError::Status { status, message } => Self::Server {
                status: Some(status),
                message,
            },
            ApiError::Conflict(message) => Self::Server {
                status: Some(409),
                message,
            },
            ApiError::Parse(e) => Self::Server {
                status: None,
                message: format!("invalid response body: {e}"),
            },
            ApiError::InvalidPayload(message) => Self::Server {
                status: None,
                message,
            },
            ApiError::InvalidUrl(e) => Self::Validation(format!("invalid request path: {e}")),
        }
    }
}

impl From<EmailError> for StorefrontError {
    fn from(err: EmailError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<PasswordError> for StorefrontError {
    fn from(err: PasswordError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<RatingError> for StorefrontError {
    fn from(err: RatingError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<PriceError> for StorefrontError {
    fn from(err: PriceError) -> Self {
        Self::Validation(err.to_string())
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

/// Result type alias for `StorefrontError`.
pub type Result<T> = std::result::Result<T, StorefrontError>;
