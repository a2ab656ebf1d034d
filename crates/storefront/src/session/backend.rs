//! Authentication backends.
//!
//! [`RemoteAuth`] talks to `POST /auth/signin` and `/auth/signup`.
//! [`DemoAuth`] accepts any credentials and never touches the network; it
//! backs local demos and offline development (`COMFYCUBE_AUTH_MODE=demo`).

use std::future::Future;
use std::time::Duration;

use tracing::{info, instrument};

use comfycube_core::{Email, Password, Role, UserId};

use crate::api::conversions::convert_auth_response;
use crate::api::types::{SignInRequest, SignUpRequest};
use crate::api::{ApiClient, ApiError};
use crate::error::{Result, StorefrontError};
use crate::models::{AuthSession, User};

/// Validated sign-up form.
#[derive(Debug, Clone)]
pub struct Registration {
    /// Display name (first and last name joined).
    pub name: String,
    /// Email address.
    pub email: Email,
    /// Password, already length-checked.
    pub password: Password,
    /// Requested role.
    pub role: Role,
}

/// Something that can turn credentials into an [`AuthSession`].
///
/// Inputs arrive already validated; implementations only decide whether the
/// account exists and which identity it maps to.
pub trait AuthBackend: Send + Sync {
    /// Authenticate an existing account.
    fn sign_in(
        &self,
        email: &Email,
        password: &Password,
    ) -> impl Future<Output = Result<AuthSession>> + Send;

    /// Create an account and authenticate it.
    fn sign_up(&self, registration: &Registration)
    -> impl Future<Output = Result<AuthSession>> + Send;
}

// =============================================================================
// RemoteAuth
// =============================================================================

/// Auth backed by the remote API.
#[derive(Clone)]
pub struct RemoteAuth {
    api: ApiClient,
}

impl RemoteAuth {
    /// Create a backend that authenticates through `api`.
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

impl AuthBackend for RemoteAuth {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_in(&self, email: &Email, password: &Password) -> Result<AuthSession> {
        let request = SignInRequest {
            email: email.as_str(),
            password: password.expose(),
        };
        let response = self.api.sign_in(&request).await?;
        Ok(convert_auth_response(response)?)
    }

    #[instrument(skip(self, registration), fields(email = %registration.email))]
    async fn sign_up(&self, registration: &Registration) -> Result<AuthSession> {
        let request = SignUpRequest {
            name: &registration.name,
            email: registration.email.as_str(),
            password: registration.password.expose(),
            role: registration.role.to_string(),
        };
        let response = self.api.sign_up(&request).await.map_err(|e| match e {
            ApiError::Conflict(_) => {
                StorefrontError::Auth("An account with this email already exists.".to_string())
            }
            other => other.into(),
        })?;
        Ok(convert_auth_response(response)?)
    }
}

// =============================================================================
// DemoAuth
// =============================================================================

/// Local demo accounts.
///
/// Every sign-in succeeds as user `"1"` named "Demo User"; the role is
/// `Admin` when the email contains `admin`. Sign-up keeps the supplied name
/// and role. Sessions carry no token, so cart and wishlist stay local.
#[derive(Debug, Clone, Default)]
pub struct DemoAuth {
    latency: Duration,
}

impl DemoAuth {
    /// Demo user ID.
    pub const USER_ID: &'static str = "1";
    /// Name given to demo sign-ins.
    pub const USER_NAME: &'static str = "Demo User";

    /// Demo backend that answers immediately.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            latency: Duration::ZERO,
        }
    }

    /// Simulate a round trip of `latency` before answering.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    async fn simulate_round_trip(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl AuthBackend for DemoAuth {
    async fn sign_in(&self, email: &Email, _password: &Password) -> Result<AuthSession> {
        self.simulate_round_trip().await;

        let role = if email.as_str().contains("admin") {
            Role::Admin
        } else {
            Role::User
        };
        info!(email = %email, %role, "Demo sign-in");

        Ok(AuthSession::local(User {
            id: UserId::new(Self::USER_ID),
            name: Self::USER_NAME.to_string(),
            email: email.clone(),
            role,
        }))
    }

    async fn sign_up(&self, registration: &Registration) -> Result<AuthSession> {
        self.simulate_round_trip().await;
        info!(email = %registration.email, role = %registration.role, "Demo sign-up");

        Ok(AuthSession::local(User {
            id: UserId::new(Self::USER_ID),
            name: registration.name.clone(),
            email: registration.email.clone(),
            role: registration.role,
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_demo_sign_in_role_from_email() {
        let auth = DemoAuth::new();
        let password = Password::parse("secret1").unwrap();

        let session = auth
            .sign_in(&Email::parse("admin@comfycube.test").unwrap(), &password)
            .await
            .unwrap();
        assert_eq!(session.user.role, Role::Admin);
        assert_eq!(session.user.name, "Demo User");
        assert!(session.bearer().is_none());

        let session = auth
            .sign_in(&Email::parse("shopper@comfycube.test").unwrap(), &password)
            .await
            .unwrap();
        assert_eq!(session.user.role, Role::User);
    }

    #[tokio::test]
    async fn test_demo_sign_up_keeps_name_and_role() {
        let registration = Registration {
            name: "Grace Hopper".to_string(),
            email: Email::parse("grace@comfycube.test").unwrap(),
            password: Password::parse("cobol60").unwrap(),
            role: Role::Admin,
        };
        let session = DemoAuth::new().sign_up(&registration).await.unwrap();
        assert_eq!(session.user.name, "Grace Hopper");
        assert_eq!(session.user.role, Role::Admin);
    }

    #[tokio::test]
    async fn test_demo_latency() {
        let auth = DemoAuth::new().with_latency(Duration::from_millis(20));
        let started = tokio::time::Instant::now();
        auth.sign_in(
            &Email::parse("a@b.test").unwrap(),
            &Password::parse("secret1").unwrap(),
        )
        .await
        .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(20));
    }
}
