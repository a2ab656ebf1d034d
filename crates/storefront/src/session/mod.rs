//! Session store: the current user and its persisted record.
//!
//! # State machine
//!
//! ```text
//! Unauthenticated --sign_in/sign_up--> Authenticated --sign_out--> Unauthenticated
//! Authenticated --sign_in--> Authenticated (identity replaced)
//! ```
//!
//! Credentials are validated locally before the backend is called. A
//! successful sign-in is persisted under [`keys::SESSION`] before it becomes
//! the current session, so a storage failure leaves the store untouched.

mod backend;

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, instrument};

use comfycube_core::{Email, Password, Role};

use crate::error::{Result, StorefrontError};
use crate::models::user::SessionRecord;
use crate::models::{AuthSession, User};
use crate::notify::ChangeNotifier;
use crate::storage::{Storage, keys, load_record, save_record};

pub use backend::{AuthBackend, DemoAuth, Registration, RemoteAuth};

/// Holds the signed-in user, if any.
pub struct SessionStore<A> {
    backend: A,
    storage: Arc<dyn Storage>,
    current: Option<AuthSession>,
    loading: bool,
    notifier: ChangeNotifier,
}

impl<A: AuthBackend> SessionStore<A> {
    /// Create a store in the loading state; call [`restore`](Self::restore)
    /// once at startup.
    pub fn new(backend: A, storage: Arc<dyn Storage>) -> Self {
        Self {
            backend,
            storage,
            current: None,
            loading: true,
            notifier: ChangeNotifier::new(),
        }
    }

    /// Load the persisted session, if present and readable.
    ///
    /// Clears the loading flag whether or not a session was found.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the backend itself cannot be read. The store is
    /// left unauthenticated and no longer loading.
    pub fn restore(&mut self) -> Result<Option<&User>> {
        let loaded = load_record::<SessionRecord>(self.storage.as_ref(), keys::SESSION);
        self.loading = false;

        self.current = loaded?.map(AuthSession::from);
        if let Some(session) = &self.current {
            info!(user_id = %session.user.id, "Restored session");
        }
        self.notifier.notify();
        Ok(self.user())
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a malformed email, `Auth` if the credentials
    /// are rejected, and `Storage` if the session cannot be persisted.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<User> {
        let email = Email::parse(email)?;
        // Shorter than any password an account can have
        let password = Password::parse(password).map_err(|_| invalid_credentials())?;

        let session = self.backend.sign_in(&email, &password).await?;
        self.replace(session)
    }

    /// Create an account and sign in as it.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for an empty name, malformed email or a password
    /// shorter than [`Password::MIN_LENGTH`], all before any network call.
    /// Returns `Auth` if the email is already registered.
    #[instrument(skip(self, password))]
    pub async fn sign_up(
        &mut self,
        name: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<User> {
        let registration = validate_registration(name, email, password, role)?;
        let session = self.backend.sign_up(&registration).await?;
        self.replace(session)
    }

    /// Clear the current session and its persisted record. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the record cannot be removed; the session is kept.
    pub fn sign_out(&mut self) -> Result<()> {
        self.storage.remove(keys::SESSION)?;
        if let Some(session) = self.current.take() {
            info!(user_id = %session.user.id, "Signed out");
            self.notifier.notify();
        }
        Ok(())
    }

    fn replace(&mut self, session: AuthSession) -> Result<User> {
        save_record(
            self.storage.as_ref(),
            keys::SESSION,
            &SessionRecord::from(&session),
        )?;

        let user = session.user.clone();
        info!(user_id = %user.id, role = %user.role, "Signed in");
        self.current = Some(session);
        self.notifier.notify();
        Ok(user)
    }

    /// The signed-in user.
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.current.as_ref().map(|s| &s.user)
    }

    /// The full session, including the bearer token.
    #[must_use]
    pub const fn session(&self) -> Option<&AuthSession> {
        self.current.as_ref()
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.current.is_some()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user().is_some_and(User::is_admin)
    }

    /// True until [`restore`](Self::restore) has run.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// Subscribe to session changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notifier.subscribe()
    }
}

/// Join first and last name the way the sign-up form does.
#[must_use]
pub fn full_name(first: &str, last: &str) -> String {
    format!("{} {}", first.trim(), last.trim()).trim().to_string()
}

fn validate_registration(
    name: &str,
    email: &str,
    password: &str,
    role: Role,
) -> Result<Registration> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StorefrontError::Validation(
            "name cannot be empty".to_string(),
        ));
    }
    let password = Password::parse(password)?;

    Ok(Registration {
        name: name.to_string(),
        email: Email::parse(email)?,
        password,
        role,
    })
}

fn invalid_credentials() -> StorefrontError {
    StorefrontError::Auth("Invalid email or password.".to_string())
}
