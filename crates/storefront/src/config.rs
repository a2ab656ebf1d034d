//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `COMFYCUBE_API_URL` - Base URL of the remote catalog/order API
//!
//! ## Optional
//! - `COMFYCUBE_API_KEY` - API key sent as `x-api-key` on every request
//! - `COMFYCUBE_DATA_DIR` - Directory for persisted state (default: .comfycube)
//! - `COMFYCUBE_CACHE_TTL_SECS` - Catalog cache TTL (default: 300)
//! - `COMFYCUBE_REQUEST_TIMEOUT_SECS` - HTTP request timeout (default: 10)
//! - `COMFYCUBE_AUTH_MODE` - `remote` or `demo` (default: remote)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// How the session store authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// `POST /auth/signin` and `/auth/signup` against the remote API.
    #[default]
    Remote,
    /// Local demo accounts; any credentials are accepted.
    Demo,
}

impl std::str::FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "remote" => Ok(Self::Remote),
            "demo" => Ok(Self::Demo),
            other => Err(format!("expected 'remote' or 'demo', got '{other}'")),
        }
    }
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Remote API configuration
    pub api: ApiConfig,
    /// Directory holding persisted session, cart and wishlist
    pub data_dir: PathBuf,
    /// Authentication backend
    pub auth_mode: AuthMode,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Remote API configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct ApiConfig {
    /// Base URL; always ends with `/` so relative paths join beneath it
    pub base_url: Url,
    /// Optional API key
    pub api_key: Option<SecretString>,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Catalog cache time-to-live
    pub cache_ttl: Duration,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout", &self.request_timeout)
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

impl ApiConfig {
    /// Default catalog cache TTL.
    pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
    /// Default request timeout.
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Configuration for `base_url` with default timeouts and no API key.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the URL does not parse or is
    /// not http(s).
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url("COMFYCUBE_API_URL", base_url)?,
            api_key: None,
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
            cache_ttl: Self::DEFAULT_CACHE_TTL,
        })
    }

    fn from_env() -> Result<Self, ConfigError> {
        let base_url = get_required_env("COMFYCUBE_API_URL")?;
        let mut config = Self::new(&base_url)?;
        config.api_key = get_optional_env("COMFYCUBE_API_KEY")
            .map(|key| validated_secret("COMFYCUBE_API_KEY", key))
            .transpose()?;
        config.request_timeout = get_secs_or_default(
            "COMFYCUBE_REQUEST_TIMEOUT_SECS",
            Self::DEFAULT_REQUEST_TIMEOUT,
        )?;
        config.cache_ttl =
            get_secs_or_default("COMFYCUBE_CACHE_TTL_SECS", Self::DEFAULT_CACHE_TTL)?;
        Ok(config)
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid,
    /// or if the API key looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api = ApiConfig::from_env()?;
        let data_dir = PathBuf::from(get_env_or_default("COMFYCUBE_DATA_DIR", ".comfycube"));
        let auth_mode = get_env_or_default("COMFYCUBE_AUTH_MODE", "remote")
            .parse::<AuthMode>()
            .map_err(|e| ConfigError::InvalidEnvVar("COMFYCUBE_AUTH_MODE".to_string(), e))?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            api,
            data_dir,
            auth_mode,
            sentry_dsn,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable; empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a whole number of seconds, falling back to `default`.
fn get_secs_or_default(key: &str, default: Duration) -> Result<Duration, ConfigError> {
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Parse an http(s) base URL and make sure it ends with `/`.
fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Reject secrets that look like placeholders copied from a template.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(**p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    Ok(())
}

fn validated_secret(key: &str, value: String) -> Result<SecretString, ConfigError> {
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

/// Expose the API key for request headers.
pub(crate) fn api_key_header(config: &ApiConfig) -> Option<&str> {
    config.api_key.as_ref().map(|key| key.expose_secret())
}
