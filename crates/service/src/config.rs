//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `FOLLOWUP_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`)
//! - `FOLLOWUP_ADMIN_TOKEN` - Anti-forgery token for the administrative
//!   clear action (min 32 chars)
//! - `SCHEDULER_BASE_URL` - Base URL of the email scheduler service
//! - `SCHEDULER_API_TOKEN` - Bearer token for the scheduler API
//!
//! ## Optional
//! - `FOLLOWUP_HOST` - Bind address (default: 127.0.0.1)
//! - `FOLLOWUP_PORT` - Listen port (default: 3002)
//! - `FOLLOWUP_ABANDONED_AFTER` - Abandonment threshold value (default: 1)
//! - `FOLLOWUP_ABANDONED_UNIT` - Threshold unit: minutes|hours|days
//!   (default: hours)
//! - `FOLLOWUP_CONVERSION_DAYS` - Conversion lookback window in days
//!   (default: 14)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

use crate::abandonment::{AbandonmentThreshold, ThresholdUnit};

const MIN_ADMIN_TOKEN_LENGTH: usize = 32;

/// Default conversion lookback window in days.
pub const DEFAULT_CONVERSION_DAYS: u32 = 14;

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

/// Follow-up service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Anti-forgery token required by the administrative clear action
    pub admin_token: SecretString,
    /// Email scheduler collaborator configuration
    pub scheduler: SchedulerConfig,
    /// When a stored cart counts as abandoned
    pub abandonment: AbandonmentThreshold,
    /// Conversion attribution lookback window in days
    pub conversion_days: u32,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Email scheduler API configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct SchedulerConfig {
    /// Base URL of the scheduler service
    pub base_url: Url,
    /// Bearer token for the scheduler API
    pub api_token: SecretString,
}

impl std::fmt::Debug for SchedulerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_token", &"[REDACTED]")
            .finish()
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid,
    /// or if the admin token fails the length check.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("FOLLOWUP_DATABASE_URL")?;
        let host = parse_env_or("FOLLOWUP_HOST", "127.0.0.1")?;
        let port = parse_env_or("FOLLOWUP_PORT", "3002")?;

        let admin_token = SecretString::from(get_required_env("FOLLOWUP_ADMIN_TOKEN")?);
        validate_admin_token(&admin_token, "FOLLOWUP_ADMIN_TOKEN")?;

        let scheduler = SchedulerConfig::from_env()?;
        let abandonment = abandonment_from_env()?;
        let conversion_days = parse_env_or("FOLLOWUP_CONVERSION_DAYS", "14")?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            database_url,
            host,
            port,
            admin_token,
            scheduler,
            abandonment,
            conversion_days,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl SchedulerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw = get_required_env("SCHEDULER_BASE_URL")?;
        let base_url = Url::parse(&raw)
            .map_err(|e| ConfigError::InvalidEnvVar("SCHEDULER_BASE_URL".to_owned(), e.to_string()))?;

        Ok(Self {
            base_url,
            api_token: SecretString::from(get_required_env("SCHEDULER_API_TOKEN")?),
        })
    }
}

fn abandonment_from_env() -> Result<AbandonmentThreshold, ConfigError> {
    let value: u32 = parse_env_or("FOLLOWUP_ABANDONED_AFTER", "1")?;
    let unit: ThresholdUnit = parse_env_or("FOLLOWUP_ABANDONED_UNIT", "hours")?;
    Ok(AbandonmentThreshold::new(value, unit))
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default, parsed into `T`.
fn parse_env_or<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Validate that the admin token meets the minimum length requirement.
fn validate_admin_token(token: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = token.expose_secret();
    if value.len() < MIN_ADMIN_TOKEN_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_ADMIN_TOKEN_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}
