//! Engine configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional; without `EMPORIUM_API_BASE_URL` the engine
//! runs in offline mode and prices delivery from the built-in fallback rules.
//!
//! - `EMPORIUM_API_BASE_URL` - Base URL of the delivery/product API
//! - `EMPORIUM_API_TOKEN` - Bearer token for the API
//! - `EMPORIUM_HTTP_TIMEOUT_SECS` - Request timeout (default: 10)
//! - `EMPORIUM_RULES_CACHE_TTL_SECS` - Delivery options/zone cache TTL (default: 300)
//! - `EMPORIUM_CURRENCY` - Display currency (default: LKR)
//! - `EMPORIUM_HIGH_VALUE_THRESHOLD` - Cart value that prompts guests to register (default: 10000)
//! - `EMPORIUM_CART_DIR` - Directory for file-backed cart persistence
//! - `EMPORIUM_DATABASE_URL` - `PostgreSQL` connection string (`postgres` feature)

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use emporium_core::{CurrencyCode, Money};
use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RULES_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_HIGH_VALUE_THRESHOLD: i64 = 10_000;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default)]
pub struct StorefrontConfig {
    /// Remote API access
    pub api: ApiSettings,
    /// Cart behaviour
    pub cart: CartSettings,
    /// Directory for [`FilePersistence`](crate::cart::FilePersistence)
    pub cart_dir: Option<PathBuf>,
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: Option<SecretString>,
}

/// Remote delivery/product API configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct ApiSettings {
    /// Base URL; `None` means offline mode
    pub base_url: Option<Url>,
    /// Optional bearer token
    pub token: Option<SecretString>,
    /// Per-request timeout
    pub timeout: Duration,
    /// TTL for cached delivery options and zone lookups
    pub cache_ttl: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            token: None,
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            cache_ttl: Duration::from_secs(DEFAULT_RULES_CACHE_TTL_SECS),
        }
    }
}

impl std::fmt::Debug for ApiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiSettings")
            .field("base_url", &self.base_url.as_ref().map(Url::as_str))
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

/// Cart behaviour settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartSettings {
    /// Cart value above which a guest with two or more lines is prompted to register
    pub high_value_threshold: Money,
    /// Currency used in customer-facing messages
    pub currency: CurrencyCode,
}

impl Default for CartSettings {
    fn default() -> Self {
        Self {
            high_value_threshold: Money::from_major(DEFAULT_HIGH_VALUE_THRESHOLD),
            currency: CurrencyCode::LKR,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            api: ApiSettings::from_env()?,
            cart: CartSettings::from_env()?,
            cart_dir: get_optional_env("EMPORIUM_CART_DIR").map(PathBuf::from),
            database_url: get_database_url("EMPORIUM_DATABASE_URL"),
        })
    }

    /// The database URL, required by the `postgres` persistence backend.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if no database URL was configured.
    pub fn require_database_url(&self) -> Result<&SecretString, ConfigError> {
        self.database_url
            .as_ref()
            .ok_or_else(|| ConfigError::MissingEnvVar("EMPORIUM_DATABASE_URL".to_string()))
    }
}

impl ApiSettings {
    fn from_env() -> Result<Self, ConfigError> {
        let base_url = get_optional_env("EMPORIUM_API_BASE_URL")
            .map(|raw| {
                Url::parse(&raw).map_err(|e| {
                    ConfigError::InvalidEnvVar("EMPORIUM_API_BASE_URL".to_string(), e.to_string())
                })
            })
            .transpose()?;

        Ok(Self {
            base_url,
            token: get_optional_env("EMPORIUM_API_TOKEN").map(SecretString::from),
            timeout: Duration::from_secs(parse_env_or(
                "EMPORIUM_HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?),
            cache_ttl: Duration::from_secs(parse_env_or(
                "EMPORIUM_RULES_CACHE_TTL_SECS",
                DEFAULT_RULES_CACHE_TTL_SECS,
            )?),
        })
    }
}

impl CartSettings {
    fn from_env() -> Result<Self, ConfigError> {
        let threshold = parse_env_or(
            "EMPORIUM_HIGH_VALUE_THRESHOLD",
            Decimal::from(DEFAULT_HIGH_VALUE_THRESHOLD),
        )?;
        let currency = get_optional_env("EMPORIUM_CURRENCY")
            .map(|raw| {
                raw.parse::<CurrencyCode>()
                    .map_err(|e| ConfigError::InvalidEnvVar("EMPORIUM_CURRENCY".to_string(), e))
            })
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            high_value_threshold: Money::new(threshold),
            currency,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an optional environment variable, using `default` when unset.
fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Option<SecretString> {
    get_optional_env(primary_key)
        .or_else(|| get_optional_env("DATABASE_URL"))
        .map(SecretString::from)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_or_uses_default_when_unset() {
        let value: u64 = parse_env_or("EMPORIUM_TEST_DEFINITELY_UNSET_VAR", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_require_database_url_missing() {
        let config = StorefrontConfig::default();
        let err = config.require_database_url().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing environment variable: EMPORIUM_DATABASE_URL"
        );
    }

    #[test]
    fn test_cart_settings_default() {
        let settings = CartSettings::default();
        assert_eq!(settings.high_value_threshold, Money::from_major(10_000));
        assert_eq!(settings.currency, CurrencyCode::LKR);
    }

    #[test]
    fn test_api_settings_default_is_offline() {
        let settings = ApiSettings::default();
        assert!(settings.base_url.is_none());
        assert_eq!(settings.timeout, Duration::from_secs(10));
        assert_eq!(settings.cache_ttl, Duration::from_secs(300));
    }

    #[test]
    fn test_api_settings_debug_redacts_token() {
        let settings = ApiSettings {
            base_url: Some(Url::parse("https://api.example.lk/api").unwrap()),
            token: Some(SecretString::from("super_secret_api_token")),
            ..ApiSettings::default()
        };

        let debug_output = format!("{settings:?}");

        assert!(debug_output.contains("https://api.example.lk/api"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_api_token"));
    }
}
