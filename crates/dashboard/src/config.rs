//! Dashboard configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `NAVER_CLIENT_ID` - Commerce API application id
//! - `NAVER_CLIENT_SECRET` - Commerce API application secret (bcrypt-salt form)
//! - `SECRET_KEY` - Session signing secret (min 32 chars, high entropy)
//! - `ADMIN_PASSWORD` - Password for the dashboard login
//!
//! ## Optional
//! - `ADMIN_USERNAME` - Login username (default: admin)
//! - `HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 5000)
//! - `STALENESS_WINDOW_SECS` - Order cache staleness window (default: 300)
//! - `INCLUDE_FINALIZED` - Keep purchase-confirmed orders (default: false)
//! - `SERVICE_ACCOUNT_FILE` - Google service account key path (default: service_account.json)
//! - `SPREADSHEET_NAME` - Spreadsheet the orders are mirrored into (default: SmartStore_Orders)
//! - `SPREADSHEET_ID` - Spreadsheet id; skips the by-name lookup when set
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
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

/// Dashboard application configuration.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Dashboard login credentials
    pub admin: AdminCredentials,
    /// Naver Commerce API configuration
    pub commerce: CommerceConfig,
    /// Order cache behavior
    pub orders: OrderCacheConfig,
    /// Google Sheets mirror, absent when no service account key is present
    pub sheets: Option<SheetsConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Credentials for the single dashboard login.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct AdminCredentials {
    /// Login username
    pub username: String,
    /// Login password
    pub password: SecretString,
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Naver Commerce API application credentials.
///
/// Implements `Debug` manually to redact the client secret.
#[derive(Clone)]
pub struct CommerceConfig {
    /// Application client id
    pub client_id: String,
    /// Application client secret, a bcrypt salt string issued by the platform
    pub client_secret: SecretString,
}

impl std::fmt::Debug for CommerceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommerceConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// Order cache tuning.
#[derive(Debug, Clone)]
pub struct OrderCacheConfig {
    /// Snapshot age beyond which a read triggers a refresh
    pub staleness_window: Duration,
    /// Whether purchase-confirmed orders are kept in the dashboard
    pub include_finalized: bool,
}

/// Google Sheets mirror configuration.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    /// Path to the service account key JSON
    pub service_account_file: PathBuf,
    /// Spreadsheet to open when no id is configured
    pub spreadsheet_name: String,
    /// Spreadsheet id, bypassing the Drive by-name lookup
    pub spreadsheet_id: Option<String>,
}

impl DashboardConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the session secret fails validation (placeholder detection,
    /// entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("HOST", "0.0.0.0")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("PORT", "5000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("PORT".to_string(), e.to_string()))?;

        let session_secret = get_validated_secret("SECRET_KEY")?;
        validate_session_secret(&session_secret, "SECRET_KEY")?;

        let admin = AdminCredentials {
            username: get_env_or_default("ADMIN_USERNAME", "admin"),
            password: get_required_secret("ADMIN_PASSWORD")?,
        };

        let commerce = CommerceConfig {
            client_id: get_required_env("NAVER_CLIENT_ID")?,
            client_secret: get_required_secret("NAVER_CLIENT_SECRET")?,
        };

        let orders = OrderCacheConfig::from_env()?;
        let sheets = SheetsConfig::from_env();
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            host,
            port,
            session_secret,
            admin,
            commerce,
            orders,
            sheets,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl OrderCacheConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let staleness_secs = get_env_or_default("STALENESS_WINDOW_SECS", "300")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STALENESS_WINDOW_SECS".to_string(), e.to_string())
            })?;
        let include_finalized = get_env_or_default("INCLUDE_FINALIZED", "false")
            .parse::<bool>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("INCLUDE_FINALIZED".to_string(), e.to_string())
            })?;

        Ok(Self {
            staleness_window: Duration::from_secs(staleness_secs),
            include_finalized,
        })
    }
}

impl SheetsConfig {
    /// The mirror is opt-in by presence of the key file: no file, no mirror.
    fn from_env() -> Option<Self> {
        let service_account_file =
            PathBuf::from(get_env_or_default("SERVICE_ACCOUNT_FILE", "service_account.json"));
        if !service_account_file.exists() {
            return None;
        }

        Some(Self {
            service_account_file,
            spreadsheet_name: get_env_or_default("SPREADSHEET_NAME", "SmartStore_Orders"),
            spreadsheet_id: get_optional_env("SPREADSHEET_ID"),
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

/// Get a required environment variable as a secret.
///
/// No strength validation: platform-issued secrets have a fixed format and
/// login passwords are human-chosen.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real secrets like session keys have high entropy)
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
