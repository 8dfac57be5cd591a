//! Configuration loading and constants.
//!
//! Loads application configuration from a TOML file and defines constants for
//! listener ports, connection deadlines, the ACME challenge route, and logging
//! defaults. `AppConfig` is the root configuration struct.

use serde::Deserialize;
use std::path::Path;

// =============================================================================
// Listener Constants
// =============================================================================

/// Default plaintext (HTTP) port
pub const DEFAULT_HTTP_PORT: u16 = 80;

/// Default encrypted (HTTPS) port
pub const DEFAULT_HTTPS_PORT: u16 = 443;

/// Default listen host
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Per-request deadline in seconds. Bounds slow or malicious clients so an
/// unlimited stream of garbage requests cannot pin handler resources.
pub const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Grace window for connection draining on shutdown, in seconds
pub const SHUTDOWN_GRACE_SECS: u64 = 30;

// =============================================================================
// ACME Challenge Route
// =============================================================================

/// Route template for the ACME HTTP-01 well-known path. The path match is
/// exact and case-sensitive, per the challenge protocol.
pub const ACME_CHALLENGE_ROUTE: &str = "/.well-known/acme-challenge/{token}";

// =============================================================================
// Default Paths and Strings
// =============================================================================

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Default log filter when RUST_LOG is not set
pub const DEFAULT_LOG_FILTER: &str = "acmegate=debug,tower_http=info";

/// Default log format (text or json)
pub const DEFAULT_LOG_FORMAT: &str = "text";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    /// Listener configuration
    #[serde(default)]
    pub http: HttpConfig,
    /// Certificate pair for the encrypted listener
    #[serde(default)]
    pub tls: TlsConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Host to bind both listeners on
    #[serde(default = "HttpConfig::default_host")]
    pub host: String,
    /// Plaintext port, always bound by the running process
    #[serde(default = "HttpConfig::default_port")]
    pub port: u16,
    /// Encrypted port, bound only once a certificate pair is available
    #[serde(default = "HttpConfig::default_https_port")]
    pub https_port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            https_port: Self::default_https_port(),
        }
    }
}

impl HttpConfig {
    fn default_host() -> String {
        DEFAULT_HOST.to_string()
    }

    fn default_port() -> u16 {
        DEFAULT_HTTP_PORT
    }

    fn default_https_port() -> u16 {
        DEFAULT_HTTPS_PORT
    }
}

/// Certificate pair configuration. Both paths must be set for the encrypted
/// listener to start; the files are read once at startup and handed to the
/// listener as opaque PEM bytes.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TlsConfig {
    /// Path to the PEM certificate chain (typically a wildcard certificate)
    pub cert_path: Option<String>,
    /// Path to the matching PEM private key
    pub key_path: Option<String>,
}

impl TlsConfig {
    /// Returns the certificate pair paths when both are configured.
    pub fn cert_pair(&self) -> Option<(&str, &str)> {
        match (self.cert_path.as_deref(), self.key_path.as_deref()) {
            (Some(cert), Some(key)) => Some((cert, key)),
            _ => None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log format: "text" (human-readable, default) or "json" (structured)
    #[serde(default = "LoggingConfig::default_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: DEFAULT_LOG_FORMAT.to_string(),
        }
    }
}

impl LoggingConfig {
    fn default_format() -> String {
        DEFAULT_LOG_FORMAT.to_string()
    }
}

impl AppConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;

        // Validate: a certificate path without a key path (or vice versa)
        // can never start the encrypted listener
        if config.tls.cert_path.is_some() != config.tls.key_path.is_some() {
            return Err(ConfigError::Validation(
                "tls.cert_path and tls.key_path must be set together".to_string(),
            ));
        }

        Ok(config)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Configuration error: {0}")]
    Validation(String),
}
