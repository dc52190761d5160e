//! Configuration for both binaries, loaded from environment variables.
//!
//! Configuration is loaded once at startup and validated before anything
//! else runs. A `.env` file is honoured when present (see `dotenvy` in the
//! binaries).
//!
//! ## Shortening service (`shortener`)
//!
//! - `LISTEN` - Bind address (default: `0.0.0.0:8080`)
//! - `RUST_LOG` - Log level (default: `info`)
//! - `LOG_FORMAT` - Log format: `text` or `json` (default: `text`)
//! - `SHORT_CODE_LENGTH` - Generated code length (default: 4, range 4-16)
//! - `CODE_MAX_ATTEMPTS` - Collision retries per shorten (default: 10, range 1-100)
//!
//! ## Operator (`operator`)
//!
//! Every variable can also be passed as a command-line flag.
//!
//! - `SHORTENER_URL` - Base URL of the shortening service
//! - `SHORTENER_TIMEOUT_SECONDS` - Per-request timeout (default: 10)
//! - `WATCH_NAMESPACE` - Namespace to watch (empty for cluster-wide)
//! - `BACKEND_NAME`, `BACKEND_NAMESPACE`, `BACKEND_IMAGE` - Backing Deployment/Service
//! - `REQUEUE_SECONDS` - Delay between passes (default: 10)
//! - `MAX_ERROR_REQUEUE_SECONDS` - Error backoff ceiling (default: 300)
//! - `RUST_LOG`, `LOG_FORMAT` - As above

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

use crate::domain::store::DEFAULT_MAX_ATTEMPTS;
use crate::operator::resources::BackendSpec;
use crate::utils::code_generator::DEFAULT_CODE_LENGTH;

/// Shortening service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub listen_addr: String,
    pub log_level: String,
    pub log_format: String,
    /// Number of characters in generated short codes.
    pub code_length: usize,
    /// Fresh codes tried before a shorten request fails with 500.
    pub code_max_attempts: usize,
}

impl ServiceConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let listen_addr = env::var("LISTEN").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let log_format = env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

        let code_length = parse_var("SHORT_CODE_LENGTH")?.unwrap_or(DEFAULT_CODE_LENGTH);
        let code_max_attempts = parse_var("CODE_MAX_ATTEMPTS")?.unwrap_or(DEFAULT_MAX_ATTEMPTS);

        Ok(Self {
            listen_addr,
            log_level,
            log_format,
            code_length,
            code_max_attempts,
        })
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `log_format` is not `text` or `json`
    /// - `listen_addr` is not `host:port`
    /// - `code_length` is outside 4-16
    /// - `code_max_attempts` is outside 1-100
    pub fn validate(&self) -> Result<()> {
        validate_log_format(&self.log_format)?;

        if !self.listen_addr.contains(':') {
            anyhow::bail!(
                "LISTEN must be in format 'host:port', got '{}'",
                self.listen_addr
            );
        }

        if !(4..=16).contains(&self.code_length) {
            anyhow::bail!(
                "SHORT_CODE_LENGTH must be between 4 and 16, got {}",
                self.code_length
            );
        }

        if !(1..=100).contains(&self.code_max_attempts) {
            anyhow::bail!(
                "CODE_MAX_ATTEMPTS must be between 1 and 100, got {}",
                self.code_max_attempts
            );
        }

        Ok(())
    }

    /// Prints configuration summary.
    pub fn print_summary(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Listen address: {}", self.listen_addr);
        tracing::info!("  Log level: {}", self.log_level);
        tracing::info!("  Log format: {}", self.log_format);
        tracing::info!("  Short code length: {}", self.code_length);
        tracing::info!("  Code attempts: {}", self.code_max_attempts);
    }
}

/// Operator configuration.
///
/// Parsed by `clap`, so each field is settable by flag or environment variable.
#[derive(Debug, Clone, clap::Args)]
pub struct OperatorConfig {
    /// Base URL of the shortening service
    #[arg(
        long,
        env = "SHORTENER_URL",
        default_value = "http://urlshortener-api.urlshortener-operator-system.svc.cluster.local:8080"
    )]
    pub shortener_url: String,

    /// Timeout for each request to the shortening service, in seconds
    #[arg(long, env = "SHORTENER_TIMEOUT_SECONDS", default_value_t = 10)]
    pub shortener_timeout_seconds: u64,

    /// Namespace to watch (empty for cluster-wide)
    #[arg(long, env = "WATCH_NAMESPACE", default_value = "")]
    pub namespace: String,

    /// Name of the backing Deployment and Service
    #[arg(long, env = "BACKEND_NAME", default_value = "urlshortener-api")]
    pub backend_name: String,

    /// Namespace of the backing Deployment and Service
    #[arg(
        long,
        env = "BACKEND_NAMESPACE",
        default_value = "urlshortener-operator-system"
    )]
    pub backend_namespace: String,

    /// Container image of the shortening service
    #[arg(
        long,
        env = "BACKEND_IMAGE",
        default_value = "docker.io/sadegh81/url-shortener:v2"
    )]
    pub backend_image: String,

    /// Delay between convergence passes, in seconds
    #[arg(long, env = "REQUEUE_SECONDS", default_value_t = 10)]
    pub requeue_seconds: u64,

    /// Upper bound for the error backoff, in seconds
    #[arg(long, env = "MAX_ERROR_REQUEUE_SECONDS", default_value_t = 300)]
    pub max_error_requeue_seconds: u64,

    /// Log level (trace, debug, info, warn, error) or an env-filter directive
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Log format: text or json
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: String,
}

impl OperatorConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `shortener_url` is not an absolute http(s) URL
    /// - a timeout or requeue interval is zero
    /// - the error backoff ceiling is below the requeue interval
    /// - a backend name, namespace or image is empty
    /// - `log_format` is not `text` or `json`
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.shortener_url)
            .with_context(|| format!("SHORTENER_URL is not a valid URL: '{}'", self.shortener_url))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            anyhow::bail!(
                "SHORTENER_URL must use http or https, got '{}'",
                self.shortener_url
            );
        }

        if self.shortener_timeout_seconds == 0 {
            anyhow::bail!("SHORTENER_TIMEOUT_SECONDS must be greater than 0");
        }

        if self.requeue_seconds == 0 {
            anyhow::bail!("REQUEUE_SECONDS must be greater than 0");
        }

        if self.max_error_requeue_seconds < self.requeue_seconds {
            anyhow::bail!(
                "MAX_ERROR_REQUEUE_SECONDS ({}) must not be below REQUEUE_SECONDS ({})",
                self.max_error_requeue_seconds,
                self.requeue_seconds
            );
        }

        for (var, value) in [
            ("BACKEND_NAME", &self.backend_name),
            ("BACKEND_NAMESPACE", &self.backend_namespace),
            ("BACKEND_IMAGE", &self.backend_image),
        ] {
            if value.trim().is_empty() {
                anyhow::bail!("{var} must not be empty");
            }
        }

        validate_log_format(&self.log_format)
    }

    /// Namespace to watch, `None` meaning all namespaces.
    pub fn watch_namespace(&self) -> Option<&str> {
        if self.namespace.is_empty() {
            None
        } else {
            Some(&self.namespace)
        }
    }

    pub fn shortener_timeout(&self) -> Duration {
        Duration::from_secs(self.shortener_timeout_seconds)
    }

    pub fn requeue_interval(&self) -> Duration {
        Duration::from_secs(self.requeue_seconds)
    }

    pub fn max_error_requeue(&self) -> Duration {
        Duration::from_secs(self.max_error_requeue_seconds)
    }

    /// Identity and image of the backing Deployment and Service.
    pub fn backend(&self) -> BackendSpec {
        BackendSpec {
            name: self.backend_name.clone(),
            namespace: self.backend_namespace.clone(),
            image: self.backend_image.clone(),
        }
    }

    /// Prints configuration summary.
    pub fn print_summary(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Shortener URL: {}", self.shortener_url);
        tracing::info!(
            "  Watch namespace: {}",
            self.watch_namespace().unwrap_or("all")
        );
        tracing::info!(
            "  Backend: {}/{} ({})",
            self.backend_namespace,
            self.backend_name,
            self.backend_image
        );
        tracing::info!("  Requeue interval: {}s", self.requeue_seconds);
        tracing::info!("  Log level: {}", self.log_level);
        tracing::info!("  Log format: {}", self.log_format);
    }
}

fn validate_log_format(log_format: &str) -> Result<()> {
    if log_format != "text" && log_format != "json" {
        anyhow::bail!("LOG_FORMAT must be 'text' or 'json', got '{}'", log_format);
    }
    Ok(())
}

/// Reads and parses an optional variable; unset yields `Ok(None)`.
fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{name} has an invalid value: '{value}'")),
        Err(_) => Ok(None),
    }
}

/// Loads and validates the shortening service configuration.
///
/// # Errors
///
/// Returns an error if a variable cannot be parsed or validation fails.
///
/// # Note
///
/// This function expects environment variables to be already loaded
/// (e.g., via `dotenvy::dotenv()` in `main.rs`).
pub fn load_from_env() -> Result<ServiceConfig> {
    let config = ServiceConfig::from_env()?;
    config.validate()?;
    Ok(config)
}
