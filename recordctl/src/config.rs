//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `RECORDCTL_CONFIG`
//! environment variable. A missing file is not an error: every field has a default.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `RECORDCTL_` override YAML values
//! 3. **JWT_SECRET / PORT** - Plain variables common in container deployments, mapped to
//!    `secret_key` and `port`
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `RECORDCTL_AUTH__SESSION__LIFETIME=1h` sets the `auth.session.lifetime` field.
//!
//! ## Usage
//!
//! ```no_run
//! use clap::Parser;
//! use recordctl::config::{Args, Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let args = Args::parse();
//! let config = Config::load(&args)?;
//!
//! println!("Server will bind to {}", config.bind_address());
//! # Ok(())
//! # }
//! ```
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! JWT_SECRET="$(openssl rand -hex 32)"
//! PORT=8080
//! RECORDCTL_ENVIRONMENT=production
//! RECORDCTL_ADMIN__USERNAME=admin
//! RECORDCTL_ADMIN__PASSWORD=admin123
//! RECORDCTL_LOG_FORMAT=json
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::auth::password::Argon2Params;
use crate::errors::Error;

const MIN_PRODUCTION_SECRET_BYTES: usize = 32;
const MIN_TOKEN_LIFETIME: Duration = Duration::from_secs(5 * 60);
const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "RECORDCTL_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Deployment environment; production turns on the `Secure` cookie flag
    pub environment: Environment,
    /// Secret key for session token signing (required)
    pub secret_key: Option<String>,
    /// Initial admin account, created at startup if no user by that name exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<AdminConfig>,
    pub auth: AuthConfig,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Initial admin user.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AdminConfig {
    pub username: String,
    pub email: String,
    #[serde(default = "AdminConfig::default_full_name")]
    pub full_name: String,
    #[serde(skip_serializing)]
    pub password: String,
}

impl AdminConfig {
    fn default_full_name() -> String {
        "Administrator".to_string()
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Session cookie and token settings
    pub session: SessionConfig,
    /// Password validation and hashing rules
    pub password: PasswordConfig,
    /// Security settings (CORS)
    pub security: SecurityConfig,
}

/// Session cookie configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Cookie name for the session token
    pub cookie_name: String,
    /// Token lifetime; also the cookie Max-Age
    #[serde(with = "humantime_serde")]
    pub lifetime: Duration,
}

/// Password validation rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PasswordConfig {
    /// Minimum password length
    pub min_length: usize,
    /// Argon2 memory cost in KiB (default: 19456 KiB = 19 MB)
    pub argon2_memory_kib: u32,
    /// Argon2 iterations (default: 2)
    pub argon2_iterations: u32,
    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,
}

/// Security configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecurityConfig {
    /// CORS configuration for browser clients
    pub cors: CorsConfig,
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests; empty allows no cross-origin browser access
    pub allowed_origins: Vec<CorsOrigin>,
    /// Allow credentials (cookies) in CORS requests
    pub allow_credentials: bool,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

/// CORS origin configuration.
///
/// Can be either a wildcard (`*`) to allow all origins, or a specific URL.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://app.example.com`)
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            environment: Environment::default(),
            secret_key: None,
            admin: None,
            auth: AuthConfig::default(),
            log_format: LogFormat::default(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "access_token".to_string(),
            lifetime: Duration::from_secs(24 * 60 * 60), // 24 hours
        }
    }
}

impl Default for PasswordConfig {
    fn default() -> Self {
        let argon2 = Argon2Params::default();
        Self {
            min_length: 6,
            argon2_memory_kib: argon2.memory_kib,
            argon2_iterations: argon2.iterations,
            argon2_parallelism: argon2.parallelism,
        }
    }
}

impl PasswordConfig {
    pub fn argon2_params(&self) -> Argon2Params {
        Argon2Params {
            memory_kib: self.argon2_memory_kib,
            iterations: self.argon2_iterations,
            parallelism: self.argon2_parallelism,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            allow_credentials: true,
            max_age: Some(3600), // Cache preflight for 1 hour
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        let invalid = |message: String| Error::Internal {
            operation: format!("Config validation: {message}"),
        };

        let secret_key = self.secret_key.as_deref().unwrap_or_default();
        if secret_key.is_empty() {
            return Err(invalid(
                "secret_key is not configured. Set JWT_SECRET or RECORDCTL_SECRET_KEY, or add secret_key to the config file."
                    .to_string(),
            ));
        }
        if self.environment == Environment::Production && secret_key.len() < MIN_PRODUCTION_SECRET_BYTES {
            return Err(invalid(format!(
                "secret_key must be at least {MIN_PRODUCTION_SECRET_BYTES} bytes in production"
            )));
        }

        let lifetime = self.auth.session.lifetime;
        if !(MIN_TOKEN_LIFETIME..=MAX_TOKEN_LIFETIME).contains(&lifetime) {
            return Err(invalid(format!(
                "auth.session.lifetime ({lifetime:?}) must be between {MIN_TOKEN_LIFETIME:?} and {MAX_TOKEN_LIFETIME:?}"
            )));
        }
        if self.auth.session.cookie_name.is_empty() {
            return Err(invalid("auth.session.cookie_name must not be empty".to_string()));
        }

        if self.auth.password.min_length == 0 {
            return Err(invalid("auth.password.min_length must be at least 1".to_string()));
        }

        if let Some(admin) = &self.admin
            && admin.password.chars().count() < self.auth.password.min_length
        {
            return Err(invalid(format!(
                "admin.password must be at least {} characters",
                self.auth.password.min_length
            )));
        }

        let cors = &self.auth.security.cors;
        if cors.allow_credentials && cors.allowed_origins.contains(&CorsOrigin::Wildcard) {
            return Err(invalid(
                "auth.security.cors cannot combine a '*' origin with allow_credentials".to_string(),
            ));
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can override specific values
            .merge(Env::prefixed("RECORDCTL_").ignore(&["config"]).split("__"))
            .merge(Env::raw().only(&["PORT"]))
            .merge(Env::raw().only(&["JWT_SECRET"]).map(|_| "secret_key".into()))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Cookies carry `Secure` only in production.
    pub fn cookie_secure(&self) -> bool {
        self.environment == Environment::Production
    }
}
