//! Environment-driven configuration for the tenancy runtime.

use secrecy::SecretString;
use std::time::Duration;
use thiserror::Error;

use crate::tenancy::services::DEFAULT_IDLE_TIMEOUT;

const CONTROL_PLANE_URL: &str = "TENANCY_CONTROL_PLANE_URL";
const CREDENTIAL_KEY: &str = "TENANCY_CREDENTIAL_KEY";
const TENANT_MIGRATIONS_DIR: &str = "TENANCY_TENANT_MIGRATIONS_DIR";
const CERTIFICATE_DIR: &str = "TENANCY_CERTIFICATE_DIR";
const SCHEMA: &str = "TENANCY_SCHEMA";
const IDLE_TIMEOUT_SECS: &str = "TENANCY_IDLE_TIMEOUT_SECS";
const CONNECT_TIMEOUT_SECS: &str = "TENANCY_CONNECT_TIMEOUT_SECS";
const POOL_MAX_SIZE: &str = "TENANCY_POOL_MAX_SIZE";

const DEFAULT_TENANT_MIGRATIONS_DIR: &str = "migrations/tenant";
const DEFAULT_SCHEMA: &str = "public";
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_POOL_MAX_SIZE: u32 = 5;

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("missing required setting {0}")]
    Missing(&'static str),
    /// A variable holds an unusable value.
    #[error("invalid value for {name}: {reason}")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Settings for the control plane, the credential codec, and tenant
/// connections.
#[derive(Debug, Clone)]
pub struct TenancyConfig {
    control_plane_url: SecretString,
    credential_key: SecretString,
    tenant_migrations_dir: String,
    certificate_dir: String,
    schema: String,
    idle_timeout: Duration,
    connect_timeout: Duration,
    pool_max_size: u32,
}

impl TenancyConfig {
    /// Creates a configuration with defaults for every optional setting.
    #[must_use]
    pub fn new(control_plane_url: SecretString, credential_key: SecretString) -> Self {
        Self {
            control_plane_url,
            credential_key,
            tenant_migrations_dir: DEFAULT_TENANT_MIGRATIONS_DIR.to_owned(),
            certificate_dir: default_certificate_dir(),
            schema: DEFAULT_SCHEMA.to_owned(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            pool_max_size: DEFAULT_POOL_MAX_SIZE,
        }
    }

    /// Reads the configuration from `TENANCY_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a required variable is missing or a
    /// value cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a required variable is missing or a
    /// value cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &'static str| lookup(name).filter(|value| !value.trim().is_empty());
        let required = |name: &'static str| {
            read(name)
                .map(SecretString::from)
                .ok_or(ConfigError::Missing(name))
        };

        let mut config = Self::new(required(CONTROL_PLANE_URL)?, required(CREDENTIAL_KEY)?);
        if let Some(dir) = read(TENANT_MIGRATIONS_DIR) {
            config = config.with_tenant_migrations_dir(dir);
        }
        if let Some(dir) = read(CERTIFICATE_DIR) {
            config = config.with_certificate_dir(dir);
        }
        if let Some(schema) = read(SCHEMA) {
            config = config.with_schema(schema)?;
        }
        if let Some(raw) = read(IDLE_TIMEOUT_SECS) {
            let secs = parse_positive(IDLE_TIMEOUT_SECS, &raw)?;
            config = config.with_idle_timeout(Duration::from_secs(secs));
        }
        if let Some(raw) = read(CONNECT_TIMEOUT_SECS) {
            let secs = parse_positive(CONNECT_TIMEOUT_SECS, &raw)?;
            config = config.with_connect_timeout(Duration::from_secs(secs));
        }
        if let Some(raw) = read(POOL_MAX_SIZE) {
            let size = parse_positive(POOL_MAX_SIZE, &raw)?;
            let pool_max_size = u32::try_from(size).map_err(|err| ConfigError::Invalid {
                name: POOL_MAX_SIZE,
                reason: err.to_string(),
            })?;
            config = config.with_pool_max_size(pool_max_size);
        }
        Ok(config)
    }

    /// Sets the directory holding tenant migration scripts.
    #[must_use]
    pub fn with_tenant_migrations_dir(mut self, dir: impl Into<String>) -> Self {
        self.tenant_migrations_dir = dir.into();
        self
    }

    /// Sets the directory where CA material is written.
    #[must_use]
    pub fn with_certificate_dir(mut self, dir: impl Into<String>) -> Self {
        self.certificate_dir = dir.into();
        self
    }

    /// Sets the schema placed on every tenant session's search path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] unless the name is a plain lowercase
    /// identifier.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Result<Self, ConfigError> {
        let value = schema.into();
        let mut chars = value.chars();
        let valid = chars
            .next()
            .is_some_and(|first| first.is_ascii_lowercase() || first == '_')
            && chars.all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_');
        if !valid {
            return Err(ConfigError::Invalid {
                name: SCHEMA,
                reason: format!("'{value}' is not a plain identifier"),
            });
        }
        self.schema = value;
        Ok(self)
    }

    /// Sets the idle window for cached tenant connections.
    #[must_use]
    pub const fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Sets the handshake timeout for tenant connections.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the per-tenant pool size.
    #[must_use]
    pub const fn with_pool_max_size(mut self, size: u32) -> Self {
        self.pool_max_size = size;
        self
    }

    /// Returns the control-plane connection URL.
    #[must_use]
    pub const fn control_plane_url(&self) -> &SecretString {
        &self.control_plane_url
    }

    /// Returns the credential codec secret.
    #[must_use]
    pub const fn credential_key(&self) -> &SecretString {
        &self.credential_key
    }

    /// Returns the tenant migration directory.
    #[must_use]
    pub fn tenant_migrations_dir(&self) -> &str {
        &self.tenant_migrations_dir
    }

    /// Returns the certificate directory.
    #[must_use]
    pub fn certificate_dir(&self) -> &str {
        &self.certificate_dir
    }

    /// Returns the tenant schema name.
    #[must_use]
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Returns the idle window.
    #[must_use]
    pub const fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Returns the handshake timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Returns the per-tenant pool size.
    #[must_use]
    pub const fn pool_max_size(&self) -> u32 {
        self.pool_max_size
    }
}

fn default_certificate_dir() -> String {
    std::env::temp_dir()
        .join("tenancy-certs")
        .to_string_lossy()
        .into_owned()
}

fn parse_positive(name: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid {
            name,
            reason: "must be greater than zero".to_owned(),
        }),
        Ok(value) => Ok(value),
        Err(err) => Err(ConfigError::Invalid {
            name,
            reason: err.to_string(),
        }),
    }
}
