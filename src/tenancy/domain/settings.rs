//! Decrypted, validated connection settings.

use super::{CredentialField, TenancyDomainError};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// PEM-encoded TLS CA material trusted for one tenant database.
#[derive(Clone)]
pub struct CaCertificate(SecretString);

impl CaCertificate {
    /// Wraps decrypted CA material.
    #[must_use]
    pub fn new(pem: impl Into<String>) -> Self {
        Self(SecretString::from(pem.into()))
    }

    /// Exposes the PEM text. Use only when handing it to the TLS layer.
    #[must_use]
    pub fn expose_pem(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for CaCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CaCertificate([REDACTED])")
    }
}

/// Plaintext parameter object consumed by [`ConnectionSettings::new`].
pub struct PlainCredentials {
    /// Database name.
    pub database_name: String,
    /// Login role.
    pub username: String,
    /// Login password.
    pub password: SecretString,
    /// Optional trusted CA; `None` disables TLS.
    pub certificate: Option<CaCertificate>,
}

/// Everything a driver needs to open a connection to one tenant database.
///
/// Values are decrypted and validated; construct through
/// [`ConnectionSettings::new`] so the usability invariant always holds.
#[derive(Clone)]
pub struct ConnectionSettings {
    host: String,
    port: u16,
    database_name: String,
    username: String,
    password: SecretString,
    certificate: Option<CaCertificate>,
}

impl ConnectionSettings {
    /// Validates decrypted credentials against the record's location.
    ///
    /// # Errors
    ///
    /// Returns [`TenancyDomainError::EmptyHost`] for a blank host,
    /// [`TenancyDomainError::InvalidPort`] for a port outside `1..=65535`,
    /// or [`TenancyDomainError::EmptyCredential`] when a mandatory
    /// credential is empty.
    pub fn new(
        host: &str,
        port: i32,
        credentials: PlainCredentials,
    ) -> Result<Self, TenancyDomainError> {
        let trimmed_host = host.trim();
        if trimmed_host.is_empty() {
            return Err(TenancyDomainError::EmptyHost);
        }

        let valid_port = u16::try_from(port)
            .ok()
            .filter(|value| *value != 0)
            .ok_or(TenancyDomainError::InvalidPort(port))?;

        let PlainCredentials {
            database_name,
            username,
            password,
            certificate,
        } = credentials;

        if database_name.is_empty() {
            return Err(TenancyDomainError::EmptyCredential(
                CredentialField::DatabaseName,
            ));
        }
        if username.is_empty() {
            return Err(TenancyDomainError::EmptyCredential(
                CredentialField::Username,
            ));
        }
        if password.expose_secret().is_empty() {
            return Err(TenancyDomainError::EmptyCredential(
                CredentialField::Password,
            ));
        }

        Ok(Self {
            host: trimmed_host.to_owned(),
            port: valid_port,
            database_name,
            username,
            password,
            certificate,
        })
    }

    /// Returns the host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the database name.
    #[must_use]
    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    /// Returns the login role.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the password secret.
    #[must_use]
    pub const fn password(&self) -> &SecretString {
        &self.password
    }

    /// Returns the trusted CA, if TLS is required.
    #[must_use]
    pub const fn certificate(&self) -> Option<&CaCertificate> {
        self.certificate.as_ref()
    }
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_name", &"[REDACTED]")
            .field("username", &"[REDACTED]")
            .field("password", &"[REDACTED]")
            .field("tls", &self.certificate.is_some())
            .finish()
    }
}
