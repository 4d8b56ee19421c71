//! Decrypts tenant database records and opens connections through a driver.

use crate::tenancy::{
    domain::{
        CaCertificate, ConnectionSettings, PlainCredentials, TenancyDomainError, TenantDatabaseId,
        TenantDatabaseRecord,
    },
    ports::{CredentialCodec, CredentialCodecError, DriverError, TenantDatabaseDriver},
};
use secrecy::SecretString;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors produced while turning a record into a live connection.
///
/// Messages never include decrypted values.
#[derive(Debug, Clone, Error)]
pub enum ConnectionError {
    /// The record was read without its credential columns.
    #[error("credentials were not selected for tenant database {0}")]
    CredentialsNotSelected(TenantDatabaseId),
    /// A credential column could not be decrypted.
    #[error("could not decrypt tenant credentials: {0}")]
    Decrypt(#[from] CredentialCodecError),
    /// Decrypted settings are incomplete.
    #[error("incomplete tenant connection settings: {0}")]
    Incomplete(#[from] TenancyDomainError),
    /// The driver failed to open the connection.
    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl ConnectionError {
    /// Returns whether the failure came from the database handshake.
    #[must_use]
    pub const fn is_handshake(&self) -> bool {
        matches!(self, Self::Driver(DriverError::Handshake(_)))
    }
}

/// Builds eager tenant connections from encrypted records.
pub struct ConnectionFactory<K, D>
where
    K: CredentialCodec,
    D: TenantDatabaseDriver,
{
    codec: Arc<K>,
    driver: Arc<D>,
}

impl<K, D> Clone for ConnectionFactory<K, D>
where
    K: CredentialCodec,
    D: TenantDatabaseDriver,
{
    fn clone(&self) -> Self {
        Self {
            codec: Arc::clone(&self.codec),
            driver: Arc::clone(&self.driver),
        }
    }
}

impl<K, D> ConnectionFactory<K, D>
where
    K: CredentialCodec,
    D: TenantDatabaseDriver,
{
    /// Creates a factory over a codec and a driver.
    #[must_use]
    pub const fn new(codec: Arc<K>, driver: Arc<D>) -> Self {
        Self { codec, driver }
    }

    /// Decrypts `record` and opens a connection to it.
    ///
    /// The returned handle has completed its handshake; the caller owns
    /// closing it.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError`] when decryption, validation, or the driver
    /// handshake fails.
    pub async fn create_connection(
        &self,
        record: &TenantDatabaseRecord,
    ) -> Result<D::Connection, ConnectionError> {
        let settings = self.decrypt_settings(record)?;
        debug!(
            database_id = %record.id(),
            host = settings.host(),
            port = settings.port(),
            tls = settings.certificate().is_some(),
            "opening tenant database connection"
        );
        Ok(self.driver.open(settings).await?)
    }

    /// Decrypts `record` into connection settings without opening anything.
    ///
    /// An empty decrypted certificate counts as no certificate.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::CredentialsNotSelected`] when the record
    /// has no credential columns, or a decryption or validation error.
    pub fn decrypt_settings(
        &self,
        record: &TenantDatabaseRecord,
    ) -> Result<ConnectionSettings, ConnectionError> {
        let credentials = record
            .credentials()
            .ok_or(ConnectionError::CredentialsNotSelected(record.id()))?;

        let plain = PlainCredentials {
            database_name: self.codec.decrypt(&credentials.database_name)?,
            username: self.codec.decrypt(&credentials.username)?,
            password: SecretString::from(self.codec.decrypt(&credentials.password)?),
            certificate: self
                .codec
                .decrypt_optional(credentials.certificate.as_ref())?
                .filter(|pem| !pem.trim().is_empty())
                .map(CaCertificate::new),
        };
        Ok(ConnectionSettings::new(record.host(), record.port(), plain)?)
    }
}
