//! Encrypted tenant database connection records.

use super::TenantDatabaseId;
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::fmt;

/// Opaque ciphertext produced by a credential codec.
///
/// The wrapped value is never printed: `Debug` is redacted and there is no
/// `Display` implementation.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedValue(String);

impl EncryptedValue {
    /// Wraps ciphertext read from storage or produced by a codec.
    #[must_use]
    pub fn new(ciphertext: impl Into<String>) -> Self {
        Self(ciphertext.into())
    }

    /// Returns the ciphertext for persistence or decryption.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the ciphertext.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for EncryptedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptedValue([REDACTED, {} bytes])", self.0.len())
    }
}

/// Encrypted credential columns of a tenant database record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedCredentials {
    /// Encrypted database name.
    pub database_name: EncryptedValue,
    /// Encrypted login role.
    pub username: EncryptedValue,
    /// Encrypted login password.
    pub password: EncryptedValue,
    /// Encrypted TLS CA material; `None` means the connection does not use
    /// TLS.
    pub certificate: Option<EncryptedValue>,
}

/// Parameter object for reconstructing a persisted tenant database record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTenantDatabaseData {
    /// Persisted record identifier.
    pub id: TenantDatabaseId,
    /// Plaintext host.
    pub host: String,
    /// Plaintext port.
    pub port: i32,
    /// Encrypted credentials, present only when the read selected them.
    pub credentials: Option<EncryptedCredentials>,
    /// Timestamp of the last successful migration run.
    pub migrated_at: Option<DateTime<Utc>>,
}

/// Connection record for one tenant database, as stored in the control plane.
///
/// Credentials stay encrypted here; they are decrypted only by the
/// connection factory immediately before a connection is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantDatabaseRecord {
    id: TenantDatabaseId,
    host: String,
    port: i32,
    credentials: Option<EncryptedCredentials>,
    migrated_at: Option<DateTime<Utc>>,
}

impl TenantDatabaseRecord {
    /// Creates a never-migrated record with encrypted credentials.
    #[must_use]
    pub fn new(host: impl Into<String>, port: i32, credentials: EncryptedCredentials) -> Self {
        Self {
            id: TenantDatabaseId::new(),
            host: host.into(),
            port,
            credentials: Some(credentials),
            migrated_at: None,
        }
    }

    /// Reconstructs a record from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTenantDatabaseData) -> Self {
        Self {
            id: data.id,
            host: data.host,
            port: data.port,
            credentials: data.credentials,
            migrated_at: data.migrated_at,
        }
    }

    /// Returns the record identifier.
    #[must_use]
    pub const fn id(&self) -> TenantDatabaseId {
        self.id
    }

    /// Returns the plaintext host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the plaintext port.
    #[must_use]
    pub const fn port(&self) -> i32 {
        self.port
    }

    /// Returns the encrypted credentials if they were selected.
    #[must_use]
    pub const fn credentials(&self) -> Option<&EncryptedCredentials> {
        self.credentials.as_ref()
    }

    /// Returns whether the record carries TLS CA material.
    ///
    /// Always `false` when credentials were not selected.
    #[must_use]
    pub fn uses_tls(&self) -> bool {
        self.credentials
            .as_ref()
            .is_some_and(|credentials| credentials.certificate.is_some())
    }

    /// Returns the timestamp of the last successful migration run.
    #[must_use]
    pub const fn migrated_at(&self) -> Option<DateTime<Utc>> {
        self.migrated_at
    }

    /// Returns a copy of the record without its encrypted credentials.
    #[must_use]
    pub fn without_credentials(&self) -> Self {
        Self {
            credentials: None,
            ..self.clone()
        }
    }

    /// Records a successful migration run at the current clock time.
    pub fn mark_migrated(&mut self, clock: &impl Clock) -> DateTime<Utc> {
        let timestamp = clock.utc();
        self.migrated_at = Some(timestamp);
        timestamp
    }

    /// Records a successful migration run at an explicit time.
    pub fn set_migrated_at(&mut self, timestamp: DateTime<Utc>) {
        self.migrated_at = Some(timestamp);
    }
}
