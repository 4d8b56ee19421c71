//! Credential codec port for encrypting connection details at rest.

use crate::tenancy::domain::{EncryptedCredentials, EncryptedValue};
use thiserror::Error;

/// Result type for credential codec operations.
pub type CredentialCodecResult<T> = Result<T, CredentialCodecError>;

/// Reversible encryption of credential strings.
///
/// Implementations must satisfy `decrypt(encrypt(x)) == x` for every string,
/// including the empty string.
pub trait CredentialCodec: Send + Sync {
    /// Encrypts a plaintext value.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialCodecError::EncryptionFailed`] when the cipher
    /// rejects the input.
    fn encrypt(&self, plaintext: &str) -> CredentialCodecResult<EncryptedValue>;

    /// Decrypts a value produced by [`CredentialCodec::encrypt`].
    ///
    /// # Errors
    ///
    /// Returns [`CredentialCodecError::MalformedCiphertext`] when the value is
    /// not in the codec's format, or
    /// [`CredentialCodecError::DecryptionFailed`] when authentication fails.
    fn decrypt(&self, ciphertext: &EncryptedValue) -> CredentialCodecResult<String>;

    /// Encrypts an optional value; `None` stays `None`.
    ///
    /// # Errors
    ///
    /// Propagates [`CredentialCodec::encrypt`] failures.
    fn encrypt_optional(
        &self,
        plaintext: Option<&str>,
    ) -> CredentialCodecResult<Option<EncryptedValue>> {
        plaintext.map(|value| self.encrypt(value)).transpose()
    }

    /// Decrypts an optional value; `None` stays `None`.
    ///
    /// # Errors
    ///
    /// Propagates [`CredentialCodec::decrypt`] failures.
    fn decrypt_optional(
        &self,
        ciphertext: Option<&EncryptedValue>,
    ) -> CredentialCodecResult<Option<String>> {
        ciphertext.map(|value| self.decrypt(value)).transpose()
    }

    /// Encrypts the credential columns of a tenant database record.
    ///
    /// # Errors
    ///
    /// Propagates [`CredentialCodec::encrypt`] failures.
    fn seal_credentials(
        &self,
        database_name: &str,
        username: &str,
        password: &str,
        certificate: Option<&str>,
    ) -> CredentialCodecResult<EncryptedCredentials> {
        Ok(EncryptedCredentials {
            database_name: self.encrypt(database_name)?,
            username: self.encrypt(username)?,
            password: self.encrypt(password)?,
            certificate: self.encrypt_optional(certificate)?,
        })
    }
}

/// Errors returned by credential codec implementations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CredentialCodecError {
    /// The configured key cannot be used.
    #[error("credential key is invalid: {0}")]
    InvalidKey(String),

    /// The ciphertext is not in the expected encoding.
    #[error("ciphertext is malformed: {0}")]
    MalformedCiphertext(String),

    /// Authentication of the ciphertext failed.
    #[error("decryption failed: wrong key or corrupted data")]
    DecryptionFailed,

    /// The cipher could not encrypt the input.
    #[error("encryption failed")]
    EncryptionFailed,
}
