//! AES-256-GCM credential codec.
//!
//! Ciphertext layout is `base64(nonce || sealed)`, with a fresh random
//! 96-bit nonce per call. The cipher key is the SHA-256 digest of the
//! configured secret.

use crate::tenancy::{
    domain::EncryptedValue,
    ports::{CredentialCodec, CredentialCodecError, CredentialCodecResult},
};
use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use std::fmt;

const NONCE_LENGTH: usize = 12;

/// Credential codec backed by AES-256-GCM.
#[derive(Clone)]
pub struct AesGcmCredentialCodec {
    cipher: Aes256Gcm,
}

impl AesGcmCredentialCodec {
    /// Creates a codec keyed from the configured secret.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialCodecError::InvalidKey`] when the secret is empty.
    pub fn new(secret: &SecretString) -> CredentialCodecResult<Self> {
        let material = secret.expose_secret();
        if material.is_empty() {
            return Err(CredentialCodecError::InvalidKey(
                "credential key must not be empty".to_owned(),
            ));
        }

        let key = Sha256::digest(material.as_bytes());
        let cipher = Aes256Gcm::new_from_slice(key.as_slice())
            .map_err(|err| CredentialCodecError::InvalidKey(err.to_string()))?;
        Ok(Self { cipher })
    }
}

impl fmt::Debug for AesGcmCredentialCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AesGcmCredentialCodec([REDACTED])")
    }
}

impl CredentialCodec for AesGcmCredentialCodec {
    fn encrypt(&self, plaintext: &str) -> CredentialCodecResult<EncryptedValue> {
        let mut nonce_bytes = [0_u8; NONCE_LENGTH];
        rand::rng().fill_bytes(&mut nonce_bytes);

        let sealed = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|_| CredentialCodecError::EncryptionFailed)?;

        let mut payload = Vec::with_capacity(NONCE_LENGTH + sealed.len());
        payload.extend_from_slice(&nonce_bytes);
        payload.extend_from_slice(&sealed);
        Ok(EncryptedValue::new(BASE64.encode(payload)))
    }

    fn decrypt(&self, ciphertext: &EncryptedValue) -> CredentialCodecResult<String> {
        let payload = BASE64
            .decode(ciphertext.as_str())
            .map_err(|err| CredentialCodecError::MalformedCiphertext(err.to_string()))?;

        if payload.len() < NONCE_LENGTH {
            return Err(CredentialCodecError::MalformedCiphertext(
                "payload is shorter than the nonce".to_owned(),
            ));
        }
        let (nonce_bytes, sealed) = payload.split_at(NONCE_LENGTH);

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), sealed)
            .map_err(|_| CredentialCodecError::DecryptionFailed)?;

        String::from_utf8(plaintext)
            .map_err(|err| CredentialCodecError::MalformedCiphertext(err.to_string()))
    }
}
