//! Adapter implementations for tenant routing ports.

mod crypto;
pub mod memory;
pub mod postgres;

pub use crypto::AesGcmCredentialCodec;
