//! Port contracts for tenant database routing.
//!
//! Ports define infrastructure-agnostic interfaces used by the connection
//! registry and the migration service.

pub mod codec;
pub mod directory;
pub mod driver;

pub use codec::{CredentialCodec, CredentialCodecError, CredentialCodecResult};
pub use directory::{TenantDirectory, TenantDirectoryError, TenantDirectoryResult};
pub use driver::{DriverError, DriverResult, TenantConnection, TenantDatabaseDriver};
