//! Domain model for tenant database routing.
//!
//! The tenancy domain models the control-plane view of tenants and their
//! encrypted database records, plus the decrypted connection settings that
//! exist only transiently while a connection is being opened. All
//! infrastructure concerns are kept outside the domain boundary.

mod error;
mod ids;
mod record;
mod selection;
mod settings;
mod slug;
mod tenant;

pub use error::{CredentialField, TenancyDomainError};
pub use ids::{TenantDatabaseId, TenantId};
pub use record::{
    EncryptedCredentials, EncryptedValue, PersistedTenantDatabaseData, TenantDatabaseRecord,
};
pub use selection::CredentialSelection;
pub use settings::{CaCertificate, ConnectionSettings, PlainCredentials};
pub use slug::TenantSlug;
pub use tenant::{TenantDatabaseEntry, TenantEntry, TenantSummary};
