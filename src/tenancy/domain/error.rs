//! Error types for tenancy domain validation.

use thiserror::Error;

/// Mandatory credential fields of a tenant database record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialField {
    /// Database name.
    DatabaseName,
    /// Login role.
    Username,
    /// Login password.
    Password,
}

impl CredentialField {
    /// Returns the canonical field name used in diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DatabaseName => "database name",
            Self::Username => "username",
            Self::Password => "password",
        }
    }
}

impl std::fmt::Display for CredentialField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned while constructing tenancy domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TenancyDomainError {
    /// The tenant slug is empty after trimming.
    #[error("tenant slug must not be empty")]
    EmptyTenantSlug,

    /// The tenant slug contains characters outside `[a-z0-9_-]`.
    #[error(
        "tenant slug '{0}' contains invalid characters (only lowercase alphanumeric, hyphens and underscores allowed)"
    )]
    InvalidTenantSlug(String),

    /// The tenant slug exceeds the 100-character storage limit.
    #[error("tenant slug exceeds 100 character limit: {0}")]
    TenantSlugTooLong(String),

    /// The database host is empty after trimming.
    #[error("tenant database host must not be empty")]
    EmptyHost,

    /// The database port is outside `1..=65535`.
    #[error("tenant database port {0} is out of range")]
    InvalidPort(i32),

    /// A mandatory credential decrypted to an empty value.
    #[error("tenant database {0} must not be empty")]
    EmptyCredential(CredentialField),
}
