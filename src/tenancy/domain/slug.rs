//! Validated tenant slug type.

use super::TenancyDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length for a tenant slug, matching the `VARCHAR(100)` column.
const MAX_SLUG_LENGTH: usize = 100;

/// Validated tenant slug.
///
/// The slug is the key used both by the control-plane directory and by the
/// connection registry, so every lookup for one tenant lands on the same
/// cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantSlug(String);

impl TenantSlug {
    /// Creates a validated tenant slug.
    ///
    /// The input is trimmed and lowercased. Only characters in `[a-z0-9_-]`
    /// are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`TenancyDomainError::EmptyTenantSlug`] when the value is empty
    /// after trimming, [`TenancyDomainError::InvalidTenantSlug`] when it
    /// contains characters outside `[a-z0-9_-]`, or
    /// [`TenancyDomainError::TenantSlugTooLong`] when it exceeds 100
    /// characters.
    pub fn new(value: impl Into<String>) -> Result<Self, TenancyDomainError> {
        let raw = value.into();
        let normalized = raw.trim().to_ascii_lowercase();

        if normalized.is_empty() {
            return Err(TenancyDomainError::EmptyTenantSlug);
        }

        if normalized.len() > MAX_SLUG_LENGTH {
            return Err(TenancyDomainError::TenantSlugTooLong(raw));
        }

        let is_valid = normalized
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');

        if !is_valid {
            return Err(TenancyDomainError::InvalidTenantSlug(raw));
        }

        Ok(Self(normalized))
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TenantSlug {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for TenantSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
