//! Tenant summaries and directory entries.

use super::{TenantDatabaseRecord, TenantId, TenantSlug};

/// Control-plane view of a tenant, without any database details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantSummary {
    id: TenantId,
    slug: TenantSlug,
    name: String,
    enabled: bool,
}

impl TenantSummary {
    /// Creates a tenant summary.
    #[must_use]
    pub fn new(id: TenantId, slug: TenantSlug, name: impl Into<String>, enabled: bool) -> Self {
        Self {
            id,
            slug,
            name: name.into(),
            enabled,
        }
    }

    /// Returns the tenant identifier.
    #[must_use]
    pub const fn id(&self) -> TenantId {
        self.id
    }

    /// Returns the tenant slug.
    #[must_use]
    pub const fn slug(&self) -> &TenantSlug {
        &self.slug
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns whether the tenant accepts traffic.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// A tenant together with its attached database record, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantEntry {
    /// Tenant summary.
    pub tenant: TenantSummary,
    /// Attached database record; `None` when no database is configured.
    pub database: Option<TenantDatabaseRecord>,
}

/// One row of the bulk database listing used by startup migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantDatabaseEntry {
    /// Slug of the owning tenant.
    pub slug: TenantSlug,
    /// The database record.
    pub record: TenantDatabaseRecord,
}
