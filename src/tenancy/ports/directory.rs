//! Directory port for resolving tenants to their database records.

use crate::tenancy::domain::{
    CredentialSelection, TenantDatabaseEntry, TenantDatabaseId, TenantEntry, TenantSlug,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for tenant directory operations.
pub type TenantDirectoryResult<T> = Result<T, TenantDirectoryError>;

/// Control-plane lookup contract for tenants and their database records.
///
/// Credential columns are returned still encrypted, and only when the caller
/// passes [`CredentialSelection::Include`].
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// Finds a tenant and its attached database record by slug.
    ///
    /// Returns `None` when no tenant has the given slug. A tenant without a
    /// database is returned with `database: None`.
    async fn find_by_slug(
        &self,
        slug: &TenantSlug,
        selection: CredentialSelection,
    ) -> TenantDirectoryResult<Option<TenantEntry>>;

    /// Lists every tenant database record, regardless of tenant status.
    async fn list_databases(
        &self,
        selection: CredentialSelection,
    ) -> TenantDirectoryResult<Vec<TenantDatabaseEntry>>;

    /// Records a successful migration run for a database record.
    ///
    /// # Errors
    ///
    /// Returns [`TenantDirectoryError::NotFound`] when the record does not
    /// exist.
    async fn mark_migrated(
        &self,
        id: TenantDatabaseId,
        migrated_at: DateTime<Utc>,
    ) -> TenantDirectoryResult<()>;
}

/// Errors returned by tenant directory implementations.
#[derive(Debug, Clone, Error)]
pub enum TenantDirectoryError {
    /// The database record was not found.
    #[error("tenant database record not found: {0}")]
    NotFound(TenantDatabaseId),

    /// Persisted data could not be reconstructed into domain types.
    #[error("invalid persisted data: {0}")]
    InvalidPersistedData(Arc<dyn std::error::Error + Send + Sync>),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TenantDirectoryError {
    /// Wraps a data-quality or deserialization error from persisted rows.
    pub fn invalid_persisted_data(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::InvalidPersistedData(Arc::new(err))
    }

    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
