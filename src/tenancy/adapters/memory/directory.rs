//! In-memory tenant directory for registry and migration tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::tenancy::{
    domain::{
        CredentialSelection, TenantDatabaseEntry, TenantDatabaseId, TenantDatabaseRecord,
        TenantEntry, TenantSlug, TenantSummary,
    },
    ports::{TenantDirectory, TenantDirectoryError, TenantDirectoryResult},
};

/// Thread-safe in-memory tenant directory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTenantDirectory {
    state: Arc<RwLock<InMemoryDirectoryState>>,
}

#[derive(Debug, Default)]
struct InMemoryDirectoryState {
    tenants: HashMap<TenantSlug, TenantSummary>,
    databases: HashMap<TenantDatabaseId, TenantDatabaseRecord>,
    attachments: HashMap<TenantSlug, TenantDatabaseId>,
}

impl InMemoryTenantDirectory {
    /// Creates an empty in-memory directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a tenant together with its database record, replacing any
    /// tenant with the same slug.
    ///
    /// # Errors
    ///
    /// Returns [`TenantDirectoryError::Persistence`] when the state lock is
    /// poisoned.
    pub fn insert(
        &self,
        tenant: TenantSummary,
        database: Option<TenantDatabaseRecord>,
    ) -> TenantDirectoryResult<()> {
        let mut state = self.state.write().map_err(|err| {
            TenantDirectoryError::persistence(std::io::Error::other(err.to_string()))
        })?;

        let slug = tenant.slug().clone();
        if let Some(previous) = state.attachments.remove(&slug) {
            state.databases.remove(&previous);
        }
        if let Some(record) = database {
            state.attachments.insert(slug.clone(), record.id());
            state.databases.insert(record.id(), record);
        }
        state.tenants.insert(slug, tenant);
        Ok(())
    }

    /// Returns the stored record, credentials included.
    ///
    /// # Errors
    ///
    /// Returns [`TenantDirectoryError::Persistence`] when the state lock is
    /// poisoned.
    pub fn find_record(
        &self,
        id: TenantDatabaseId,
    ) -> TenantDirectoryResult<Option<TenantDatabaseRecord>> {
        let state = self.state.read().map_err(|err| {
            TenantDirectoryError::persistence(std::io::Error::other(err.to_string()))
        })?;
        Ok(state.databases.get(&id).cloned())
    }
}

fn select(record: &TenantDatabaseRecord, selection: CredentialSelection) -> TenantDatabaseRecord {
    if selection.includes_credentials() {
        record.clone()
    } else {
        record.without_credentials()
    }
}

#[async_trait]
impl TenantDirectory for InMemoryTenantDirectory {
    async fn find_by_slug(
        &self,
        slug: &TenantSlug,
        selection: CredentialSelection,
    ) -> TenantDirectoryResult<Option<TenantEntry>> {
        let state = self.state.read().map_err(|err| {
            TenantDirectoryError::persistence(std::io::Error::other(err.to_string()))
        })?;

        let Some(tenant) = state.tenants.get(slug) else {
            return Ok(None);
        };
        let database = state
            .attachments
            .get(slug)
            .and_then(|id| state.databases.get(id))
            .map(|record| select(record, selection));

        Ok(Some(TenantEntry {
            tenant: tenant.clone(),
            database,
        }))
    }

    async fn list_databases(
        &self,
        selection: CredentialSelection,
    ) -> TenantDirectoryResult<Vec<TenantDatabaseEntry>> {
        let state = self.state.read().map_err(|err| {
            TenantDirectoryError::persistence(std::io::Error::other(err.to_string()))
        })?;

        let mut entries: Vec<TenantDatabaseEntry> = state
            .attachments
            .iter()
            .filter_map(|(slug, id)| {
                state.databases.get(id).map(|record| TenantDatabaseEntry {
                    slug: slug.clone(),
                    record: select(record, selection),
                })
            })
            .collect();
        entries.sort_by(|left, right| left.slug.cmp(&right.slug));
        Ok(entries)
    }

    async fn mark_migrated(
        &self,
        id: TenantDatabaseId,
        migrated_at: DateTime<Utc>,
    ) -> TenantDirectoryResult<()> {
        let mut state = self.state.write().map_err(|err| {
            TenantDirectoryError::persistence(std::io::Error::other(err.to_string()))
        })?;

        let record = state
            .databases
            .get_mut(&id)
            .ok_or(TenantDirectoryError::NotFound(id))?;
        record.set_migrated_at(migrated_at);
        Ok(())
    }
}
