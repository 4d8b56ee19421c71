//! Tenant schema migration orchestration.
//!
//! [`TenantMigrationService`] migrates tenant databases one at a time over
//! dedicated connections that never enter the registry cache. The bulk run
//! used at startup isolates failures per tenant and always finishes by
//! closing every cached registry connection.

use super::{
    factory::{ConnectionError, ConnectionFactory},
    registry::TenantConnectionRegistry,
};
use crate::tenancy::{
    domain::{CredentialSelection, TenantDatabaseId, TenantDatabaseRecord, TenantSlug},
    ports::{
        CredentialCodec, DriverError, TenantConnection, TenantDatabaseDriver, TenantDirectory,
        TenantDirectoryError,
    },
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// Errors surfaced to administrative callers.
///
/// Internal failure detail is logged, never returned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TenantAdminError {
    /// No tenant has the requested slug.
    #[error("Tenant not found")]
    TenantNotFound(TenantSlug),
    /// The tenant has no database attached.
    #[error("Tenant database not found")]
    DatabaseNotConfigured(TenantSlug),
    /// The tenant database refused the connection.
    #[error("Invalid database connection")]
    InvalidConnection,
    /// The migration run failed.
    #[error("Migration run failed")]
    MigrationFailed,
    /// The control plane could not be queried.
    #[error("Tenant directory unavailable")]
    DirectoryUnavailable,
}

/// Detailed failure of one tenant's migration run.
#[derive(Debug, Clone, Error)]
pub enum TenantMigrationError {
    /// The dedicated connection could not be opened.
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    /// A migration step failed.
    #[error(transparent)]
    Migration(#[from] DriverError),
    /// Recording the migration timestamp failed.
    #[error(transparent)]
    Directory(#[from] TenantDirectoryError),
}

impl TenantMigrationError {
    fn to_admin_error(&self) -> TenantAdminError {
        match self {
            Self::Connection(err) if err.is_handshake() => TenantAdminError::InvalidConnection,
            Self::Connection(_) | Self::Migration(_) | Self::Directory(_) => {
                TenantAdminError::MigrationFailed
            }
        }
    }
}

/// Result of a successful single-tenant migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantMigrationSummary {
    /// Migrated tenant.
    pub slug: TenantSlug,
    /// Migrated database record.
    pub database_id: TenantDatabaseId,
    /// Versions applied by this run, oldest first.
    pub applied_versions: Vec<String>,
    /// Time recorded on the database record.
    pub migrated_at: DateTime<Utc>,
}

/// Outcome for one tenant in a bulk migration run.
#[derive(Debug, Clone)]
pub struct TenantMigrationOutcome {
    /// Tenant that was processed.
    pub slug: TenantSlug,
    /// Database record that was processed.
    pub database_id: TenantDatabaseId,
    /// Summary on success, detailed failure otherwise.
    pub result: Result<TenantMigrationSummary, TenantMigrationError>,
}

/// Per-tenant outcomes of a bulk migration run, in processing order.
#[derive(Debug, Clone, Default)]
pub struct MigrationReport {
    /// Outcome per tenant.
    pub outcomes: Vec<TenantMigrationOutcome>,
}

impl MigrationReport {
    /// Returns how many tenants migrated successfully.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.result.is_ok()).count()
    }

    /// Returns how many tenants failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Returns the slugs of tenants that failed.
    #[must_use]
    pub fn failed_slugs(&self) -> Vec<&TenantSlug> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.result.is_err())
            .map(|outcome| &outcome.slug)
            .collect()
    }
}

/// Tenant migration and connection-test orchestration service.
pub struct TenantMigrationService<R, K, D, C>
where
    R: TenantDirectory,
    K: CredentialCodec,
    D: TenantDatabaseDriver,
    C: Clock + Send + Sync,
{
    directory: Arc<R>,
    factory: ConnectionFactory<K, D>,
    registry: Arc<TenantConnectionRegistry<R, K, D>>,
    clock: Arc<C>,
}

impl<R, K, D, C> TenantMigrationService<R, K, D, C>
where
    R: TenantDirectory,
    K: CredentialCodec,
    D: TenantDatabaseDriver,
    C: Clock + Send + Sync,
{
    /// Creates a migration service.
    #[must_use]
    pub const fn new(
        directory: Arc<R>,
        factory: ConnectionFactory<K, D>,
        registry: Arc<TenantConnectionRegistry<R, K, D>>,
        clock: Arc<C>,
    ) -> Self {
        Self {
            directory,
            factory,
            registry,
            clock,
        }
    }

    /// Applies pending migrations to one tenant's database.
    ///
    /// # Errors
    ///
    /// Returns [`TenantAdminError::TenantNotFound`] or
    /// [`TenantAdminError::DatabaseNotConfigured`] for unknown tenants,
    /// [`TenantAdminError::InvalidConnection`] when the handshake fails, and
    /// [`TenantAdminError::MigrationFailed`] for any other failure.
    pub async fn migrate_tenant(
        &self,
        slug: &TenantSlug,
    ) -> Result<TenantMigrationSummary, TenantAdminError> {
        let record = self.resolve(slug).await.map_err(|err| match err {
            TenantAdminError::DirectoryUnavailable => TenantAdminError::MigrationFailed,
            other => other,
        })?;

        self.migrate_record(slug, &record).await.map_err(|err| {
            error!(tenant = %slug, error = %err, "tenant migration failed");
            err.to_admin_error()
        })
    }

    /// Verifies that a tenant's database accepts a connection.
    ///
    /// Opens a dedicated connection, closes it, and touches nothing else.
    ///
    /// # Errors
    ///
    /// Returns [`TenantAdminError::TenantNotFound`] or
    /// [`TenantAdminError::DatabaseNotConfigured`] for unknown tenants,
    /// [`TenantAdminError::DirectoryUnavailable`] when the lookup fails, and
    /// [`TenantAdminError::InvalidConnection`] when the connection cannot be
    /// opened.
    pub async fn test_connection(&self, slug: &TenantSlug) -> Result<(), TenantAdminError> {
        let record = self.resolve(slug).await?;

        let connection = self.factory.create_connection(&record).await.map_err(|err| {
            warn!(tenant = %slug, error = %err, "invalid tenant connection");
            TenantAdminError::InvalidConnection
        })?;
        connection.close().await;
        info!(tenant = %slug, "tenant connection verified");
        Ok(())
    }

    /// Migrates every tenant database in directory order.
    ///
    /// Failures are logged and recorded per tenant without stopping the run.
    /// When the directory cannot be listed the report is empty. Cached
    /// registry connections are closed once the run ends.
    pub async fn migrate_all_tenants(&self) -> MigrationReport {
        info!("starting tenant migrations");
        let entries = match self.directory.list_databases(CredentialSelection::Include).await {
            Ok(entries) => entries,
            Err(err) => {
                error!(error = %err, "could not list tenant databases; skipping tenant migrations");
                Vec::new()
            }
        };

        let mut report = MigrationReport {
            outcomes: Vec::with_capacity(entries.len()),
        };
        for entry in entries {
            let result = self.migrate_record(&entry.slug, &entry.record).await;
            if let Err(err) = &result {
                error!(
                    tenant = %entry.slug,
                    error = %err,
                    "tenant migration failed; continuing with the next tenant"
                );
            }
            report.outcomes.push(TenantMigrationOutcome {
                database_id: entry.record.id(),
                slug: entry.slug,
                result,
            });
        }

        let closed = self.registry.close_all_connections().await;
        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            closed,
            "finished tenant migrations"
        );
        report
    }

    async fn resolve(&self, slug: &TenantSlug) -> Result<TenantDatabaseRecord, TenantAdminError> {
        let entry = self
            .directory
            .find_by_slug(slug, CredentialSelection::Include)
            .await
            .map_err(|err| {
                error!(tenant = %slug, error = %err, "tenant directory lookup failed");
                TenantAdminError::DirectoryUnavailable
            })?
            .ok_or_else(|| TenantAdminError::TenantNotFound(slug.clone()))?;

        entry
            .database
            .ok_or_else(|| TenantAdminError::DatabaseNotConfigured(slug.clone()))
    }

    async fn migrate_record(
        &self,
        slug: &TenantSlug,
        record: &TenantDatabaseRecord,
    ) -> Result<TenantMigrationSummary, TenantMigrationError> {
        info!(tenant = %slug, "verifying tenant connection");
        let connection = self.factory.create_connection(record).await.inspect_err(|err| {
            if err.is_handshake() {
                warn!(tenant = %slug, "invalid tenant connection");
            }
        })?;

        info!(tenant = %slug, "migrating tenant");
        let outcome = connection.run_pending_migrations().await;
        connection.close().await;
        let applied_versions = outcome?;

        let migrated_at = self.clock.utc();
        self.directory.mark_migrated(record.id(), migrated_at).await?;
        info!(
            tenant = %slug,
            applied = applied_versions.len(),
            "tenant migration finished"
        );

        Ok(TenantMigrationSummary {
            slug: slug.clone(),
            database_id: record.id(),
            applied_versions,
            migrated_at,
        })
    }
}
