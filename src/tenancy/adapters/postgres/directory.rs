//! `PostgreSQL` tenant directory over the control-plane tables.

use super::{
    models::{DatabaseCredentialRow, DatabaseLocationRow, TenantRow},
    schema::{tenant_databases, tenants},
};
use crate::tenancy::{
    domain::{
        CredentialSelection, EncryptedCredentials, EncryptedValue, PersistedTenantDatabaseData,
        TenantDatabaseEntry, TenantDatabaseId, TenantDatabaseRecord, TenantEntry, TenantId,
        TenantSlug, TenantSummary,
    },
    ports::{TenantDirectory, TenantDirectoryError, TenantDirectoryResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{info, warn};

/// `PostgreSQL` connection pool type used for the control plane.
pub type ControlPlanePool = Pool<ConnectionManager<PgConnection>>;

/// Control-plane schema migrations compiled into the crate.
pub const CONTROL_PLANE_MIGRATIONS: EmbeddedMigrations =
    embed_migrations!("migrations/control_plane");

/// Applies pending control-plane migrations over `connection`.
///
/// Returns the versions applied by this call, oldest first.
///
/// # Errors
///
/// Returns [`TenantDirectoryError::Persistence`] when a migration fails.
pub fn run_control_plane_migrations(
    connection: &mut PgConnection,
) -> TenantDirectoryResult<Vec<String>> {
    let applied = connection
        .run_pending_migrations(CONTROL_PLANE_MIGRATIONS)
        .map_err(|err| TenantDirectoryError::persistence(std::io::Error::other(err)))?;
    Ok(applied.iter().map(ToString::to_string).collect())
}

/// `PostgreSQL`-backed tenant directory.
#[derive(Debug, Clone)]
pub struct PostgresTenantDirectory {
    pool: ControlPlanePool,
}

impl PostgresTenantDirectory {
    /// Creates a directory from a control-plane connection pool.
    #[must_use]
    pub const fn new(pool: ControlPlanePool) -> Self {
        Self { pool }
    }

    /// Brings the control-plane schema up to date.
    ///
    /// # Errors
    ///
    /// Returns [`TenantDirectoryError::Persistence`] when the pool is
    /// unavailable or a migration fails.
    pub async fn apply_control_plane_migrations(&self) -> TenantDirectoryResult<Vec<String>> {
        let applied = self.run_blocking(run_control_plane_migrations).await?;
        info!(applied = applied.len(), "control-plane schema up to date");
        Ok(applied)
    }

    async fn run_blocking<F, T>(&self, f: F) -> TenantDirectoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> TenantDirectoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(TenantDirectoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(TenantDirectoryError::persistence)?
    }
}

#[async_trait]
impl TenantDirectory for PostgresTenantDirectory {
    async fn find_by_slug(
        &self,
        slug: &TenantSlug,
        selection: CredentialSelection,
    ) -> TenantDirectoryResult<Option<TenantEntry>> {
        let slug_value = slug.as_str().to_owned();

        self.run_blocking(move |connection| {
            let row = tenants::table
                .filter(tenants::slug.eq(&slug_value))
                .select(TenantRow::as_select())
                .first::<TenantRow>(connection)
                .optional()
                .map_err(TenantDirectoryError::persistence)?;

            let Some(tenant_row) = row else {
                return Ok(None);
            };
            let database = match tenant_row.tenant_database_id {
                Some(database_id) => load_record(connection, database_id, selection)?,
                None => None,
            };

            Ok(Some(TenantEntry {
                tenant: row_to_summary(tenant_row)?,
                database,
            }))
        })
        .await
    }

    async fn list_databases(
        &self,
        selection: CredentialSelection,
    ) -> TenantDirectoryResult<Vec<TenantDatabaseEntry>> {
        self.run_blocking(move |connection| {
            if selection.includes_credentials() {
                let rows = tenants::table
                    .inner_join(tenant_databases::table)
                    .select((tenants::slug, DatabaseCredentialRow::as_select()))
                    .order(tenants::slug.asc())
                    .load::<(String, DatabaseCredentialRow)>(connection)
                    .map_err(TenantDirectoryError::persistence)?;
                Ok(valid_entries(
                    rows.into_iter()
                        .map(|(slug, row)| (slug, credential_row_to_record(row))),
                ))
            } else {
                let rows = tenants::table
                    .inner_join(tenant_databases::table)
                    .select((tenants::slug, DatabaseLocationRow::as_select()))
                    .order(tenants::slug.asc())
                    .load::<(String, DatabaseLocationRow)>(connection)
                    .map_err(TenantDirectoryError::persistence)?;
                Ok(valid_entries(
                    rows.into_iter()
                        .map(|(slug, row)| (slug, location_row_to_record(row))),
                ))
            }
        })
        .await
    }

    async fn mark_migrated(
        &self,
        id: TenantDatabaseId,
        migrated_at: DateTime<Utc>,
    ) -> TenantDirectoryResult<()> {
        self.run_blocking(move |connection| {
            let updated_count = diesel::update(tenant_databases::table.find(id.into_inner()))
                .set((
                    tenant_databases::migrated_at.eq(Some(migrated_at)),
                    tenant_databases::updated_at.eq(migrated_at),
                ))
                .execute(connection)
                .map_err(TenantDirectoryError::persistence)?;

            if updated_count == 0 {
                return Err(TenantDirectoryError::NotFound(id));
            }
            Ok(())
        })
        .await
    }
}

fn load_record(
    connection: &mut PgConnection,
    database_id: uuid::Uuid,
    selection: CredentialSelection,
) -> TenantDirectoryResult<Option<TenantDatabaseRecord>> {
    let query = tenant_databases::table.find(database_id);
    if selection.includes_credentials() {
        let row = query
            .select(DatabaseCredentialRow::as_select())
            .first::<DatabaseCredentialRow>(connection)
            .optional()
            .map_err(TenantDirectoryError::persistence)?;
        Ok(row.map(credential_row_to_record))
    } else {
        let row = query
            .select(DatabaseLocationRow::as_select())
            .first::<DatabaseLocationRow>(connection)
            .optional()
            .map_err(TenantDirectoryError::persistence)?;
        Ok(row.map(location_row_to_record))
    }
}

fn row_to_summary(row: TenantRow) -> TenantDirectoryResult<TenantSummary> {
    let slug = TenantSlug::new(row.slug).map_err(TenantDirectoryError::invalid_persisted_data)?;
    Ok(TenantSummary::new(
        TenantId::from_uuid(row.id),
        slug,
        row.name,
        row.is_enabled,
    ))
}

/// Keeps the rows whose slug is still routable.
///
/// A row written around the slug constraint is logged and skipped so the
/// remaining tenants can still be listed.
fn valid_entries<I>(rows: I) -> Vec<TenantDatabaseEntry>
where
    I: IntoIterator<Item = (String, TenantDatabaseRecord)>,
{
    rows.into_iter()
        .filter_map(|(raw_slug, record)| {
            let database_id = record.id();
            match TenantSlug::new(raw_slug.as_str()) {
                Ok(slug) => Some(TenantDatabaseEntry { slug, record }),
                Err(err) => {
                    warn!(
                        slug = %raw_slug,
                        %database_id,
                        error = %err,
                        "skipping tenant database with an invalid slug"
                    );
                    None
                }
            }
        })
        .collect()
}

fn credential_row_to_record(row: DatabaseCredentialRow) -> TenantDatabaseRecord {
    TenantDatabaseRecord::from_persisted(PersistedTenantDatabaseData {
        id: TenantDatabaseId::from_uuid(row.id),
        host: row.host,
        port: row.port,
        credentials: Some(EncryptedCredentials {
            database_name: EncryptedValue::new(row.database),
            username: EncryptedValue::new(row.username),
            password: EncryptedValue::new(row.password),
            certificate: row.certificate.map(EncryptedValue::new),
        }),
        migrated_at: row.migrated_at,
    })
}

fn location_row_to_record(row: DatabaseLocationRow) -> TenantDatabaseRecord {
    TenantDatabaseRecord::from_persisted(PersistedTenantDatabaseData {
        id: TenantDatabaseId::from_uuid(row.id),
        host: row.host,
        port: row.port,
        credentials: None,
        migrated_at: row.migrated_at,
    })
}
