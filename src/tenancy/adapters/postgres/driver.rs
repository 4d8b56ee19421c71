//! `PostgreSQL` driver that opens one small pool per tenant database.

use super::conninfo::{TlsMode, render_conninfo};
use crate::tenancy::{
    domain::{CaCertificate, ConnectionSettings},
    ports::{DriverError, DriverResult, TenantConnection, TenantDatabaseDriver},
};
use async_trait::async_trait;
use cap_std::{ambient_authority, fs_utf8::Dir};
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel_migrations::{FileBasedMigrations, MigrationHarness};
use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};
use std::fmt::{self, Write as _};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

/// Connection pool type used for a single tenant database.
pub type TenantPgPool = Pool<ConnectionManager<PgConnection>>;

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Options shared by every tenant connection opened by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresDriverOptions {
    /// Schema placed on the search path of every tenant session.
    pub schema: String,
    /// Directory holding the tenant migration scripts.
    pub migrations_dir: String,
    /// Directory where CA material is written for libpq.
    pub certificate_dir: String,
    /// Handshake timeout.
    pub connect_timeout: Duration,
    /// Maximum pooled sessions per tenant database.
    pub pool_max_size: u32,
}

/// Tenant database driver backed by Diesel and r2d2.
#[derive(Debug, Clone)]
pub struct PostgresTenantDriver {
    options: Arc<PostgresDriverOptions>,
}

impl PostgresTenantDriver {
    /// Creates a driver with the given options.
    #[must_use]
    pub fn new(options: PostgresDriverOptions) -> Self {
        Self {
            options: Arc::new(options),
        }
    }
}

#[async_trait]
impl TenantDatabaseDriver for PostgresTenantDriver {
    type Connection = PgTenantConnection;

    async fn open(&self, settings: ConnectionSettings) -> DriverResult<Self::Connection> {
        let options = Arc::clone(&self.options);

        let pool = tokio::task::spawn_blocking(move || build_pool(&settings, &options))
            .await
            .map_err(DriverError::io)??;

        Ok(PgTenantConnection {
            id: NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed),
            pool: Arc::new(RwLock::new(Some(pool))),
            migrations_dir: Arc::from(self.options.migrations_dir.as_str()),
        })
    }
}

fn build_pool(
    settings: &ConnectionSettings,
    options: &PostgresDriverOptions,
) -> DriverResult<TenantPgPool> {
    let root_cert = settings
        .certificate()
        .map(|certificate| write_certificate(&options.certificate_dir, certificate))
        .transpose()?;
    let tls = root_cert
        .as_deref()
        .map_or(TlsMode::Disabled, TlsMode::VerifyCa);

    let conninfo = render_conninfo(settings, tls, &options.schema, options.connect_timeout);
    let manager = ConnectionManager::<PgConnection>::new(conninfo.expose_secret());

    // `build` waits for `min_idle` sessions, so it fails on a bad handshake.
    Pool::builder()
        .max_size(options.pool_max_size.max(1))
        .min_idle(Some(1))
        .connection_timeout(options.connect_timeout)
        .test_on_check_out(true)
        .build(manager)
        .map_err(DriverError::handshake)
}

fn write_certificate(certificate_dir: &str, certificate: &CaCertificate) -> DriverResult<String> {
    let pem = certificate.expose_pem();
    let digest = Sha256::digest(pem.as_bytes());
    let mut file_name = String::from("ca-");
    for byte in digest.iter().take(8) {
        write!(file_name, "{byte:02x}").map_err(|err| DriverError::io(std::io::Error::other(err)))?;
    }
    file_name.push_str(".pem");

    Dir::create_ambient_dir_all(certificate_dir, ambient_authority()).map_err(DriverError::io)?;
    let dir = Dir::open_ambient_dir(certificate_dir, ambient_authority()).map_err(DriverError::io)?;
    dir.write(&file_name, pem).map_err(DriverError::io)?;

    Ok(format!("{}/{file_name}", certificate_dir.trim_end_matches('/')))
}

/// Live handle to one tenant database.
///
/// Clones share one pool; closing any clone closes them all.
#[derive(Clone)]
pub struct PgTenantConnection {
    id: u64,
    pool: Arc<RwLock<Option<TenantPgPool>>>,
    migrations_dir: Arc<str>,
}

impl PgTenantConnection {
    /// Returns the underlying pool for running tenant queries.
    ///
    /// Returns `None` once the handle has been closed.
    #[must_use]
    pub fn pool(&self) -> Option<TenantPgPool> {
        self.pool
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl fmt::Debug for PgTenantConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgTenantConnection")
            .field("id", &self.id)
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TenantConnection for PgTenantConnection {
    fn handle_id(&self) -> u64 {
        self.id
    }

    fn is_open(&self) -> bool {
        self.pool
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|pool| pool.state().connections > 0)
    }

    async fn run_pending_migrations(&self) -> DriverResult<Vec<String>> {
        let Some(pool) = self.pool() else {
            return Err(DriverError::io(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "tenant connection is closed",
            )));
        };
        let migrations_dir = Arc::clone(&self.migrations_dir);

        tokio::task::spawn_blocking(move || {
            let mut pooled = pool.get().map_err(DriverError::io)?;
            let connection: &mut PgConnection = &mut pooled;
            let source =
                FileBasedMigrations::from_path(&*migrations_dir).map_err(DriverError::migration)?;
            let applied = connection
                .run_pending_migrations(source)
                .map_err(|err| DriverError::migration(std::io::Error::other(err)))?;
            Ok(applied.iter().map(ToString::to_string).collect())
        })
        .await
        .map_err(DriverError::io)?
    }

    async fn close(&self) {
        let pool = self.pool.write().unwrap_or_else(PoisonError::into_inner).take();
        // Sessions disconnect once the last pool clone is dropped.
        drop(pool);
    }
}
