//! Composition root for tenant routing.
//!
//! [`TenancyRuntime`] owns the single connection registry of the process and
//! the migration service built around it. Startup migrates every tenant
//! database before traffic is served; [`TenancyRuntime::shutdown`] is the
//! hook that releases every cached connection.

use crate::config::TenancyConfig;
use crate::tenancy::{
    adapters::{
        AesGcmCredentialCodec,
        postgres::{
            ControlPlanePool, PostgresDriverOptions, PostgresTenantDirectory, PostgresTenantDriver,
        },
    },
    ports::{CredentialCodec, CredentialCodecError, TenantDatabaseDriver, TenantDirectory},
    services::{
        ConnectionFactory, MigrationReport, TenantConnectionRegistry, TenantMigrationService,
    },
};
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use mockable::{Clock, DefaultClock};
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Errors raised while wiring the runtime.
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    /// The credential key was rejected.
    #[error(transparent)]
    Codec(#[from] CredentialCodecError),
    /// The control-plane pool could not be built.
    #[error("control plane unavailable: {0}")]
    ControlPlane(Arc<dyn std::error::Error + Send + Sync>),
}

impl RuntimeError {
    /// Wraps a control-plane failure.
    pub fn control_plane(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::ControlPlane(Arc::new(err))
    }
}

/// Registry and migration service wired over shared adapters.
pub struct TenancyRuntime<R, K, D, C>
where
    R: TenantDirectory,
    K: CredentialCodec,
    D: TenantDatabaseDriver,
    C: Clock + Send + Sync,
{
    directory: Arc<R>,
    registry: Arc<TenantConnectionRegistry<R, K, D>>,
    migrations: TenantMigrationService<R, K, D, C>,
}

/// Runtime over the `PostgreSQL` adapters.
pub type PostgresTenancyRuntime = TenancyRuntime<
    PostgresTenantDirectory,
    AesGcmCredentialCodec,
    PostgresTenantDriver,
    DefaultClock,
>;

impl<R, K, D, C> TenancyRuntime<R, K, D, C>
where
    R: TenantDirectory,
    K: CredentialCodec,
    D: TenantDatabaseDriver,
    C: Clock + Send + Sync,
{
    /// Wires a runtime from already-built adapters.
    #[must_use]
    pub fn from_parts(
        directory: Arc<R>,
        codec: Arc<K>,
        driver: Arc<D>,
        clock: Arc<C>,
        idle_timeout: Duration,
    ) -> Self {
        let factory = ConnectionFactory::new(codec, driver);
        let registry = Arc::new(TenantConnectionRegistry::new(
            Arc::clone(&directory),
            factory.clone(),
            idle_timeout,
        ));
        let migrations = TenantMigrationService::new(
            Arc::clone(&directory),
            factory,
            Arc::clone(&registry),
            clock,
        );
        Self {
            directory,
            registry,
            migrations,
        }
    }

    /// Migrates every tenant database and returns the per-tenant outcomes.
    ///
    /// Call this before serving tenant traffic.
    pub async fn start(&self) -> MigrationReport {
        self.migrations.migrate_all_tenants().await
    }

    /// Returns the tenant directory the runtime routes through.
    #[must_use]
    pub const fn directory(&self) -> &Arc<R> {
        &self.directory
    }

    /// Returns the process-wide connection registry.
    #[must_use]
    pub const fn registry(&self) -> &Arc<TenantConnectionRegistry<R, K, D>> {
        &self.registry
    }

    /// Returns the migration service.
    #[must_use]
    pub const fn migrations(&self) -> &TenantMigrationService<R, K, D, C> {
        &self.migrations
    }

    /// Closes every cached tenant connection.
    pub async fn shutdown(&self) -> usize {
        let closed = self.registry.close_all_connections().await;
        info!(closed, "tenancy runtime shut down");
        closed
    }
}

impl PostgresTenancyRuntime {
    /// Connects to the control plane and wires the `PostgreSQL` adapters.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] when the credential key is unusable or the
    /// control plane cannot be reached.
    pub async fn connect(config: &TenancyConfig) -> Result<Self, RuntimeError> {
        let codec = AesGcmCredentialCodec::new(config.credential_key())?;

        let url = config.control_plane_url().expose_secret().to_owned();
        let connect_timeout = config.connect_timeout();
        let pool: ControlPlanePool = tokio::task::spawn_blocking(move || {
            Pool::builder()
                .connection_timeout(connect_timeout)
                .build(ConnectionManager::<PgConnection>::new(url))
        })
        .await
        .map_err(RuntimeError::control_plane)?
        .map_err(RuntimeError::control_plane)?;

        let driver = PostgresTenantDriver::new(PostgresDriverOptions {
            schema: config.schema().to_owned(),
            migrations_dir: config.tenant_migrations_dir().to_owned(),
            certificate_dir: config.certificate_dir().to_owned(),
            connect_timeout,
            pool_max_size: config.pool_max_size(),
        });

        info!(
            schema = config.schema(),
            idle_timeout_secs = config.idle_timeout().as_secs(),
            "connected to tenancy control plane"
        );
        Ok(Self::from_parts(
            Arc::new(PostgresTenantDirectory::new(pool)),
            Arc::new(codec),
            Arc::new(driver),
            Arc::new(DefaultClock),
            config.idle_timeout(),
        ))
    }
}
