//! In-memory tenant database driver with scripted failures.
//!
//! Connections are plain flags shared between clones, so tests can observe
//! how many handles were opened, how many are still live, and which
//! migration versions each database has received.

use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};
use std::time::Duration;

use crate::tenancy::{
    domain::ConnectionSettings,
    ports::{DriverError, DriverResult, TenantConnection, TenantDatabaseDriver},
};

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Failure the driver should produce for a scripted host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    /// `open` fails with [`DriverError::Handshake`].
    Handshake,
    /// `open` fails with [`DriverError::Io`].
    Io,
    /// `open` succeeds but every migration run fails.
    Migration,
}

/// Settings observed by the driver when a connection was opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedDatabase {
    /// Host that was dialled.
    pub host: String,
    /// Port that was dialled.
    pub port: u16,
    /// Decrypted database name.
    pub database_name: String,
    /// Decrypted login role.
    pub username: String,
    /// Whether CA material was supplied.
    pub uses_tls: bool,
}

#[derive(Debug, Default)]
struct DriverState {
    failures: HashMap<String, InjectedFailure>,
    migrations: Vec<String>,
    applied: HashMap<String, Vec<String>>,
    opened: Vec<OpenedDatabase>,
    migration_runs: usize,
}

/// Tenant database driver that never touches the network.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTenantDriver {
    state: Arc<RwLock<DriverState>>,
    live: Arc<AtomicUsize>,
    open_delay: Duration,
}

impl InMemoryTenantDriver {
    /// Creates a driver that opens every connection immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every `open` call wait before completing.
    #[must_use]
    pub const fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }

    /// Sets the migration versions every tenant database should receive.
    pub fn set_migrations<I, S>(&self, versions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state().migrations = versions.into_iter().map(Into::into).collect();
    }

    /// Scripts a failure for every connection to `host`.
    pub fn fail_host(&self, host: impl Into<String>, failure: InjectedFailure) {
        self.state().failures.insert(host.into(), failure);
    }

    /// Removes a scripted failure for `host`.
    pub fn heal_host(&self, host: &str) {
        self.state().failures.remove(host);
    }

    /// Returns how many connections were opened successfully.
    #[must_use]
    pub fn opened_count(&self) -> usize {
        self.state().opened.len()
    }

    /// Returns the settings of every successfully opened connection.
    #[must_use]
    pub fn opened(&self) -> Vec<OpenedDatabase> {
        self.state().opened.clone()
    }

    /// Returns how many opened connections have not been closed.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Returns how many migration runs were attempted.
    #[must_use]
    pub fn migration_runs(&self) -> usize {
        self.state().migration_runs
    }

    /// Returns the versions applied to the database at `host`.
    #[must_use]
    pub fn applied_versions(&self, host: &str) -> Vec<String> {
        self.state().applied.get(host).cloned().unwrap_or_default()
    }

    fn state(&self) -> RwLockWriteGuard<'_, DriverState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl TenantDatabaseDriver for InMemoryTenantDriver {
    type Connection = InMemoryTenantConnection;

    async fn open(&self, settings: ConnectionSettings) -> DriverResult<Self::Connection> {
        if !self.open_delay.is_zero() {
            tokio::time::sleep(self.open_delay).await;
        }

        let failure = self.state().failures.get(settings.host()).copied();
        match failure {
            Some(InjectedFailure::Handshake) => {
                return Err(DriverError::handshake(std::io::Error::new(
                    ErrorKind::ConnectionRefused,
                    format!("connection to {} refused", settings.host()),
                )));
            }
            Some(InjectedFailure::Io) => {
                return Err(DriverError::io(std::io::Error::other(
                    "certificate directory is not writable",
                )));
            }
            Some(InjectedFailure::Migration) | None => {}
        }

        self.state().opened.push(OpenedDatabase {
            host: settings.host().to_owned(),
            port: settings.port(),
            database_name: settings.database_name().to_owned(),
            username: settings.username().to_owned(),
            uses_tls: settings.certificate().is_some(),
        });
        self.live.fetch_add(1, Ordering::SeqCst);

        Ok(InMemoryTenantConnection {
            id: NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed),
            host: settings.host().to_owned(),
            open: Arc::new(AtomicBool::new(true)),
            fail_migrations: failure == Some(InjectedFailure::Migration),
            live: Arc::clone(&self.live),
            state: Arc::clone(&self.state),
        })
    }
}

/// Handle produced by [`InMemoryTenantDriver`].
#[derive(Debug, Clone)]
pub struct InMemoryTenantConnection {
    id: u64,
    host: String,
    open: Arc<AtomicBool>,
    fail_migrations: bool,
    live: Arc<AtomicUsize>,
    state: Arc<RwLock<DriverState>>,
}

impl InMemoryTenantConnection {
    /// Simulates the server dropping the connection.
    pub fn sever(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl TenantConnection for InMemoryTenantConnection {
    fn handle_id(&self) -> u64 {
        self.id
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn run_pending_migrations(&self) -> DriverResult<Vec<String>> {
        if !self.is_open() {
            return Err(DriverError::io(std::io::Error::new(
                ErrorKind::NotConnected,
                "connection is closed",
            )));
        }

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.migration_runs += 1;
        if self.fail_migrations {
            return Err(DriverError::migration(std::io::Error::other(
                "relation \"users\" already exists",
            )));
        }

        let migrations = state.migrations.clone();
        let applied = state.applied.entry(self.host.clone()).or_default();
        let pending: Vec<String> = migrations
            .into_iter()
            .filter(|version| !applied.contains(version))
            .collect();
        applied.extend(pending.iter().cloned());
        Ok(pending)
    }

    async fn close(&self) {
        self.sever();
    }
}
