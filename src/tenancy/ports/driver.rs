//! Driver port for opening and migrating tenant databases.

use crate::tenancy::domain::ConnectionSettings;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;

/// Opens live connections to tenant databases.
#[async_trait]
pub trait TenantDatabaseDriver: Send + Sync {
    /// Live connection handle produced by this driver.
    type Connection: TenantConnection;

    /// Opens a connection eagerly.
    ///
    /// Returns only after the network and authentication handshake have
    /// succeeded; the caller owns closing the returned handle.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Handshake`] when the server refuses or cannot
    /// be reached, or [`DriverError::Io`] for local infrastructure failures.
    async fn open(&self, settings: ConnectionSettings) -> DriverResult<Self::Connection>;
}

/// A live, shareable handle to one tenant database.
///
/// Clones refer to the same underlying pool, so concurrent use of a cached
/// handle is safe.
#[async_trait]
pub trait TenantConnection: Clone + Send + Sync + 'static {
    /// Returns a process-unique identity for this handle.
    fn handle_id(&self) -> u64;

    /// Reports whether the handle is still usable, without performing I/O.
    fn is_open(&self) -> bool;

    /// Applies all pending tenant-schema migrations in ascending version
    /// order, each inside its own transaction, and returns the applied
    /// versions.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Migration`] when a migration step fails; the
    /// failing step leaves no committed state behind.
    async fn run_pending_migrations(&self) -> DriverResult<Vec<String>>;

    /// Closes the handle. Closing twice is a no-op.
    async fn close(&self);
}

/// Errors returned by driver implementations.
#[derive(Debug, Clone, Error)]
pub enum DriverError {
    /// The server could not be reached or rejected authentication.
    #[error("connection handshake failed: {0}")]
    Handshake(Arc<dyn std::error::Error + Send + Sync>),

    /// Local infrastructure failure unrelated to the handshake.
    #[error("driver I/O error: {0}")]
    Io(Arc<dyn std::error::Error + Send + Sync>),

    /// A migration step failed.
    #[error("migration failed: {0}")]
    Migration(Arc<dyn std::error::Error + Send + Sync>),
}

impl DriverError {
    /// Wraps a handshake failure.
    pub fn handshake(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Handshake(Arc::new(err))
    }

    /// Wraps a local I/O failure.
    pub fn io(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Io(Arc::new(err))
    }

    /// Wraps a migration failure.
    pub fn migration(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Migration(Arc::new(err))
    }
}
