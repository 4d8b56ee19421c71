//! Process-wide cache of live tenant connections.
//!
//! [`TenantConnectionRegistry`] hands out at most one live connection per
//! tenant slug. Each slug owns a slot guarded by an async mutex, so
//! concurrent cold lookups for the same tenant wait for a single open while
//! lookups for other tenants proceed independently. Every cached entry has
//! an evictor task that closes the connection once it has been idle for the
//! configured window; a lookup that hits the cache pushes the deadline out.
//!
//! A slot leaves the map once it is empty and no lookup holds it, so failed
//! lookups for unknown slugs leave nothing behind.

use super::factory::{ConnectionError, ConnectionFactory};
use crate::tenancy::{
    domain::{CredentialSelection, TenantSlug},
    ports::{
        CredentialCodec, TenantConnection, TenantDatabaseDriver, TenantDirectory,
        TenantDirectoryError,
    },
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Idle window after which a cached connection is closed.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Errors returned by [`TenantConnectionRegistry::get_connection`].
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// No tenant has the requested slug.
    #[error("tenant not found: {0}")]
    TenantNotFound(TenantSlug),
    /// The tenant exists but has no database attached.
    #[error("tenant database not found: {0}")]
    DatabaseNotConfigured(TenantSlug),
    /// The control-plane lookup failed.
    #[error(transparent)]
    Directory(#[from] TenantDirectoryError),
    /// Decrypting or opening the connection failed.
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// Result type for registry lookups.
pub type RegistryResult<T> = Result<T, RegistryError>;

struct CachedConnection<C> {
    handle: C,
    deadline: Instant,
    generation: u64,
    evictor: JoinHandle<()>,
}

type Slot<C> = Arc<AsyncMutex<Option<CachedConnection<C>>>>;
type SlotMap<C> = Mutex<HashMap<TenantSlug, Slot<C>>>;

/// Lazily opened, idle-evicted tenant connections keyed by slug.
pub struct TenantConnectionRegistry<R, K, D>
where
    R: TenantDirectory,
    K: CredentialCodec,
    D: TenantDatabaseDriver,
{
    directory: Arc<R>,
    factory: ConnectionFactory<K, D>,
    idle_timeout: Duration,
    slots: Arc<SlotMap<D::Connection>>,
    generations: AtomicU64,
}

impl<R, K, D> TenantConnectionRegistry<R, K, D>
where
    R: TenantDirectory,
    K: CredentialCodec,
    D: TenantDatabaseDriver,
{
    /// Creates an empty registry.
    #[must_use]
    pub fn new(directory: Arc<R>, factory: ConnectionFactory<K, D>, idle_timeout: Duration) -> Self {
        Self {
            directory,
            factory,
            idle_timeout,
            slots: Arc::new(Mutex::new(HashMap::new())),
            generations: AtomicU64::new(0),
        }
    }

    /// Returns the idle window applied to cached connections.
    #[must_use]
    pub const fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Returns the live connection for `slug`, opening one on a cache miss.
    ///
    /// A hit resets the idle deadline. A cached handle that reports itself
    /// closed is discarded and replaced. Failures leave nothing cached.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::TenantNotFound`] or
    /// [`RegistryError::DatabaseNotConfigured`] for unknown tenants, and
    /// propagates directory and connection failures.
    pub async fn get_connection(&self, slug: &TenantSlug) -> RegistryResult<D::Connection> {
        let slot = self.slot_for(slug);
        let mut guard = slot.lock().await;

        if let Some(entry) = guard.as_mut() {
            if entry.handle.is_open() {
                entry.deadline = Instant::now() + self.idle_timeout;
                debug!(tenant = %slug, handle = entry.handle.handle_id(), "reusing tenant connection");
                return Ok(entry.handle.clone());
            }
            warn!(
                tenant = %slug,
                handle = entry.handle.handle_id(),
                "cached tenant connection is no longer open; reconnecting"
            );
        }
        if let Some(stale) = guard.take() {
            stale.evictor.abort();
            stale.handle.close().await;
        }

        let handle = match self.establish(slug).await {
            Ok(opened) => opened,
            Err(err) => {
                drop(guard);
                release_unused_slot(&self.slots, slug, slot);
                return Err(err);
            }
        };
        *guard = Some(self.cache_entry(slug, &slot, handle.clone()));
        Ok(handle)
    }

    /// Closes and forgets the cached connection for `slug`.
    ///
    /// Returns `false` when nothing was cached.
    pub async fn close_connection(&self, slug: &TenantSlug) -> bool {
        let slot = self.slots().get(slug).cloned();
        let Some(cached_slot) = slot else {
            return false;
        };
        let closed = close_slot(&cached_slot).await;
        release_unused_slot(&self.slots, slug, cached_slot);
        if closed {
            info!(tenant = %slug, "closed tenant connection");
        }
        closed
    }

    /// Closes every cached connection and returns how many were closed.
    pub async fn close_all_connections(&self) -> usize {
        let slots: Vec<(TenantSlug, Slot<D::Connection>)> = self
            .slots()
            .iter()
            .map(|(slug, slot)| (slug.clone(), Arc::clone(slot)))
            .collect();

        let mut closed = 0;
        for (slug, slot) in slots {
            if close_slot(&slot).await {
                debug!(tenant = %slug, "closed tenant connection");
                closed += 1;
            }
            release_unused_slot(&self.slots, &slug, slot);
        }
        info!(closed, "closed all tenant connections");
        closed
    }

    /// Returns how many tenants currently have a cached connection.
    pub async fn cached_count(&self) -> usize {
        let slots: Vec<Slot<D::Connection>> = self.slots().values().cloned().collect();
        let mut count = 0;
        for slot in slots {
            if slot.lock().await.is_some() {
                count += 1;
            }
        }
        count
    }

    /// Returns whether `slug` currently has a cached connection.
    pub async fn is_cached(&self, slug: &TenantSlug) -> bool {
        let slot = self.slots().get(slug).cloned();
        match slot {
            Some(cached_slot) => cached_slot.lock().await.is_some(),
            None => false,
        }
    }

    /// Returns how many tenants hold a slot, cached or mid-establishment.
    #[must_use]
    pub fn tracked_slot_count(&self) -> usize {
        self.slots().len()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<TenantSlug, Slot<D::Connection>>> {
        lock_slots(&self.slots)
    }

    fn slot_for(&self, slug: &TenantSlug) -> Slot<D::Connection> {
        Arc::clone(self.slots().entry(slug.clone()).or_default())
    }

    async fn establish(&self, slug: &TenantSlug) -> RegistryResult<D::Connection> {
        let entry = self
            .directory
            .find_by_slug(slug, CredentialSelection::Include)
            .await?
            .ok_or_else(|| RegistryError::TenantNotFound(slug.clone()))?;
        let record = entry
            .database
            .ok_or_else(|| RegistryError::DatabaseNotConfigured(slug.clone()))?;

        let handle = self.factory.create_connection(&record).await?;
        info!(
            tenant = %slug,
            database_id = %record.id(),
            handle = handle.handle_id(),
            "opened tenant connection"
        );
        Ok(handle)
    }

    fn cache_entry(
        &self,
        slug: &TenantSlug,
        slot: &Slot<D::Connection>,
        handle: D::Connection,
    ) -> CachedConnection<D::Connection> {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        let deadline = Instant::now() + self.idle_timeout;
        let evictor = tokio::spawn(evict_when_idle(
            slug.clone(),
            Arc::downgrade(&self.slots),
            Arc::downgrade(slot),
            generation,
            deadline,
        ));
        CachedConnection {
            handle,
            deadline,
            generation,
            evictor,
        }
    }
}

fn lock_slots<C>(slots: &SlotMap<C>) -> MutexGuard<'_, HashMap<TenantSlug, Slot<C>>> {
    // The map only holds slot handles, so a panic elsewhere cannot leave it
    // inconsistent.
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Gives up the caller's handle on `slot` and removes the slot from the map
/// once it is empty and the map holds the last reference.
///
/// Handles are only cloned out of the map under its lock, and this drops the
/// caller's handle under the same lock, so of several releasers the last one
/// always sees a lone reference.
fn release_unused_slot<C>(slots: &SlotMap<C>, slug: &TenantSlug, slot: Slot<C>) {
    let mut map = lock_slots(slots);
    let tracked = map
        .get(slug)
        .is_some_and(|current| Arc::ptr_eq(current, &slot));
    drop(slot);
    let unused = tracked
        && map.get(slug).is_some_and(|current| {
            Arc::strong_count(current) == 1
                && current.try_lock().is_ok_and(|entry| entry.is_none())
        });
    if unused {
        map.remove(slug);
    }
}

async fn close_slot<C: TenantConnection>(slot: &Slot<C>) -> bool {
    let mut guard = slot.lock().await;
    let Some(entry) = guard.take() else {
        return false;
    };
    entry.evictor.abort();
    entry.handle.close().await;
    true
}

async fn evict_when_idle<C: TenantConnection>(
    slug: TenantSlug,
    weak_slots: Weak<SlotMap<C>>,
    weak_slot: Weak<AsyncMutex<Option<CachedConnection<C>>>>,
    generation: u64,
    initial_deadline: Instant,
) {
    let mut deadline = initial_deadline;
    loop {
        tokio::time::sleep_until(deadline).await;
        let Some(slot) = weak_slot.upgrade() else {
            return;
        };
        let mut guard = slot.lock().await;
        let Some(entry) = guard.as_ref() else {
            return;
        };
        if entry.generation != generation {
            return;
        }
        if entry.deadline > Instant::now() {
            deadline = entry.deadline;
            continue;
        }
        if let Some(expired) = guard.take() {
            expired.handle.close().await;
            info!(
                tenant = %slug,
                handle = expired.handle.handle_id(),
                "evicted idle tenant connection"
            );
        }
        drop(guard);
        if let Some(slots) = weak_slots.upgrade() {
            release_unused_slot(&slots, &slug, slot);
        }
        return;
    }
}
