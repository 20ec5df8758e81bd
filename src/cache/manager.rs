//! Two-tier response cache
//!
//! Memory is authoritative for the running process. Every update is applied
//! to memory first and then queued for a single background writer, which
//! persists it to the durable store and trims the store back to capacity.
//! Store failures are logged and never reach the caller.

use crate::cache::store::{CacheEntry, ResponseStore};
use crate::error::IhppResult;
use crate::request::Fingerprint;
use crate::response::{ResponseState, ResponseUpdate};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Maximum number of responses kept per tier
pub const MAX_STORED_RESPONSES: usize = 1000;

struct MemoryEntry {
    state: ResponseState,
    seq: u64,
}

/// Bounded map that forgets the oldest-written entries first
struct MemoryTier {
    entries: HashMap<Fingerprint, MemoryEntry>,
    order: BTreeMap<u64, Fingerprint>,
    next_seq: u64,
    capacity: usize,
    /// Bumped by every remove and clear; loads started before a bump are stale
    removals: u64,
}

impl MemoryTier {
    fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            next_seq: 0,
            capacity,
            removals: 0,
        }
    }

    fn get(&self, key: &Fingerprint) -> Option<&ResponseState> {
        self.entries.get(key).map(|e| &e.state)
    }

    fn insert(&mut self, key: Fingerprint, state: ResponseState) {
        let seq = self.next_seq;
        self.next_seq += 1;

        if let Some(old) = self.entries.insert(key.clone(), MemoryEntry { state, seq }) {
            self.order.remove(&old.seq);
        }
        self.order.insert(seq, key);

        while self.entries.len() > self.capacity {
            let Some((_, oldest)) = self.order.pop_first() else {
                break;
            };
            self.entries.remove(&oldest);
            debug!("Dropped {} from memory tier", oldest.short());
        }
    }

    /// Insert unless a (newer) value is already present; returns the winner
    fn insert_if_absent(&mut self, key: Fingerprint, state: ResponseState) -> ResponseState {
        if let Some(existing) = self.get(&key) {
            return existing.clone();
        }
        self.insert(key, state.clone());
        state
    }

    /// Promote a value loaded from the store
    ///
    /// Skipped when a remove or clear happened since `removals` was read, so
    /// a deleted entry cannot come back from a load that was in flight.
    fn promote(&mut self, key: Fingerprint, state: ResponseState, removals: u64) -> ResponseState {
        if self.removals != removals {
            return self.get(&key).cloned().unwrap_or(state);
        }
        self.insert_if_absent(key, state)
    }

    fn remove(&mut self, key: &Fingerprint) {
        self.removals += 1;
        if let Some(old) = self.entries.remove(key) {
            self.order.remove(&old.seq);
        }
    }

    fn clear(&mut self) {
        self.removals += 1;
        self.entries.clear();
        self.order.clear();
    }
}

/// Work queued for the background writer
enum WriteOp {
    Put(CacheEntry),
    Delete(Fingerprint, oneshot::Sender<()>),
    Clear(oneshot::Sender<()>),
    Flush(oneshot::Sender<()>),
}

/// Fingerprint-keyed response cache over memory and a durable store
pub struct CacheManager {
    memory: RwLock<MemoryTier>,
    store: Arc<dyn ResponseStore>,
    writer: mpsc::UnboundedSender<WriteOp>,
}

impl CacheManager {
    /// Create a cache manager with the default capacity
    ///
    /// Spawns the durable writer, so this must be called inside a tokio runtime.
    pub fn new(store: Arc<dyn ResponseStore>) -> Self {
        Self::with_capacity(store, MAX_STORED_RESPONSES)
    }

    /// Create a cache manager with an explicit per-tier capacity
    pub fn with_capacity(store: Arc<dyn ResponseStore>, capacity: usize) -> Self {
        let (writer, queue) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(Arc::clone(&store), capacity, queue));

        Self {
            memory: RwLock::new(MemoryTier::new(capacity)),
            store,
            writer,
        }
    }

    fn read_memory(&self) -> RwLockReadGuard<'_, MemoryTier> {
        self.memory.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_memory(&self) -> RwLockWriteGuard<'_, MemoryTier> {
        self.memory.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get the state for a fingerprint
    ///
    /// Served from memory when present, otherwise loaded from the durable
    /// store and promoted into memory. A key found in neither tier yields the
    /// default empty state, which is not persisted.
    pub async fn get_state(&self, key: &Fingerprint) -> ResponseState {
        let (cached, removals) = {
            let memory = self.read_memory();
            (memory.get(key).cloned(), memory.removals)
        };
        if let Some(state) = cached {
            debug!("Memory hit for {}", key.short());
            return state;
        }

        match self.store.get(key).await {
            Ok(Some(entry)) => {
                debug!("Loaded {} from response store", key.short());
                return self
                    .write_memory()
                    .promote(key.clone(), entry.state, removals);
            }
            Ok(None) => debug!("No cached response for {}", key.short()),
            Err(e) => warn!("Failed to load response {} from store: {}", key.short(), e),
        }

        ResponseState::default()
    }

    /// Get the state for a fingerprint from memory only
    pub fn peek(&self, key: &Fingerprint) -> Option<ResponseState> {
        self.read_memory().get(key).cloned()
    }

    /// Merge a partial update into the state for a fingerprint
    ///
    /// The merged state is visible to readers as soon as this returns; the
    /// durable write happens in the background, in call order.
    pub fn update_state(&self, key: &Fingerprint, update: ResponseUpdate) -> ResponseState {
        let merged = {
            let mut memory = self.write_memory();
            let merged = memory.get(key).cloned().unwrap_or_default().merged(update);
            memory.insert(key.clone(), merged.clone());
            merged
        };

        self.enqueue(WriteOp::Put(CacheEntry::stamped(key.clone(), merged.clone())));
        merged
    }

    /// Remove a fingerprint from both tiers
    pub async fn delete_state(&self, key: &Fingerprint) {
        self.write_memory().remove(key);

        let (done, wait) = oneshot::channel();
        self.enqueue(WriteOp::Delete(key.clone(), done));
        let _ = wait.await;
    }

    /// Empty both tiers
    pub async fn clear_all(&self) {
        self.write_memory().clear();

        let (done, wait) = oneshot::channel();
        self.enqueue(WriteOp::Clear(done));
        let _ = wait.await;
    }

    /// Forget the memory tier only; the durable tier is untouched
    pub fn clear_memory(&self) {
        self.write_memory().clear();
    }

    /// Number of states held in memory
    pub fn memory_len(&self) -> usize {
        self.read_memory().entries.len()
    }

    /// Wait until every write queued so far has reached the store
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        self.enqueue(WriteOp::Flush(done));
        let _ = wait.await;
    }

    /// Number of durable entries, after pending writes land
    pub async fn durable_count(&self) -> IhppResult<usize> {
        self.flush().await;
        self.store.count().await
    }

    fn enqueue(&self, op: WriteOp) {
        if self.writer.send(op).is_err() {
            warn!("Response store writer has stopped; keeping update in memory only");
        }
    }
}

/// Evict the oldest durable entries until at most `capacity` remain
pub async fn trim_to_capacity(store: &dyn ResponseStore, capacity: usize) -> IhppResult<usize> {
    let count = store.count().await?;
    if count <= capacity {
        return Ok(0);
    }

    let evicted = store.evict_oldest(count - capacity).await?;
    debug!(
        "Response store over capacity ({} > {}), evicted {}",
        count, capacity, evicted
    );
    Ok(evicted)
}

async fn run_writer(
    store: Arc<dyn ResponseStore>,
    capacity: usize,
    mut queue: mpsc::UnboundedReceiver<WriteOp>,
) {
    while let Some(op) = queue.recv().await {
        match op {
            WriteOp::Put(entry) => {
                if let Err(e) = store.put(&entry).await {
                    warn!("Failed to save response {} to store: {}", entry.hash.short(), e);
                    continue;
                }
                if let Err(e) = trim_to_capacity(store.as_ref(), capacity).await {
                    warn!("Failed to trim response store: {}", e);
                }
            }
            WriteOp::Delete(key, done) => {
                if let Err(e) = store.delete(&key).await {
                    warn!("Failed to delete response {} from store: {}", key.short(), e);
                }
                let _ = done.send(());
            }
            WriteOp::Clear(done) => {
                if let Err(e) = store.clear().await {
                    warn!("Failed to clear response store: {}", e);
                }
                let _ = done.send(());
            }
            WriteOp::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("Response store writer stopped");
}
