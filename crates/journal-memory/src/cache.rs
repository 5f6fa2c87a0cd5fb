use chrono::{DateTime, Utc};
use journal_core::ConversationContext;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::storage::ConversationStore;

/// Disk operations are funneled through a single actor task so they execute
/// in submission order for the whole cache.
enum StoreOp {
    Save(Uuid, ConversationContext),
    Load(Uuid, oneshot::Sender<Option<ConversationContext>>),
    Delete(Uuid),
    Sweep(DateTime<Utc>, oneshot::Sender<usize>),
}

/// Bounded read/write-through accelerator over [`ConversationStore`].
///
/// The memory table holds at most `capacity` conversations; the disk store
/// underneath is unbounded and is the source of truth. When the table
/// overflows, the conversation with the oldest `created_at` is dropped from
/// memory only (ties broken by smallest id). This is deliberately an
/// oldest-conversation policy, not LRU: conversation age is what predicts
/// staleness here, not last access.
///
/// Writes and sweeps are enqueued without blocking the caller. The actor
/// task owns the store and its queue, so dropping the cache never cancels
/// an in-flight write; the actor drains whatever is queued and exits.
///
/// Must be constructed inside a Tokio runtime (the actor is spawned in
/// `new`).
pub struct ConversationCache {
    table: Arc<Mutex<HashMap<Uuid, ConversationContext>>>,
    ops: mpsc::UnboundedSender<StoreOp>,
    actor: JoinHandle<()>,
    capacity: usize,
}

impl ConversationCache {
    pub const DEFAULT_CAPACITY: usize = 5;

    pub fn new(store: ConversationStore, capacity: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let actor = tokio::spawn(run_store_actor(store, rx));

        Self {
            table: Arc::new(Mutex::new(HashMap::new())),
            ops: tx,
            actor,
            capacity,
        }
    }

    pub fn with_default_capacity(store: ConversationStore) -> Self {
        Self::new(store, Self::DEFAULT_CAPACITY)
    }

    /// Memory first, then lazy load from disk. A disk hit is inserted into
    /// the table (running eviction) before returning.
    pub async fn get(&self, id: &Uuid) -> Option<ConversationContext> {
        if let Some(context) = self.table.lock().await.get(id).cloned() {
            debug!("Cache hit for conversation {}", id);
            return Some(context);
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        if self.ops.send(StoreOp::Load(*id, reply_tx)).is_err() {
            warn!("Store actor unavailable, treating {} as a miss", id);
            return None;
        }
        let loaded = reply_rx.await.ok().flatten()?;

        debug!("Cache miss for conversation {}, loaded from disk", id);
        let mut table = self.table.lock().await;
        table.insert(*id, loaded.clone());
        Self::evict_if_over_capacity(&mut table, self.capacity);
        Some(loaded)
    }

    /// Synchronous memory update, then a best-effort disk write queued
    /// behind any earlier disk work. The caller never observes the write's
    /// outcome.
    pub async fn put(&self, id: Uuid, context: ConversationContext) {
        {
            let mut table = self.table.lock().await;
            table.insert(id, context.clone());
            Self::evict_if_over_capacity(&mut table, self.capacity);
        }

        if self.ops.send(StoreOp::Save(id, context)).is_err() {
            warn!("Store actor unavailable, conversation {} not persisted", id);
        }
    }

    /// Drop from memory and delete the disk record. Deletion failures are
    /// swallowed by the store, so this never errors and repeating it is a
    /// no-op.
    pub async fn remove(&self, id: &Uuid) {
        self.table.lock().await.remove(id);

        if self.ops.send(StoreOp::Delete(*id)).is_err() {
            warn!("Store actor unavailable, record {} not deleted", id);
        }
    }

    /// Sweep disk records created before `cutoff`. The memory table is left
    /// alone: it is bounded by count and self-corrects through eviction.
    ///
    /// Returns a handle resolving to the removed count; drop it for
    /// fire-and-forget.
    pub fn cleanup(&self, cutoff: DateTime<Utc>) -> JoinHandle<usize> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.ops.send(StoreOp::Sweep(cutoff, reply_tx)).is_err() {
            warn!("Store actor unavailable, sweep skipped");
        }
        tokio::spawn(async move { reply_rx.await.unwrap_or(0) })
    }

    /// Close the queue and wait for every pending disk operation to finish.
    ///
    /// Short-lived processes must call this before exiting: dropping the
    /// runtime while the actor still holds queued writes would lose them.
    pub async fn shutdown(self) {
        drop(self.ops);
        if let Err(e) = self.actor.await {
            warn!("Store actor terminated abnormally: {}", e);
        }
    }

    /// Number of conversations currently held in memory.
    pub async fn len(&self) -> usize {
        self.table.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.table.lock().await.is_empty()
    }

    fn evict_if_over_capacity(table: &mut HashMap<Uuid, ConversationContext>, capacity: usize) {
        while table.len() > capacity {
            let oldest = table
                .iter()
                .min_by_key(|(id, context)| (context.created_at, **id))
                .map(|(id, _)| *id);
            match oldest {
                Some(id) => {
                    debug!("Evicting oldest conversation {} from memory", id);
                    table.remove(&id);
                }
                None => break,
            }
        }
    }
}

/// Owns the store for the cache's lifetime and beyond: pending operations
/// still drain after every cache handle is gone.
async fn run_store_actor(store: ConversationStore, mut rx: mpsc::UnboundedReceiver<StoreOp>) {
    while let Some(op) = rx.recv().await {
        let store = store.clone();
        let result = tokio::task::spawn_blocking(move || match op {
            StoreOp::Save(id, context) => store.save(&id, &context),
            StoreOp::Load(id, reply) => {
                let _ = reply.send(store.load(&id));
            }
            StoreOp::Delete(id) => store.delete(&id),
            StoreOp::Sweep(cutoff, reply) => {
                let _ = reply.send(store.sweep(cutoff));
            }
        })
        .await;

        if let Err(e) = result {
            warn!("Store operation panicked or was cancelled: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use journal_core::Provider;
    use tempfile::TempDir;

    fn context_created_at(offset_secs: i64) -> ConversationContext {
        let mut ctx = ConversationContext::new(Vec::new(), "entry", Provider::OpenAi);
        ctx.created_at = Utc::now() + Duration::seconds(offset_secs);
        ctx
    }

    #[tokio::test]
    async fn put_is_immediately_visible() {
        let dir = TempDir::new().unwrap();
        let cache = ConversationCache::with_default_capacity(ConversationStore::new(dir.path()));
        let id = Uuid::new_v4();

        cache.put(id, context_created_at(0)).await;
        assert!(cache.get(&id).await.is_some());
    }

    #[tokio::test]
    async fn evicts_oldest_created_at() {
        let dir = TempDir::new().unwrap();
        let cache = ConversationCache::with_default_capacity(ConversationStore::new(dir.path()));

        let oldest = Uuid::new_v4();
        cache.put(oldest, context_created_at(-100)).await;
        let mut newer = Vec::new();
        for i in 0..5 {
            let id = Uuid::new_v4();
            cache.put(id, context_created_at(i)).await;
            newer.push(id);
        }

        assert_eq!(cache.len().await, 5);
        assert!(!cache.table.lock().await.contains_key(&oldest));
        for id in &newer {
            assert!(cache.table.lock().await.contains_key(id));
        }
    }

    #[tokio::test]
    async fn eviction_leaves_disk_untouched_and_get_reloads() {
        let dir = TempDir::new().unwrap();
        let store = ConversationStore::new(dir.path());
        let cache = ConversationCache::new(store.clone(), 2);

        let evicted = Uuid::new_v4();
        cache.put(evicted, context_created_at(-100)).await;
        cache.put(Uuid::new_v4(), context_created_at(1)).await;
        cache.put(Uuid::new_v4(), context_created_at(2)).await;

        assert_eq!(cache.len().await, 2);
        // Evicted from memory, but the disk record still serves the miss.
        assert!(cache.get(&evicted).await.is_some());
    }

    #[tokio::test]
    async fn memory_hit_survives_disk_removal() {
        let dir = TempDir::new().unwrap();
        let store = ConversationStore::new(dir.path());
        let cache = ConversationCache::with_default_capacity(store.clone());

        let id = Uuid::new_v4();
        cache.put(id, context_created_at(0)).await;
        store.delete(&id);

        assert!(cache.get(&id).await.is_some());
    }

    #[tokio::test]
    async fn remove_twice_is_noop() {
        let dir = TempDir::new().unwrap();
        let cache = ConversationCache::with_default_capacity(ConversationStore::new(dir.path()));
        let id = Uuid::new_v4();

        cache.put(id, context_created_at(0)).await;
        cache.remove(&id).await;
        cache.remove(&id).await;

        assert!(cache.get(&id).await.is_none());
    }

    #[tokio::test]
    async fn cleanup_sweeps_stale_disk_records() {
        let dir = TempDir::new().unwrap();
        let store = ConversationStore::new(dir.path());
        let cache = ConversationCache::with_default_capacity(store.clone());

        let stale = Uuid::new_v4();
        let fresh = Uuid::new_v4();
        let mut old_ctx = context_created_at(0);
        old_ctx.created_at = Utc::now() - Duration::days(40);
        store.save(&stale, &old_ctx);
        store.save(&fresh, &context_created_at(0));

        let removed = cache
            .cleanup(Utc::now() - Duration::days(30))
            .await
            .unwrap();

        assert_eq!(removed, 1);
        assert!(store.load(&stale).is_none());
        assert!(store.load(&fresh).is_some());
    }

    #[tokio::test]
    async fn equal_created_at_evicts_smallest_id() {
        let dir = TempDir::new().unwrap();
        let cache = ConversationCache::new(ConversationStore::new(dir.path()), 1);

        let shared = context_created_at(0);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        cache.put(a, shared.clone()).await;
        cache.put(b, shared).await;

        let survivor = std::cmp::max(a, b);
        assert!(cache.table.lock().await.contains_key(&survivor));
    }

    #[tokio::test]
    async fn shutdown_drains_queued_disk_work() {
        let dir = TempDir::new().unwrap();
        let store = ConversationStore::new(dir.path());
        let cache = ConversationCache::with_default_capacity(store.clone());

        let kept = Uuid::new_v4();
        let cleared = Uuid::new_v4();
        cache.put(kept, context_created_at(0)).await;
        cache.put(cleared, context_created_at(1)).await;
        cache.remove(&cleared).await;

        cache.shutdown().await;

        // Every queued save and delete has hit the disk by now.
        assert!(store.load(&kept).is_some());
        assert!(store.load(&cleared).is_none());
    }

    #[tokio::test]
    async fn pending_writes_survive_cache_drop() {
        let dir = TempDir::new().unwrap();
        let store = ConversationStore::new(dir.path());
        let id = Uuid::new_v4();

        {
            let cache = ConversationCache::with_default_capacity(store.clone());
            cache.put(id, context_created_at(0)).await;
        }

        // The actor drains the queued save even though the cache is gone.
        let mut attempts = 0;
        while store.load(&id).is_none() && attempts < 50 {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            attempts += 1;
        }
        assert!(store.load(&id).is_some());
    }
}
