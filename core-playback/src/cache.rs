//! # Buffer Cache
//!
//! URL-keyed registry of decoded buffers shared by every [`Sound`] playing the
//! same resource, plus the membership list used by bulk operations.
//!
//! ## Overview
//!
//! - Buffers are stored once per URL and handed out as `Arc` clones.
//! - Concurrent loads of an uncached URL join a single in-flight load.
//! - A finished load is stored before any waiter resumes, so a sound that is
//!   notified as ready can rely on later lookups hitting.
//! - Entries are never evicted; membership is cleared when a sound is
//!   destroyed.
//!
//! ```text
//! Sound::load ──> get_or_load(url) ──hit──> Arc<DecodedBuffer>
//!                        │
//!                        └─miss─> pending[url] (Shared) ──> fetch + decode
//! ```

use crate::error::Result;
use crate::sound::{Sound, SoundId, WeakSound};
use bridge_traits::DecodedBuffer;
use futures::future::{FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Future resolving to a freshly loaded buffer.
#[cfg(not(target_arch = "wasm32"))]
pub type LoadFuture = futures::future::BoxFuture<'static, Result<Arc<DecodedBuffer>>>;

#[cfg(target_arch = "wasm32")]
pub type LoadFuture = futures::future::LocalBoxFuture<'static, Result<Arc<DecodedBuffer>>>;

type PendingLoad = Shared<LoadFuture>;

/// Shared decoded-buffer cache.
///
/// Create one per application (usually through `AudioFx`) and share it with
/// `Arc`; there is no process-wide instance.
#[derive(Default)]
pub struct BufferCache {
    buffers: Mutex<HashMap<String, Arc<DecodedBuffer>>>,
    pending: Mutex<HashMap<String, PendingLoad>>,
    members: Mutex<Vec<WeakSound>>,
}

impl BufferCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached buffer for an exact URL match.
    pub fn lookup(&self, url: &str) -> Option<Arc<DecodedBuffer>> {
        self.buffers.lock().get(url).cloned()
    }

    /// Store `buffer` under `url` unless an entry already exists.
    ///
    /// Returns the buffer that is cached after the call, which is the
    /// existing one when the URL was already present.
    pub fn insert(&self, url: &str, buffer: Arc<DecodedBuffer>) -> Arc<DecodedBuffer> {
        let mut buffers = self.buffers.lock();
        Arc::clone(buffers.entry(url.to_string()).or_insert(buffer))
    }

    pub fn contains(&self, url: &str) -> bool {
        self.buffers.lock().contains_key(url)
    }

    /// Number of cached buffers.
    pub fn len(&self) -> usize {
        self.buffers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.lock().is_empty()
    }

    /// URLs with a cached buffer, sorted.
    pub fn urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.buffers.lock().keys().cloned().collect();
        urls.sort();
        urls
    }

    /// Number of loads currently in flight.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Return the cached buffer for `url`, or load it with `loader`.
    ///
    /// When a load for `url` is already in flight, `loader` is not called and
    /// the caller waits on the existing load instead. A successful result is
    /// stored before this returns; a failure is returned to every waiter and
    /// leaves nothing behind, so a later call starts a fresh load.
    pub async fn get_or_load<F>(&self, url: &str, loader: F) -> Result<Arc<DecodedBuffer>>
    where
        F: FnOnce() -> LoadFuture,
    {
        if let Some(buffer) = self.lookup(url) {
            trace!(url, "Buffer cache hit");
            return Ok(buffer);
        }

        let load = {
            let mut pending = self.pending.lock();
            // A load may have finished between the lookup and taking the lock.
            if let Some(buffer) = self.lookup(url) {
                trace!(url, "Buffer cache hit");
                return Ok(buffer);
            }
            match pending.get(url) {
                Some(load) => {
                    debug!(url, "Joining in-flight load");
                    load.clone()
                }
                None => {
                    debug!(url, "Buffer cache miss, starting load");
                    let load = loader().shared();
                    pending.insert(url.to_string(), load.clone());
                    load
                }
            }
        };

        let result = load.clone().await;
        let result = result.map(|buffer| self.insert(url, buffer));

        let mut pending = self.pending.lock();
        if pending.get(url).is_some_and(|current| current.ptr_eq(&load)) {
            pending.remove(url);
        }

        result
    }

    /// Add `sound` to the bulk-operation membership. Registering twice is a
    /// no-op.
    pub fn register(&self, sound: &Sound) {
        let mut members = self.members.lock();
        members.retain(WeakSound::is_alive);
        if members.iter().all(|member| member.id() != sound.id()) {
            members.push(sound.downgrade());
        }
    }

    /// Remove a sound from the membership. Its buffer stays cached.
    pub fn remove(&self, id: SoundId) {
        self.members.lock().retain(|member| member.id() != id);
    }

    /// Number of live registered sounds.
    pub fn member_count(&self) -> usize {
        self.members.lock().iter().filter(|m| m.is_alive()).count()
    }

    /// Apply `f` to every live registered sound in registration order.
    ///
    /// The membership is snapshotted first, so `f` may destroy sounds or
    /// register new ones.
    pub fn for_each_member<F>(&self, mut f: F)
    where
        F: FnMut(&Sound),
    {
        let snapshot: Vec<WeakSound> = self.members.lock().clone();
        for sound in snapshot.iter().filter_map(WeakSound::upgrade) {
            f(&sound);
        }
    }
}

impl std::fmt::Debug for BufferCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferCache")
            .field("buffers", &self.len())
            .field("pending", &self.pending_count())
            .field("members", &self.member_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlaybackError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn buffer(frames: usize) -> Arc<DecodedBuffer> {
        Arc::new(DecodedBuffer::silence(2, frames, 44100).unwrap())
    }

    #[test]
    fn insert_keeps_first_buffer() {
        let cache = BufferCache::new();
        let first = buffer(10);
        let second = buffer(20);

        let stored = cache.insert("a.ogg", Arc::clone(&first));
        assert!(Arc::ptr_eq(&stored, &first));

        let stored = cache.insert("a.ogg", second);
        assert!(Arc::ptr_eq(&stored, &first));
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("a.ogg"));
        assert!(cache.lookup("A.ogg").is_none());
    }

    #[tokio::test]
    async fn get_or_load_stores_result() {
        let cache = BufferCache::new();
        let calls = AtomicUsize::new(0);

        let loaded = cache
            .get_or_load("b.ogg", || {
                calls.fetch_add(1, Ordering::SeqCst);
                Box::pin(async { Ok(buffer(100)) })
            })
            .await
            .unwrap();

        assert_eq!(loaded.frame_count(), 100);
        assert!(cache.contains("b.ogg"));
        assert_eq!(cache.pending_count(), 0);

        let again = cache
            .get_or_load("b.ogg", || {
                calls.fetch_add(1, Ordering::SeqCst);
                Box::pin(async { Ok(buffer(1)) })
            })
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&loaded, &again));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_loads_share_one_loader() {
        let cache = BufferCache::new();
        let calls = AtomicUsize::new(0);
        let (tx, rx) = futures::channel::oneshot::channel::<()>();

        let first = cache.get_or_load("c.ogg", || {
            calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                rx.await.ok();
                Ok(buffer(5))
            })
        });
        let second = cache.get_or_load("c.ogg", || {
            calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(buffer(6)) })
        });
        let release = async move {
            tx.send(()).ok();
        };

        let (a, b, ()) = futures::join!(first, second, release);
        let (a, b) = (a.unwrap(), b.unwrap());

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.frame_count(), 5);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.pending_count(), 0);
    }

    #[tokio::test]
    async fn failed_load_is_not_cached() {
        let cache = BufferCache::new();

        let err = cache
            .get_or_load("d.ogg", || {
                Box::pin(async {
                    Err(PlaybackError::DecodeError {
                        url: "d.ogg".into(),
                        message: "garbage".into(),
                    })
                })
            })
            .await
            .unwrap_err();

        assert!(err.is_load_error());
        assert!(cache.is_empty());
        assert_eq!(cache.pending_count(), 0);

        let retried = cache
            .get_or_load("d.ogg", || Box::pin(async { Ok(buffer(3)) }))
            .await;
        assert!(retried.is_ok());
    }

    #[test]
    fn urls_are_sorted() {
        let cache = BufferCache::new();
        cache.insert("b.ogg", buffer(1));
        cache.insert("a.ogg", buffer(1));
        assert_eq!(cache.urls(), vec!["a.ogg".to_string(), "b.ogg".to_string()]);
        assert_eq!(cache.member_count(), 0);
    }
}
