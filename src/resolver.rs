//! Coalescing Resolver: single-flight registries guaranteeing
//! at-most-one in-flight translation per key, fanning the result out to every
//! waiter.
//!
//! Mapped onto a single-threaded Tokio runtime: the registry is a `tokio::sync::Mutex`-guarded map from key to a
//! list of `oneshot` senders, exactly the shape the design notes describe
//! ("a mapping from key to a list of completion handles... guarded by a
//! mutex; waiters are notified under it").

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use tokio::sync::{oneshot, Mutex};

use crate::cache::{Cache, RawStore};
use crate::cid::Cid;
use crate::error::Error;
use crate::oid::Oid;

/// an error shared across every waiter fanned out from one failed
/// translation; `Error` itself is not `Clone` (it wraps `std::io::Error`
/// among others), so the coalescing layer clones an `Arc` instead.
pub type SharedError = Arc<Error>;

/// generic single-flight registry keyed by `K`, resolving to `V`.
pub struct CoalescingResolver<K, V> {
    inflight: Mutex<HashMap<K, Vec<oneshot::Sender<Result<V, SharedError>>>>>,
}

impl<K, V> Default for CoalescingResolver<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self {
            inflight: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> CoalescingResolver<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// resolve `key`, running `start` at most once no matter how many
    /// concurrent callers ask for the same key.
    ///
    /// if cancelled (the returned future dropped) while a translation is the
    /// one still running, the translation itself keeps running to
    /// completion and still populates the cache/IPFS; only this particular waiter stops waiting.
    pub async fn resolve<F, Fut>(&self, key: K, start: F) -> Result<V, SharedError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, Error>>,
    {
        enum Role<V> {
            Leader,
            Follower(oneshot::Receiver<Result<V, SharedError>>),
        }

        let role = {
            let mut guard = self.inflight.lock().await;
            if let Some(waiters) = guard.get_mut(&key) {
                let (tx, rx) = oneshot::channel();
                waiters.push(tx);
                Role::Follower(rx)
            } else {
                guard.insert(key.clone(), Vec::new());
                Role::Leader
            }
        };

        match role {
            Role::Leader => {
                let result = start().await.map_err(Arc::new);
                let waiters = {
                    let mut guard = self.inflight.lock().await;
                    guard.remove(&key).unwrap_or_default()
                };
                for tx in waiters {
                    // a dropped receiver (cancelled waiter) is not an error
                    // for the leader; it just means nobody collects that copy.
                    let _ = tx.send(result.clone());
                }
                result
            }
            Role::Follower(rx) => rx.await.unwrap_or_else(|_| Err(Arc::new(Error::Cancelled))),
        }
    }
}

/// push-side resolver: coalesces concurrent `pushCommit`/`pushTree`
/// translations of the same [`Oid`] into a single [`Cid`].
pub type PushResolver = CoalescingResolver<Oid, Cid>;

/// fetch-side resolver: coalesces concurrent `fetchCommit`/`fetchTree`
/// translations of the same [`Cid`] into a single [`Oid`].
pub type FetchResolver = CoalescingResolver<Cid, Oid>;

impl FetchResolver {
    /// `resolveFetch(cid) -> OID`, consulting the cache before registering a
    /// waiter: if `cid -> oid` exists, the result is returned synchronously.
    pub async fn resolve_fetch<S, F, Fut>(
        &self,
        cache: &Cache<S>,
        cid: Cid,
        start: F,
    ) -> Result<Oid, SharedError>
    where
        S: RawStore,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Oid, Error>>,
    {
        if let Some(oid) = cache.get_oid_for_cid(&cid).map_err(Arc::new)? {
            return Ok(oid);
        }
        self.resolve(cid, start).await
    }
}
