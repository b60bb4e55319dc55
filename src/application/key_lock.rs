use crate::domain::request::IdempotencyKey;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-key async locks so only one orchestration per key runs at a time.
///
/// Entries are dropped once nobody holds or waits on them, including waiters
/// that were cancelled before they got the lock.
#[derive(Debug, Default)]
pub struct KeyLocks {
    locks: DashMap<IdempotencyKey, Slot>,
}

#[derive(Debug, Default)]
struct Slot {
    lock: Arc<Mutex<()>>,
    /// Holders plus waiters. Only changed under the map's shard lock.
    users: usize,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other holder of `key` remains.
    pub async fn acquire(&self, key: &IdempotencyKey) -> KeyGuard<'_> {
        let lock = {
            let mut slot = self.locks.entry(key.clone()).or_default();
            slot.users += 1;
            slot.lock.clone()
        };
        // Registered before the await so a dropped waiter still checks out.
        let registration = Registration {
            locks: self,
            key: key.clone(),
        };
        let guard = lock.lock_owned().await;
        KeyGuard {
            _guard: guard,
            _registration: registration,
        }
    }

    /// Number of keys currently locked or awaited.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

struct Registration<'a> {
    locks: &'a KeyLocks,
    key: IdempotencyKey,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.locks.locks.remove_if_mut(&self.key, |_, slot| {
            slot.users -= 1;
            slot.users == 0
        });
    }
}

/// Holds the lock for one key. Fields drop in order: unlock, then check out.
pub struct KeyGuard<'a> {
    _guard: OwnedMutexGuard<()>,
    _registration: Registration<'a>,
}
