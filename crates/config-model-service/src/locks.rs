//! Keyed async locks
//!
//! Push and Delete hold the lock of the artifact file they touch for the
//! whole compile+register or unregister+remove unit. Keys are artifact file
//! names rather than identities, so two identities that derive the same file
//! also serialize. Entries are dropped as soon as nobody holds or waits on them.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Debug)]
struct Entry {
    mutex: Arc<AsyncMutex<()>>,
    /// Holders plus waiters
    users: usize,
}

type LockTable = Mutex<HashMap<String, Entry>>;

/// Table of per-artifact async mutexes
#[derive(Debug, Default, Clone)]
pub struct ArtifactLocks {
    table: Arc<LockTable>,
}

impl ArtifactLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`
    pub async fn acquire(&self, key: &str) -> ArtifactGuard {
        let (mutex, lease) = {
            let mut table = self.table.lock();
            let entry = table.entry(key.to_string()).or_insert_with(|| Entry {
                mutex: Arc::default(),
                users: 0,
            });
            entry.users += 1;
            let lease = Lease {
                key: key.to_string(),
                table: Arc::clone(&self.table),
            };
            (Arc::clone(&entry.mutex), lease)
        };

        // If this future is dropped while waiting, `lease` gives the slot back.
        let guard = mutex.lock_owned().await;
        ArtifactGuard {
            _guard: guard,
            lease,
        }
    }

    /// Number of keys currently held or awaited
    pub fn active(&self) -> usize {
        self.table.lock().len()
    }
}

/// One registered user of a table entry
#[derive(Debug)]
struct Lease {
    key: String,
    table: Arc<LockTable>,
}

impl Drop for Lease {
    fn drop(&mut self) {
        let mut table = self.table.lock();
        if let Some(entry) = table.get_mut(&self.key) {
            entry.users -= 1;
            if entry.users == 0 {
                table.remove(&self.key);
            }
        }
    }
}

/// Exclusive access to one artifact; released on drop
#[derive(Debug)]
pub struct ArtifactGuard {
    // Declared before `lease` so the mutex is unlocked first.
    _guard: OwnedMutexGuard<()>,
    lease: Lease,
}

impl ArtifactGuard {
    /// Key this guard holds
    pub fn key(&self) -> &str {
        &self.lease.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = ArtifactLocks::new();
        let inside = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let inside = Arc::clone(&inside);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire("foo-1.0.so").await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block() {
        let locks = ArtifactLocks::new();
        let _a = locks.acquire("a-1.so").await;
        let b = tokio::time::timeout(Duration::from_secs(1), locks.acquire("b-1.so")).await;
        assert!(b.is_ok());
        assert_eq!(locks.active(), 2);
    }

    #[tokio::test]
    async fn test_entry_removed_after_release() {
        let locks = ArtifactLocks::new();
        {
            let guard = locks.acquire("a-1.so").await;
            assert_eq!(guard.key(), "a-1.so");
            assert_eq!(locks.active(), 1);
        }
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_waiter_releases_entry() {
        let locks = ArtifactLocks::new();
        let holder = locks.acquire("a-1.so").await;

        let mut waiter = Box::pin(locks.acquire("a-1.so"));
        let waited = tokio::time::timeout(Duration::from_millis(5), &mut waiter).await;
        assert!(waited.is_err());

        // The holder leaves while the waiter is still registered, then the
        // waiter gives up before it is polled again.
        drop(holder);
        assert_eq!(locks.active(), 1);
        drop(waiter);
        assert_eq!(locks.active(), 0);
    }
}
