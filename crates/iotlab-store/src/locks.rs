//! ---
//! iotlab_section: "03-persistence-logging"
//! iotlab_subsection: "module"
//! iotlab_type: "source"
//! iotlab_scope: "code"
//! iotlab_description: "Per-resource write serialisation."
//! iotlab_version: "v0.0.0-prealpha"
//! iotlab_owner: "tbd"
//! ---
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::key::ResourceKey;

/// Table of per-key mutexes. Check-then-write sequences run inside
/// [`KeyLocks::with_lock`] so at most one writer touches a key at a time while
/// unrelated keys proceed in parallel.
#[derive(Debug, Default)]
pub struct KeyLocks {
    table: Mutex<HashMap<ResourceKey, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `key`.
    pub fn with_lock<T>(&self, key: &ResourceKey, f: impl FnOnce() -> T) -> T {
        let slot = {
            let mut table = self.table.lock();
            Arc::clone(table.entry(key.clone()).or_default())
        };
        let result = {
            let _guard = slot.lock();
            f()
        };
        self.release(key, slot);
        result
    }

    fn release(&self, key: &ResourceKey, slot: Arc<Mutex<()>>) {
        let mut table = self.table.lock();
        // Only the table and this caller hold the slot: nobody is waiting on it.
        if Arc::strong_count(&slot) == 2 {
            table.remove(key);
        }
    }

    /// Number of keys currently tracked.
    pub fn tracked(&self) -> usize {
        self.table.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn serialises_writers_on_same_key() {
        let locks = Arc::new(KeyLocks::new());
        let key = ResourceKey::new(["temp01", "config.json"]).unwrap();
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let key = key.clone();
                let active = Arc::clone(&active);
                let max_seen = Arc::clone(&max_seen);
                thread::spawn(move || {
                    locks.with_lock(&key, || {
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(5));
                        active.fetch_sub(1, Ordering::SeqCst);
                    });
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(locks.tracked(), 0);
    }

    #[test]
    fn returns_closure_result() {
        let locks = KeyLocks::new();
        let key = ResourceKey::single("notes.txt").unwrap();
        assert_eq!(locks.with_lock(&key, || 7), 7);
        assert_eq!(locks.tracked(), 0);
    }
}
