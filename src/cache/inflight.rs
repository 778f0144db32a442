use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

type Gates = Arc<DashMap<String, Arc<Gate>>>;

/// Per-key async gates serializing concurrent cache misses.
///
/// A caller holding the gate for a key is the only one refreshing it; others
/// wait on the same gate and must re-check the cache once they get through.
/// A gate leaves the map once its last holder or waiter is gone, including
/// waiters whose future was dropped before they got the lock.
#[derive(Default, Clone)]
pub struct InFlightFetches {
    gates: Gates,
}

#[derive(Default)]
struct Gate {
    lock: Arc<Mutex<()>>,
    users: AtomicUsize,
}

impl InFlightFetches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    pub async fn acquire(&self, key: &str) -> FetchGuard {
        let gate = {
            // The entry guard holds the shard lock, so a concurrent release
            // cannot remove the gate between lookup and registration.
            let entry = self.gates.entry(key.to_string()).or_default();
            entry.users.fetch_add(1, Ordering::SeqCst);
            Arc::clone(entry.value())
        };
        let user = GateUser {
            key: key.to_string(),
            gate,
            gates: Arc::clone(&self.gates),
        };

        let lock = Arc::clone(&user.gate.lock).lock_owned().await;
        FetchGuard {
            _lock: lock,
            _user: user,
        }
    }

    /// Number of keys with a live gate.
    pub fn len(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }
}

/// Exclusive access to one key; released on drop.
pub struct FetchGuard {
    _lock: OwnedMutexGuard<()>,
    _user: GateUser,
}

/// Registration of one holder or waiter on a gate.
struct GateUser {
    key: String,
    gate: Arc<Gate>,
    gates: Gates,
}

impl Drop for GateUser {
    fn drop(&mut self) {
        self.gate.users.fetch_sub(1, Ordering::SeqCst);
        self.gates.remove_if(&self.key, |_, gate| {
            Arc::ptr_eq(gate, &self.gate) && gate.users.load(Ordering::SeqCst) == 0
        });
    }
}
