//! Poison-tolerant lock access for the expiring caches.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

pub(crate) fn rw_read<'a, T>(
    lock: &'a RwLock<T>,
    target: &'static str,
    op: &'static str,
) -> RwLockReadGuard<'a, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(
                op,
                cache = target,
                lock_kind = "rwlock.read",
                result = "poisoned_recovered",
                hint = "a writer panicked; the stored entry keeps its own expiry",
                "recovered poisoned expiring-cache lock"
            );
            poisoned.into_inner()
        }
    }
}

pub(crate) fn rw_write<'a, T>(
    lock: &'a RwLock<T>,
    target: &'static str,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(
                op,
                cache = target,
                lock_kind = "rwlock.write",
                result = "poisoned_recovered",
                hint = "a writer panicked; the stored entry keeps its own expiry",
                "recovered poisoned expiring-cache lock"
            );
            poisoned.into_inner()
        }
    }
}
