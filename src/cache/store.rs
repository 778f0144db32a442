//! Expiring in-memory stores.
//!
//! Both stores keep an absolute expiry next to each value. A value is served
//! only while `now < expires_at`; expired values stay in place until they are
//! overwritten. Nothing is ever evicted.

use std::{borrow::Borrow, collections::HashMap, hash::Hash, sync::RwLock};

use time::OffsetDateTime;

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// A value paired with the instant it stops being served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expiring<V> {
    pub value: V,
    pub expires_at: OffsetDateTime,
}

impl<V> Expiring<V> {
    pub fn new(value: V, expires_at: OffsetDateTime) -> Self {
        Self { value, expires_at }
    }

    pub fn is_fresh_at(&self, now: OffsetDateTime) -> bool {
        now < self.expires_at
    }
}

/// Single-value store, used for the access token.
pub struct ExpiringSlot<V> {
    slot: RwLock<Option<Expiring<V>>>,
}

impl<V: Clone> ExpiringSlot<V> {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    /// The stored value if it is still fresh at `now`.
    pub fn get_at(&self, now: OffsetDateTime) -> Option<V> {
        rw_read(&self.slot, SOURCE, "slot_get")
            .as_ref()
            .filter(|entry| entry.is_fresh_at(now))
            .map(|entry| entry.value.clone())
    }

    /// The stored entry regardless of freshness.
    pub fn peek(&self) -> Option<Expiring<V>> {
        rw_read(&self.slot, SOURCE, "slot_peek").clone()
    }

    pub fn set(&self, value: V, expires_at: OffsetDateTime) {
        *rw_write(&self.slot, SOURCE, "slot_set") = Some(Expiring::new(value, expires_at));
    }
}

impl<V: Clone> Default for ExpiringSlot<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Keyed store, used for shaped products.
pub struct ExpiringMap<K, V> {
    entries: RwLock<HashMap<K, Expiring<V>>>,
}

impl<K, V> ExpiringMap<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// The value stored under `key` if it is still fresh at `now`.
    pub fn get_at<Q>(&self, key: &Q, now: OffsetDateTime) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        rw_read(&self.entries, SOURCE, "map_get")
            .get(key)
            .filter(|entry| entry.is_fresh_at(now))
            .map(|entry| entry.value.clone())
    }

    /// The entry stored under `key` regardless of freshness.
    pub fn peek<Q>(&self, key: &Q) -> Option<Expiring<V>>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        rw_read(&self.entries, SOURCE, "map_peek").get(key).cloned()
    }

    /// Store `value` under `key`, replacing any previous entry whole.
    pub fn insert(&self, key: K, value: V, expires_at: OffsetDateTime) {
        rw_write(&self.entries, SOURCE, "map_insert").insert(key, Expiring::new(value, expires_at));
    }

    /// Number of entries, stale ones included.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "map_len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Default for ExpiringMap<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use time::{Duration, macros::datetime};

    use super::*;

    #[test]
    fn slot_serves_until_strictly_before_expiry() {
        let now = datetime!(2024-05-01 12:00 UTC);
        let slot = ExpiringSlot::new();
        assert!(slot.get_at(now).is_none());

        slot.set("token-a".to_string(), now + Duration::seconds(60));

        assert_eq!(slot.get_at(now).as_deref(), Some("token-a"));
        assert_eq!(
            slot.get_at(now + Duration::seconds(59)).as_deref(),
            Some("token-a")
        );
        assert!(slot.get_at(now + Duration::seconds(60)).is_none());
    }

    #[test]
    fn stale_slot_entry_is_kept_until_overwritten() {
        let now = datetime!(2024-05-01 12:00 UTC);
        let slot = ExpiringSlot::new();
        slot.set("old".to_string(), now);

        assert!(slot.get_at(now).is_none());
        assert_eq!(slot.peek().map(|entry| entry.value).as_deref(), Some("old"));

        slot.set("new".to_string(), now + Duration::hours(1));
        assert_eq!(slot.get_at(now).as_deref(), Some("new"));
    }

    #[test]
    fn map_entries_expire_independently() {
        let now = datetime!(2024-05-01 12:00 UTC);
        let map: ExpiringMap<String, u32> = ExpiringMap::new();

        map.insert("short".to_string(), 1, now + Duration::seconds(1));
        map.insert("long".to_string(), 2, now + Duration::hours(24));

        let later = now + Duration::seconds(5);
        assert!(map.get_at("short", later).is_none());
        assert_eq!(map.get_at("long", later), Some(2));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn map_insert_replaces_whole_entry() {
        let now = datetime!(2024-05-01 12:00 UTC);
        let map: ExpiringMap<String, u32> = ExpiringMap::new();

        map.insert("P1".to_string(), 1, now);
        map.insert("P1".to_string(), 7, now + Duration::minutes(5));

        let entry = map.peek("P1").expect("entry");
        assert_eq!(entry.value, 7);
        assert_eq!(entry.expires_at, now + Duration::minutes(5));
        assert_eq!(map.len(), 1);
    }
}
