//! # Caches
//!
//! Two in-memory caches owned by the signal service:
//!
//! - [`TtlCache`]: keyed entries with an absolute expiry and a size bound.
//!   Expired entries are evicted lazily on read and by an explicit [`TtlCache::sweep`].
//! - [`ResponseCache`]: one payload plus the time it was stored.
//!
//! Both take `now` as an argument so tests can drive time explicitly.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub expires_at: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Bounded map with per-entry TTL.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: chrono::Duration,
    capacity: usize,
    entries: HashMap<K, CacheEntry<V>>,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36_500)),
            capacity: capacity.max(1),
            entries: HashMap::new(),
        }
    }

    /// Live value for `key`; an expired entry is removed and reported as a miss.
    pub fn get(&mut self, key: &K, now: DateTime<Utc>) -> Option<V> {
        match self.entries.get(key) {
            Some(e) if !e.is_expired(now) => Some(e.value.clone()),
            Some(_) => {
                self.entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store `value` unless a live entry already exists (first writer wins).
    /// Returns whether the value was stored.
    pub fn insert(&mut self, key: K, value: V, now: DateTime<Utc>) -> bool {
        if let Some(e) = self.entries.get(&key) {
            if !e.is_expired(now) {
                return false;
            }
        }
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.make_room(now);
        }
        self.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: now
                    .checked_add_signed(self.ttl)
                    .unwrap_or(DateTime::<Utc>::MAX_UTC),
            },
        );
        true
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_expired(now));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn make_room(&mut self, now: DateTime<Utc>) {
        if self.sweep(now) > 0 {
            return;
        }
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.expires_at)
            .map(|(k, _)| k.clone());
        if let Some(k) = oldest {
            self.entries.remove(&k);
        }
    }
}

/// Single-slot payload cache with a TTL; a zero TTL disables it.
#[derive(Debug)]
pub struct ResponseCache<T> {
    ttl: Duration,
    slot: Option<(DateTime<Utc>, T)>,
}

impl<T: Clone> ResponseCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, slot: None }
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    /// Cached payload if it was stored less than `ttl` ago and `force` is off.
    pub fn get(&self, now: DateTime<Utc>, force: bool) -> Option<T> {
        if force || !self.is_enabled() {
            return None;
        }
        let (stored_at, payload) = self.slot.as_ref()?;
        let elapsed = (now - *stored_at).to_std().unwrap_or(Duration::ZERO);
        (elapsed < self.ttl).then(|| payload.clone())
    }

    pub fn put(&mut self, now: DateTime<Utc>, payload: T) {
        if self.is_enabled() {
            self.slot = Some((now, payload));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn secs(n: i64) -> chrono::Duration {
        chrono::Duration::seconds(n)
    }

    #[test]
    fn entry_expires_lazily_on_read() {
        let mut c: TtlCache<String, i32> = TtlCache::new(Duration::from_secs(60), 10);
        assert!(c.insert("a".into(), 1, t0()));
        assert_eq!(c.get(&"a".into(), t0() + secs(59)), Some(1));
        assert_eq!(c.get(&"a".into(), t0() + secs(60)), None);
        assert!(c.is_empty(), "expired entry is evicted on read");
    }

    #[test]
    fn first_writer_wins_until_expiry() {
        let mut c: TtlCache<&str, i32> = TtlCache::new(Duration::from_secs(60), 10);
        assert!(c.insert("a", 1, t0()));
        assert!(!c.insert("a", 2, t0() + secs(10)));
        assert_eq!(c.get(&"a", t0() + secs(10)), Some(1));
        assert!(c.insert("a", 3, t0() + secs(61)));
        assert_eq!(c.get(&"a", t0() + secs(62)), Some(3));
    }

    #[test]
    fn sweep_removes_only_expired() {
        let mut c: TtlCache<&str, i32> = TtlCache::new(Duration::from_secs(60), 10);
        c.insert("old", 1, t0());
        c.insert("new", 2, t0() + secs(30));
        assert_eq!(c.sweep(t0() + secs(70)), 1);
        assert_eq!(c.len(), 1);
        assert_eq!(c.get(&"new", t0() + secs(70)), Some(2));
    }

    #[test]
    fn capacity_evicts_soonest_to_expire() {
        let mut c: TtlCache<&str, i32> = TtlCache::new(Duration::from_secs(60), 2);
        c.insert("a", 1, t0());
        c.insert("b", 2, t0() + secs(1));
        c.insert("c", 3, t0() + secs(2));
        assert_eq!(c.len(), 2);
        assert_eq!(c.get(&"a", t0() + secs(2)), None);
        assert_eq!(c.get(&"b", t0() + secs(2)), Some(2));
        assert_eq!(c.get(&"c", t0() + secs(2)), Some(3));
    }

    #[test]
    fn huge_ttl_saturates_instead_of_overflowing() {
        let mut c: TtlCache<&str, i32> = TtlCache::new(Duration::from_secs(u64::MAX), 4);
        let late = DateTime::<Utc>::MAX_UTC - secs(10);
        assert!(c.insert("a", 1, late));
        assert_eq!(c.get(&"a", late + secs(5)), Some(1));
        assert!(c.insert("b", 2, t0()));
        assert_eq!(c.get(&"b", t0() + chrono::Duration::days(3650)), Some(2));
    }

    #[test]
    fn response_cache_hit_within_ttl_only() {
        let mut rc = ResponseCache::new(Duration::from_secs(45));
        assert_eq!(rc.get(t0(), false), None);
        rc.put(t0(), "payload");
        assert_eq!(rc.get(t0() + secs(44), false), Some("payload"));
        assert_eq!(rc.get(t0() + secs(45), false), None);
    }

    #[test]
    fn response_cache_force_bypasses() {
        let mut rc = ResponseCache::new(Duration::from_secs(45));
        rc.put(t0(), 7);
        assert_eq!(rc.get(t0() + secs(1), true), None);
        assert_eq!(rc.get(t0() + secs(1), false), Some(7));
    }

    #[test]
    fn zero_ttl_disables() {
        let mut rc = ResponseCache::new(Duration::ZERO);
        rc.put(t0(), 7);
        assert!(!rc.is_enabled());
        assert_eq!(rc.get(t0(), false), None);
    }
}
