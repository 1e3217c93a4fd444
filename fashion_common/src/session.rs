//! Expiring key/value store for two-phase interactions.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use uuid::Uuid;

struct Entry<T> {
    value: T,
    created: Instant,
}

/// Values keyed by a random session id, dropped once older than the TTL.
///
/// At most `capacity` entries are held; inserting into a full store evicts
/// expired entries first, then the oldest one.
pub struct SessionStore<T> {
    ttl: Duration,
    capacity: usize,
    entries: Mutex<HashMap<Uuid, Entry<T>>>,
}

impl<T> SessionStore<T> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, usize::MAX)
    }

    pub fn with_capacity(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Entry<T>>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_expired(&self, entry: &Entry<T>) -> bool {
        entry.created.elapsed() >= self.ttl
    }

    /// Stores `value` under a fresh session id.
    pub fn insert(&self, value: T) -> Uuid {
        let id = Uuid::new_v4();
        let mut entries = self.lock();
        if entries.len() >= self.capacity {
            let ttl = self.ttl;
            entries.retain(|_, entry| entry.created.elapsed() < ttl);
        }
        if entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.created)
                .map(|(id, _)| *id);
            if let Some(oldest) = oldest {
                log::debug!("Session store full, evicting {oldest}");
                entries.remove(&oldest);
            }
        }
        entries.insert(
            id,
            Entry {
                value,
                created: Instant::now(),
            },
        );
        id
    }

    /// Removes and returns the value, or `None` if unknown or expired.
    pub fn take(&self, id: &Uuid) -> Option<T> {
        let entry = self.lock().remove(id)?;
        if self.is_expired(&entry) {
            log::debug!("Session {id} expired");
            return None;
        }
        Some(entry.value)
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.created.elapsed() < ttl);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_removes_value() {
        let store = SessionStore::new(Duration::from_secs(60));
        let id = store.insert(vec![1, 2, 3]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.take(&id), Some(vec![1, 2, 3]));
        assert_eq!(store.take(&id), None);
        assert!(store.is_empty());
    }

    #[test]
    fn unknown_id_is_none() {
        let store: SessionStore<u8> = SessionStore::new(Duration::from_secs(60));
        assert_eq!(store.take(&Uuid::new_v4()), None);
    }

    #[test]
    fn expired_entries_are_not_returned() {
        let store = SessionStore::new(Duration::ZERO);
        let id = store.insert("pending");
        assert_eq!(store.take(&id), None);
    }

    #[test]
    fn full_store_evicts_oldest() {
        let store = SessionStore::with_capacity(Duration::from_secs(60), 2);
        let first = store.insert('a');
        std::thread::sleep(Duration::from_millis(2));
        let second = store.insert('b');
        std::thread::sleep(Duration::from_millis(2));
        let third = store.insert('c');

        assert_eq!(store.len(), 2);
        assert_eq!(store.take(&first), None);
        assert_eq!(store.take(&second), Some('b'));
        assert_eq!(store.take(&third), Some('c'));
        assert_eq!(store.ttl(), Duration::from_secs(60));
    }

    #[test]
    fn purge_drops_expired() {
        let expired = SessionStore::new(Duration::ZERO);
        expired.insert(1);
        expired.insert(2);
        assert_eq!(expired.purge_expired(), 2);
        assert!(expired.is_empty());

        let live = SessionStore::new(Duration::from_secs(60));
        live.insert(1);
        assert_eq!(live.purge_expired(), 0);
        assert_eq!(live.len(), 1);
    }
}
