//! Voice allocation with debounced release.
//!
//! Both the synthesis and presentation engines use the same pool discipline:
//! an entity is created the first time a note number is seen, kept alive as
//! long as events keep arriving for it, and torn down once its release
//! deadline passes with no refresh. Re-arming the deadline on every upsert is
//! the only cancellation mechanism (last-write-wins debounce, no queueing).
//!
//! Time is passed in explicitly so the lifecycle is driven entirely by the
//! caller's tick, which also makes the timing rules testable without sleeping.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// One pooled entity plus its release deadline.
#[derive(Debug)]
struct Slot<T> {
    entity: T,
    release_at: Instant,
}

/// A pool of entities keyed by MIDI note number, each with an independent
/// debounced release deadline.
#[derive(Debug)]
pub struct VoicePool<T> {
    slots: HashMap<u8, Slot<T>>,
    timeout: Duration,
}

impl<T> VoicePool<T> {
    /// Creates an empty pool whose entries expire `timeout` after their
    /// last upsert.
    pub fn new(timeout: Duration) -> Self {
        Self {
            slots: HashMap::new(),
            timeout,
        }
    }

    /// Inserts or refreshes the entity for `key`.
    ///
    /// If no entity exists, `create` is called to construct one; an existing
    /// entity keeps its identity and resources untouched. Either way the
    /// release deadline is re-armed to `now + timeout`, replacing any
    /// previously scheduled release for this key.
    pub fn upsert(&mut self, key: u8, now: Instant, create: impl FnOnce() -> T) -> &mut T {
        let timeout = self.timeout;
        let slot = self.slots.entry(key).or_insert_with(|| Slot {
            entity: create(),
            release_at: now + timeout,
        });
        slot.release_at = now + timeout;
        &mut slot.entity
    }

    /// Removes every entry whose deadline has passed and returns them so the
    /// caller can release backing resources.
    pub fn sweep(&mut self, now: Instant) -> Vec<(u8, T)> {
        let expired: Vec<u8> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.release_at <= now)
            .map(|(&key, _)| key)
            .collect();

        expired
            .into_iter()
            .filter_map(|key| self.slots.remove(&key).map(|slot| (key, slot.entity)))
            .collect()
    }

    /// Returns the entity for `key`, if one is sounding.
    pub fn get(&self, key: u8) -> Option<&T> {
        self.slots.get(&key).map(|slot| &slot.entity)
    }

    /// True if an entity exists for `key`.
    pub fn contains(&self, key: u8) -> bool {
        self.slots.contains_key(&key)
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when no entities are live.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterates over live entities in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &T)> {
        self.slots.iter().map(|(&key, slot)| (key, &slot.entity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mpe::RELEASE_TIMEOUT;
    use std::time::Duration;

    #[test]
    fn test_upsert_is_idempotent() {
        let mut pool: VoicePool<u32> = VoicePool::new(RELEASE_TIMEOUT);
        let t0 = Instant::now();

        assert_eq!(*pool.upsert(60, t0, || 7), 7);
        // Second upsert must not re-create: the original entity survives.
        assert_eq!(*pool.upsert(60, t0, || 99), 7);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_refresh_rearms_deadline() {
        let mut pool: VoicePool<()> = VoicePool::new(RELEASE_TIMEOUT);
        let t0 = Instant::now();

        pool.upsert(60, t0, || ());
        pool.upsert(60, t0 + Duration::from_millis(50), || ());

        // The refresh at t0+50 pushed the deadline to t0+150, so the entry
        // survives a sweep at t0+100.
        assert!(pool.sweep(t0 + Duration::from_millis(100)).is_empty());
        assert!(pool.contains(60));

        // With no further refresh it is gone by t0+200.
        let expired = pool.sweep(t0 + Duration::from_millis(200));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].0, 60);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_sweep_only_reaps_expired_keys() {
        let mut pool: VoicePool<()> = VoicePool::new(RELEASE_TIMEOUT);
        let t0 = Instant::now();

        pool.upsert(60, t0, || ());
        pool.upsert(64, t0 + Duration::from_millis(80), || ());

        let expired = pool.sweep(t0 + Duration::from_millis(110));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].0, 60);
        assert!(pool.contains(64));
    }

    #[test]
    fn test_continuous_refresh_keeps_entity_alive() {
        let mut pool: VoicePool<u32> = VoicePool::new(RELEASE_TIMEOUT);
        let t0 = Instant::now();

        pool.upsert(60, t0, || 1);
        // Refresh every 50ms for a second, sweeping in between.
        for step in 1..=20u64 {
            let now = t0 + Duration::from_millis(step * 50);
            assert!(pool.sweep(now).is_empty());
            pool.upsert(60, now, || 2);
        }
        // Still the original entity.
        assert_eq!(pool.get(60), Some(&1));

        let last = t0 + Duration::from_millis(1000);
        let expired = pool.sweep(last + Duration::from_millis(100));
        assert_eq!(expired, vec![(60, 1)]);
    }
}
