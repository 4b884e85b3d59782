//! Shift status cache
//!
//! Read-through cache over the state machine's store, owned by the boundary.
//! It is never a source of truth: lifecycle transitions read the database
//! directly and invalidate this cache after mutating.

use shared::models::ShiftStatus;
use std::sync::Mutex;

/// Millisecond clock, injectable for tests
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall-clock time
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        shared::util::now_millis()
    }
}

struct Slot {
    cached_at: i64,
    status: ShiftStatus,
}

/// TTL cache holding the latest known shift status
pub struct ShiftStatusCache {
    ttl_ms: i64,
    clock: Box<dyn Clock>,
    slot: Mutex<Option<Slot>>,
}

impl ShiftStatusCache {
    pub fn new(ttl_ms: i64) -> Self {
        Self::with_clock(ttl_ms, Box::new(SystemClock))
    }

    pub fn with_clock(ttl_ms: i64, clock: Box<dyn Clock>) -> Self {
        Self {
            ttl_ms,
            clock,
            slot: Mutex::new(None),
        }
    }

    /// The cached status, if still fresh
    pub fn get(&self) -> Option<ShiftStatus> {
        let guard = self.slot.lock().unwrap_or_else(|p| p.into_inner());
        let slot = guard.as_ref()?;
        let age = self.clock.now_millis() - slot.cached_at;
        if age < self.ttl_ms {
            Some(slot.status.clone())
        } else {
            None
        }
    }

    /// Store a freshly-read status
    pub fn put(&self, status: ShiftStatus) {
        let mut guard = self.slot.lock().unwrap_or_else(|p| p.into_inner());
        *guard = Some(Slot {
            cached_at: self.clock.now_millis(),
            status,
        });
    }

    /// Drop the cached value; called after every lifecycle transition
    pub fn invalidate(&self) {
        let mut guard = self.slot.lock().unwrap_or_else(|p| p.into_inner());
        *guard = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;

    struct ManualClock(Arc<AtomicI64>);

    impl Clock for ManualClock {
        fn now_millis(&self) -> i64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn entries_expire_after_ttl() {
        let now = Arc::new(AtomicI64::new(1_000));
        let cache = ShiftStatusCache::with_clock(60_000, Box::new(ManualClock(now.clone())));

        cache.put(ShiftStatus::closed());
        assert!(cache.get().is_some());

        now.store(60_999, Ordering::SeqCst);
        assert!(cache.get().is_some());

        now.store(61_001, Ordering::SeqCst);
        assert!(cache.get().is_none());
    }

    #[test]
    fn invalidate_drops_the_slot() {
        let cache = ShiftStatusCache::new(60_000);
        cache.put(ShiftStatus::closed());
        cache.invalidate();
        assert!(cache.get().is_none());
    }
}
