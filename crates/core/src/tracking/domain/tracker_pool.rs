use crate::shared::config::ConfigError;
use crate::shared::frame::Frame;
use crate::shared::region::Region;
use crate::tracking::domain::region_tracker::{RegionTracker, TrackerFactory};

/// One entry of the pool. A slot is only reassigned while inactive.
pub struct TrackerSlot {
    tracker: Box<dyn RegionTracker>,
    age: usize,
    active: bool,
}

impl TrackerSlot {
    /// Frames since the slot was last seeded from a detection.
    pub fn age(&self) -> usize {
        self.age
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn region(&self) -> Option<Region> {
        self.active.then(|| self.tracker.position())
    }
}

/// Fixed-capacity set of single-object trackers.
///
/// Trackers drift, so each slot is retired once it has been extended
/// `tracking_time` frames past its last detection and must be re-seeded
/// from a fresh detection.
pub struct TrackerPool {
    slots: Vec<TrackerSlot>,
    tracking_time: usize,
}

impl TrackerPool {
    pub fn new(
        capacity: usize,
        tracking_time: usize,
        factory: &TrackerFactory,
    ) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroTrackerCapacity);
        }
        if tracking_time == 0 {
            return Err(ConfigError::ZeroTrackingTime);
        }
        let slots = (0..capacity)
            .map(|_| TrackerSlot {
                tracker: factory(),
                age: 0,
                active: false,
            })
            .collect();
        Ok(Self {
            slots,
            tracking_time,
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn tracking_time(&self) -> usize {
        self.tracking_time
    }

    pub fn slots(&self) -> &[TrackerSlot] {
        &self.slots
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.active).count()
    }

    pub fn has_vacancy(&self) -> bool {
        self.slots.iter().any(|s| !s.active)
    }

    /// Updates every active tracker against `frame`, ages it, and retires
    /// the slots that reached `tracking_time`.
    pub fn advance_all(&mut self, frame: &Frame) {
        for slot in self.slots.iter_mut().filter(|s| s.active) {
            slot.tracker.update(frame);
            slot.age += 1;
        }
        self.evict_stale();
    }

    /// Deactivates slots whose age reached `tracking_time`. Returns how many
    /// were retired.
    pub fn evict_stale(&mut self) -> usize {
        let mut evicted = 0;
        for slot in self.slots.iter_mut() {
            if slot.active && slot.age >= self.tracking_time {
                slot.active = false;
                evicted += 1;
            }
        }
        if evicted > 0 {
            log::debug!("retired {evicted} stale tracker(s)");
        }
        evicted
    }

    /// Starts inactive slots on `regions`, in order, skipping empty ones.
    ///
    /// Regions beyond the number of free slots are dropped. Returns the
    /// number of slots seeded.
    pub fn seed_available(&mut self, frame: &Frame, regions: &[Region]) -> usize {
        let mut free = self.slots.iter_mut().filter(|s| !s.active);
        let mut seeded = 0;
        for region in regions.iter().filter(|r| !r.is_empty()) {
            let Some(slot) = free.next() else {
                break;
            };
            slot.tracker.start(frame, *region);
            slot.age = 0;
            slot.active = true;
            seeded += 1;
        }
        seeded
    }

    /// Current regions of all active slots, in slot order.
    pub fn active_regions(&self) -> Vec<Region> {
        self.slots.iter().filter_map(TrackerSlot::region).collect()
    }

    /// Deactivates every slot.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.active = false;
            slot.age = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Holds its seed region and counts updates.
    struct FakeTracker {
        region: Region,
        updates: Arc<AtomicUsize>,
    }

    impl RegionTracker for FakeTracker {
        fn start(&mut self, _frame: &Frame, region: Region) {
            self.region = region;
        }

        fn update(&mut self, _frame: &Frame) {
            self.updates.fetch_add(1, Ordering::SeqCst);
        }

        fn position(&self) -> Region {
            self.region
        }
    }

    fn factory(updates: Arc<AtomicUsize>) -> TrackerFactory {
        Box::new(move || {
            Box::new(FakeTracker {
                region: Region::new(0, 0, 0, 0),
                updates: Arc::clone(&updates),
            })
        })
    }

    fn pool(capacity: usize, tracking_time: usize) -> TrackerPool {
        TrackerPool::new(capacity, tracking_time, &factory(Arc::default())).unwrap()
    }

    fn frame() -> Frame {
        Frame::new(vec![0u8; 10 * 10 * 3], 10, 10, 3, 0)
    }

    fn r(i: i32) -> Region {
        Region::new(i, i, i + 5, i + 5)
    }

    #[rstest]
    #[case(0, 10)]
    #[case(3, 0)]
    fn test_rejects_zero_sizes(#[case] capacity: usize, #[case] tracking_time: usize) {
        assert!(TrackerPool::new(capacity, tracking_time, &factory(Arc::default())).is_err());
    }

    #[test]
    fn test_new_pool_is_all_vacant() {
        let pool = pool(3, 10);
        assert_eq!(pool.capacity(), 3);
        assert_eq!(pool.active_count(), 0);
        assert!(pool.has_vacancy());
        assert!(pool.active_regions().is_empty());
    }

    #[test]
    fn test_seed_fills_free_slots_and_drops_overflow() {
        let mut pool = pool(2, 10);
        let seeded = pool.seed_available(&frame(), &[r(0), r(1), r(2)]);
        assert_eq!(seeded, 2);
        assert_eq!(pool.active_regions(), vec![r(0), r(1)]);
        assert!(!pool.has_vacancy());
        assert_eq!(pool.seed_available(&frame(), &[r(3)]), 0);
    }

    #[test]
    fn test_seed_skips_empty_regions() {
        let mut pool = pool(3, 10);
        let empty = Region::new(4, 4, 4, 9);
        let seeded = pool.seed_available(&frame(), &[empty, r(1)]);
        assert_eq!(seeded, 1);
        assert_eq!(pool.active_regions(), vec![r(1)]);
    }

    #[test]
    fn test_advance_updates_only_active_slots() {
        let updates = Arc::new(AtomicUsize::new(0));
        let mut pool = TrackerPool::new(3, 10, &factory(Arc::clone(&updates))).unwrap();
        pool.seed_available(&frame(), &[r(0)]);

        pool.advance_all(&frame());
        pool.advance_all(&frame());

        assert_eq!(updates.load(Ordering::SeqCst), 2);
        assert_eq!(pool.slots()[0].age(), 2);
        assert_eq!(pool.slots()[1].age(), 0);
    }

    #[test]
    fn test_slot_retires_after_tracking_time() {
        let mut pool = pool(1, 3);
        pool.seed_available(&frame(), &[r(0)]);

        pool.advance_all(&frame());
        pool.advance_all(&frame());
        assert_eq!(pool.active_count(), 1);

        pool.advance_all(&frame());
        assert_eq!(pool.active_count(), 0);
        assert!(pool.has_vacancy());
    }

    #[test]
    fn test_reseeding_resets_age() {
        let mut pool = pool(1, 3);
        pool.seed_available(&frame(), &[r(0)]);
        for _ in 0..3 {
            pool.advance_all(&frame());
        }
        pool.seed_available(&frame(), &[r(4)]);
        assert_eq!(pool.slots()[0].age(), 0);
        assert_eq!(pool.active_regions(), vec![r(4)]);
    }

    #[test]
    fn test_invariants_hold_over_many_cycles() {
        let capacity = 3;
        let tracking_time = 4;
        let mut pool = pool(capacity, tracking_time);
        for cycle in 0..50 {
            pool.advance_all(&frame());
            if cycle % 3 == 0 {
                pool.seed_available(&frame(), &[r(0), r(1), r(2), r(3)]);
            }
            assert!(pool.active_count() <= capacity);
            for slot in pool.slots().iter().filter(|s| s.is_active()) {
                assert!(slot.age() < tracking_time);
            }
        }
    }

    #[test]
    fn test_clear_deactivates_everything() {
        let mut pool = pool(2, 10);
        pool.seed_available(&frame(), &[r(0), r(1)]);
        pool.clear();
        assert_eq!(pool.active_count(), 0);
    }
}
