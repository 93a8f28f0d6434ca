use std::sync::{Arc, Mutex, MutexGuard};

use crate::pipeline::location_source::LocationSource;
use crate::shared::region::Region;

/// Cloneable handle to one stream processor.
///
/// All clones poll the same processor; ticks are serialized by the mutex,
/// so the processor state only ever has a single writer.
pub struct SharedLocationSource<P: LocationSource> {
    inner: Arc<Mutex<P>>,
}

impl<P: LocationSource> SharedLocationSource<P> {
    pub fn new(processor: P) -> Self {
        Self {
            inner: Arc::new(Mutex::new(processor)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, P> {
        // A panic mid-tick leaves the last published state, which is still
        // a consistent snapshot.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Runs `f` with exclusive access to the processor.
    pub fn with<R>(&self, f: impl FnOnce(&mut P) -> R) -> R {
        f(&mut self.lock())
    }
}

impl<P: LocationSource> Clone for SharedLocationSource<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: LocationSource> LocationSource for SharedLocationSource<P> {
    fn current_locations(&mut self) -> Vec<Region> {
        self.lock().current_locations()
    }

    fn current_image_size(&self) -> (u32, u32) {
        self.lock().current_image_size()
    }
}
