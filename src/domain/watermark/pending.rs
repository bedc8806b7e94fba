use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

/// Counter for sign-state disk writes still in flight.
///
/// `SignState::save` increments before handing serialized bytes to a writer
/// thread and decrements once the rename has landed. Callers must `wait`
/// before releasing a signature to the network: a signature externalized
/// ahead of its watermark can double-sign after a crash.
#[derive(Clone, Default)]
pub struct PendingWrites {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    count: Mutex<usize>,
    drained: Condvar,
}

impl PendingWrites {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&self) {
        *self.inner.count.lock() += 1;
    }

    pub(crate) fn done(&self) {
        let mut count = self.inner.count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.inner.drained.notify_all();
        }
    }

    /// Blocks until every pending write has reached disk.
    pub fn wait(&self) {
        let mut count = self.inner.count.lock();
        while *count > 0 {
            self.inner.drained.wait(&mut count);
        }
    }
}
