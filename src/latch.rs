//! Single-fire gate used for the first-subscriber barriers.

use core::sync::atomic::{AtomicUsize, Ordering};

use spin::Mutex;

/// Opens once `count` calls to [`count_down`](Self::count_down) have been made.
///
/// Never resets. Waiters park on a channel nobody sends on; opening drops the
/// only sender, which disconnects the channel and wakes every waiter.
pub(crate) struct Latch {
    remaining: AtomicUsize,
    trigger: Mutex<Option<flume::Sender<()>>>,
    signal: flume::Receiver<()>,
}

impl Latch {
    pub(crate) fn new(count: usize) -> Self {
        let (trigger, signal) = flume::bounded(1);
        let latch = Self {
            remaining: AtomicUsize::new(count),
            trigger: Mutex::new(Some(trigger)),
            signal,
        };
        if count == 0 {
            latch.open();
        }
        latch
    }

    pub(crate) fn count_down(&self) {
        let previous = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        if previous == Ok(1) {
            self.open();
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        self.trigger.lock().is_none()
    }

    pub(crate) async fn wait(&self) {
        // Err means disconnected, i.e. open.
        while self.signal.recv_async().await.is_ok() {}
    }

    fn open(&self) {
        self.trigger.lock().take();
    }
}
