//! Fan-out channel used for the command bus and the effect bus.

use core::pin::Pin;
use core::task::{Context, Poll};

use futures::stream::{BoxStream, Stream, StreamExt};
use spin::Mutex;

use crate::latch::Latch;

/// Delivers every published value to every subscriber attached at the time
/// of publication.
///
/// Each subscriber owns an unbounded queue, so publishing never waits on a
/// slow subscriber. Nothing is replayed: a subscriber only sees values
/// published after it subscribed. Dropped subscribers are pruned on the next
/// publish.
pub(crate) struct Broadcast<T> {
    subscribers: Mutex<Vec<flume::Sender<T>>>,
    subscribed: Latch,
}

impl<T: Clone + Send + 'static> Broadcast<T> {
    /// `expected_subscribers` is how many subscriptions it takes to open the
    /// gate returned by [`subscribed`](Self::subscribed).
    pub(crate) fn new(expected_subscribers: usize) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            subscribed: Latch::new(expected_subscribers),
        }
    }

    pub(crate) fn subscribe(&self) -> Subscription<T> {
        let (sender, receiver) = flume::unbounded();
        self.subscribers.lock().push(sender);
        self.subscribed.count_down();
        Subscription {
            inner: receiver.into_stream().boxed(),
        }
    }

    /// Returns how many subscribers the value was delivered to.
    pub(crate) fn publish(&self, value: T) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|subscriber| subscriber.send(value.clone()).is_ok());
        subscribers.len()
    }

    pub(crate) fn subscribed(&self) -> &Latch {
        &self.subscribed
    }
}

/// A live attachment to a command or effect bus.
///
/// Yields values published while attached. Dropping it detaches.
pub struct Subscription<T> {
    inner: BoxStream<'static, T>,
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.inner.poll_next_unpin(cx)
    }
}
