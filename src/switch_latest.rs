//! Flatten a stream of streams, keeping only the most recent inner stream.

use core::pin::Pin;
use core::task::{Context, Poll};

use futures::stream::{Stream, StreamExt};

/// Stream combinator behind [`ConcurrencyPolicy::SwitchLatest`](crate::ConcurrencyPolicy::SwitchLatest).
///
/// Whenever the outer stream yields a new inner stream, the previous inner
/// stream is dropped on the spot, cancelling whatever work it was suspended
/// on. A dropped inner stream never yields again.
pub struct SwitchLatest<S, U> {
    outer: Option<S>,
    inner: Option<U>,
}

impl<S, U> SwitchLatest<S, U>
where
    S: Stream<Item = U> + Unpin,
    U: Stream + Unpin,
{
    pub fn new(outer: S) -> Self {
        Self {
            outer: Some(outer),
            inner: None,
        }
    }
}

impl<S, U> Stream for SwitchLatest<S, U>
where
    S: Stream<Item = U> + Unpin,
    U: Stream + Unpin,
{
    type Item = U::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<U::Item>> {
        let this = self.get_mut();

        // Drain the outer stream first so only the newest inner stream survives.
        while let Some(outer) = this.outer.as_mut() {
            match outer.poll_next_unpin(cx) {
                Poll::Ready(Some(next)) => {
                    if this.inner.replace(next).is_some() {
                        tracing::trace!("cancelling in-flight work for a newer command");
                    }
                }
                Poll::Ready(None) => this.outer = None,
                Poll::Pending => break,
            }
        }

        if let Some(inner) = this.inner.as_mut() {
            match inner.poll_next_unpin(cx) {
                Poll::Ready(Some(item)) => return Poll::Ready(Some(item)),
                Poll::Ready(None) => this.inner = None,
                Poll::Pending => return Poll::Pending,
            }
        }

        if this.outer.is_none() && this.inner.is_none() {
            Poll::Ready(None)
        } else {
            Poll::Pending
        }
    }
}
