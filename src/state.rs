//! The state cell: latest-value holder with replay-on-subscribe.

use core::future::Future;
use core::pin::Pin;
use core::task::{ready, Context, Poll};
use std::sync::Arc;

use event_listener::{Event, EventListener};
use futures::Stream;
use spin::Mutex;

struct Slot<S> {
    value: S,
    version: u64,
}

/// Holds the current state of a store.
///
/// Replaced as a whole by the event loop, never mutated in place, and safe to
/// read from any thread.
pub(crate) struct StateCell<S> {
    slot: Mutex<Slot<S>>,
    changed: Event,
}

impl<S: Clone> StateCell<S> {
    pub(crate) fn new(value: S) -> Self {
        Self {
            slot: Mutex::new(Slot { value, version: 0 }),
            changed: Event::new(),
        }
    }

    pub(crate) fn get(&self) -> S {
        self.slot.lock().value.clone()
    }

    pub(crate) fn set(&self, value: S) {
        {
            let mut slot = self.slot.lock();
            slot.value = value;
            slot.version += 1;
        }
        self.changed.notify(usize::MAX);
    }

    pub(crate) fn subscribe(self: &Arc<Self>) -> StateStream<S> {
        StateStream {
            cell: self.clone(),
            seen: None,
            listener: None,
        }
    }
}

/// A continuous, always-current stream of states.
///
/// The first item is the state current at the time of subscribing. After
/// that the stream yields whenever the state is replaced. Several
/// replacements in quick succession may be observed as one, but the stream
/// always converges on the latest state. It never ends on its own.
pub struct StateStream<S> {
    cell: Arc<StateCell<S>>,
    seen: Option<u64>,
    listener: Option<EventListener>,
}

impl<S: Clone> Stream for StateStream<S> {
    type Item = S;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<S>> {
        let this = self.get_mut();
        loop {
            {
                let slot = this.cell.slot.lock();
                if this.seen != Some(slot.version) {
                    this.seen = Some(slot.version);
                    this.listener = None;
                    return Poll::Ready(Some(slot.value.clone()));
                }
            }
            match this.listener.as_mut() {
                // Re-check the version after registering so a concurrent
                // `set` can't slip between the check and the listen.
                None => this.listener = Some(this.cell.changed.listen()),
                Some(listener) => {
                    ready!(Pin::new(listener).poll(cx));
                    this.listener = None;
                }
            }
        }
    }
}

/// Read handle on a store's current state, for a persistence collaborator.
///
/// Cheap to clone and independent of the store's lifetime.
pub struct StateProvider<S> {
    cell: Arc<StateCell<S>>,
}

impl<S> Clone for StateProvider<S> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<S: Clone> StateProvider<S> {
    pub(crate) fn new(cell: Arc<StateCell<S>>) -> Self {
        Self { cell }
    }

    pub fn get(&self) -> S {
        self.cell.get()
    }
}

/// State that can be captured into and rebuilt from a persisted form.
///
/// The store never persists anything itself; see
/// [`StoreBuilder::restore_from`](crate::StoreBuilder::restore_from) and
/// [`Store::save_state`](crate::Store::save_state).
pub trait RestorableState: Sized {
    type Saved;

    fn save_state(&self) -> Self::Saved;

    /// Rebuild a state from `saved`, using `self` (the default initial state)
    /// for anything the snapshot doesn't cover.
    fn restore_state(&self, saved: Self::Saved) -> Self;
}
