//! Event dispatch handle.

use core::marker::PhantomData;

use flume::{Sender, TrySendError};

use crate::StoreError;

/// Feeds events into a store's event bus from any thread.
///
/// Clone this handle to hand dispatch capability to UI callbacks. It only
/// accepts `Ui` events, the subset of events callers are allowed to dispatch
/// directly; handler-produced events travel through the store itself.
///
/// Dispatching never waits for the event loop. Events dispatched before the
/// store is launched are queued and processed, in order, once it is.
pub struct Dispatcher<Ui, Event> {
    sender: Sender<Event>,
    store: &'static str,
    _ui: PhantomData<fn(Ui)>,
}

impl<Ui, Event> Clone for Dispatcher<Ui, Event> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            store: self.store,
            _ui: PhantomData,
        }
    }
}

impl<Ui, Event> Dispatcher<Ui, Event>
where
    Ui: Into<Event>,
{
    pub(crate) fn new(sender: Sender<Event>, store: &'static str) -> Self {
        Self {
            sender,
            store,
            _ui: PhantomData,
        }
    }

    /// Queue an event for processing.
    ///
    /// # Errors
    ///
    /// [`StoreError::DispatchOverflow`] if a bounded event bus is full and
    /// [`StoreError::Closed`] if the event loop's scope has ended. The event
    /// is not queued in either case.
    pub fn dispatch(&self, event: Ui) -> Result<(), StoreError> {
        self.sender.try_send(event.into()).map_err(|error| {
            let error = match error {
                TrySendError::Full(_) => StoreError::DispatchOverflow,
                TrySendError::Disconnected(_) => StoreError::Closed,
            };
            tracing::error!(store = self.store, "{error}");
            error
        })
    }
}
