//! Error types surfaced by the store and its command handlers.

use thiserror::Error;

/// Boxed error produced by a command handler while processing a command.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Contract violations reported by the [`Store`](crate::Store).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// [`Store::launch`](crate::Store::launch) was called on a store that is already running.
    #[error("the store has already been launched")]
    AlreadyLaunched,

    /// The event bus could not accept another event.
    ///
    /// Only reachable with a bounded bus (see
    /// [`StoreBuilder::event_capacity`](crate::StoreBuilder::event_capacity)). It signals a
    /// producer/consumer imbalance and should be treated as a bug.
    #[error("couldn't dispatch event, event bus buffer overflow")]
    DispatchOverflow,

    /// The event loop is gone because its scope was cancelled or faulted.
    #[error("couldn't dispatch event, the event loop has shut down")]
    Closed,
}

/// A command handler failed while processing a command.
///
/// Carries the handler's identity and the original cause. Raising one of
/// these faults the owning [`Scope`](crate::Scope).
#[derive(Debug, Error)]
#[error("exception in command handler `{handler}`")]
pub struct CommandHandlerError {
    handler: String,
    #[source]
    source: BoxError,
}

impl CommandHandlerError {
    pub fn new(handler: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            handler: handler.into(),
            source: source.into(),
        }
    }

    /// Identity of the handler that failed.
    pub fn handler(&self) -> &str {
        &self.handler
    }

    /// The error the handler raised. Same value as [`source`](std::error::Error::source).
    pub fn reason(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.source.as_ref()
    }
}
