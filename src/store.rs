//! The store: owns state and orchestrates the event loop.

use core::marker::PhantomData;
use core::sync::atomic::{AtomicBool, Ordering};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::{FutureExt, StreamExt};
use spin::Mutex;

use crate::bus::{Broadcast, Subscription};
use crate::error::{BoxError, CommandHandlerError};
use crate::handler::{CommandHandler, EventStream};
use crate::latch::Latch;
use crate::state::{RestorableState, StateCell, StateProvider, StateStream};
use crate::{Dispatcher, Scope, Spawner, StoreError, Update};

type SharedHandler<U> =
    Arc<dyn CommandHandler<<U as Update>::Command, <U as Update>::Event>>;

/// Everything the event loop and the handler tasks take ownership of at launch.
struct Pending<U: Update> {
    update: U,
    events: flume::Receiver<U::Event>,
    handlers: Vec<SharedHandler<U>>,
}

/// The single authority over a feature's state.
///
/// ```text
///            Ui event                          State ^   ^ Effect
///   caller      |                                    |   |
///  -------------|------------------------------------|---|-------
///               |    +--------------<----------------+   |
///               |    |         +-------------+ State |   |
///               |    |   State |             +-------+   |
///               v    +-------->+   Update    | Effect    |
///               |      Event   |             +-----------+
///   store       +------------->+             | Commands
///               ^              +-------------+---------------+
///               |                                            |
///               |  Events   +---------------------+ Commands |
///               +-----------+   CommandHandlers   +<---------+
///                           +---------------------+
/// ```
///
/// Events are applied one at a time by a single event loop. Each transition
/// publishes the new state, then broadcasts its commands to every handler,
/// then multicasts its effects to attached observers. Handlers run as their
/// own tasks and feed their results back in as events.
///
/// Nothing is processed until [`launch`](Self::launch) is called, which must
/// happen exactly once.
///
/// # Type Parameters
///
/// * `U` - The transition function (implements [`Update`])
/// * `Ui` - The events external callers may dispatch; converts into `U::Event`
pub struct Store<U: Update, Ui> {
    name: &'static str,
    state: Arc<StateCell<U::State>>,
    commands: Arc<Broadcast<U::Command>>,
    effects: Arc<Broadcast<U::Effect>>,
    events: flume::Sender<U::Event>,
    dispatcher: Dispatcher<Ui, U::Event>,
    launched: AtomicBool,
    pending: Mutex<Option<Pending<U>>>,
}

impl<U, Ui> Store<U, Ui>
where
    U: Update,
    Ui: Into<U::Event>,
{
    pub fn builder(initial_state: U::State, update: U) -> StoreBuilder<U, Ui> {
        StoreBuilder {
            name: "store",
            initial_state,
            update,
            handlers: Vec::new(),
            event_capacity: None,
            _ui: PhantomData,
        }
    }

    /// Create a store with default settings from already shared handlers.
    /// See [`Store::builder`] for more.
    pub fn new(
        initial_state: U::State,
        update: U,
        handlers: Vec<Arc<dyn CommandHandler<U::Command, U::Event>>>,
    ) -> Self {
        let mut builder = Self::builder(initial_state, update);
        builder.handlers = handlers;
        builder.build()
    }

    /// Start the event loop and every command handler on `scope`.
    ///
    /// Handlers subscribe to the command bus before any task is spawned, so no
    /// command can be emitted ahead of them. Events dispatched before launch
    /// are processed first, in dispatch order.
    ///
    /// # Errors
    ///
    /// [`StoreError::AlreadyLaunched`] on every call after the first.
    pub fn launch<Sp: Spawner>(&self, scope: &Scope<Sp>) -> Result<(), StoreError> {
        let pending = if self.launched.swap(true, Ordering::AcqRel) {
            None
        } else {
            self.pending.lock().take()
        };
        let Some(Pending {
            update,
            events,
            handlers,
        }) = pending
        else {
            let error = StoreError::AlreadyLaunched;
            tracing::error!(store = self.name, "{error}");
            return Err(error);
        };

        tracing::debug!(store = self.name, handlers = handlers.len(), "launching store");

        for handler in handlers {
            let commands = self.commands.subscribe().boxed();
            let name = handler.name().to_owned();
            let output = handler.handle(commands);
            scope.spawn(forward_events(self.name, name, output, self.events.clone()));
        }

        let event_loop = EventLoop {
            name: self.name,
            update,
            events,
            state: self.state.clone(),
            commands: self.commands.clone(),
            effects: self.effects.clone(),
        };
        scope.spawn(event_loop.run());

        Ok(())
    }

    /// Queue an event. See [`Dispatcher::dispatch`].
    pub fn dispatch(&self, event: Ui) -> Result<(), StoreError> {
        self.dispatcher.dispatch(event)
    }

    /// A cloneable handle for dispatching from elsewhere.
    pub fn dispatcher(&self) -> Dispatcher<Ui, U::Event> {
        self.dispatcher.clone()
    }
}

impl<U: Update, Ui> Store<U, Ui> {
    /// The current state.
    pub fn state(&self) -> U::State {
        self.state.get()
    }

    /// The current state followed by every later state.
    pub fn states(&self) -> StateStream<U::State> {
        self.state.subscribe()
    }

    pub fn state_provider(&self) -> StateProvider<U::State> {
        StateProvider::new(self.state.clone())
    }

    /// Attach an effect observer.
    ///
    /// Receives effects emitted from now on, while the subscription is alive.
    /// Effects emitted earlier are never replayed. The first observer ever to
    /// attach releases effects that were held back waiting for one.
    pub fn effects(&self) -> Subscription<U::Effect> {
        self.effects.subscribe()
    }

    pub fn is_launched(&self) -> bool {
        self.launched.load(Ordering::Acquire)
    }

    /// Capture the current state for a persistence collaborator.
    pub fn save_state(&self) -> <U::State as RestorableState>::Saved
    where
        U::State: RestorableState,
    {
        self.state.get().save_state()
    }
}

/// Configures and builds a [`Store`].
pub struct StoreBuilder<U: Update, Ui> {
    name: &'static str,
    initial_state: U::State,
    update: U,
    handlers: Vec<SharedHandler<U>>,
    event_capacity: Option<usize>,
    _ui: PhantomData<fn(Ui)>,
}

impl<U, Ui> StoreBuilder<U, Ui>
where
    U: Update,
    Ui: Into<U::Event>,
{
    /// Identity attached to the store's log records. Defaults to `"store"`.
    pub fn name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Register a command handler. Handlers launch in registration order.
    pub fn handler<H>(mut self, handler: H) -> Self
    where
        H: CommandHandler<U::Command, U::Event>,
    {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Bound the event bus.
    ///
    /// The bus is unbounded by default. With a bound, dispatching into a full
    /// bus fails with [`StoreError::DispatchOverflow`] instead of queueing.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = Some(capacity);
        self
    }

    /// Start from a persisted snapshot instead of the initial state, if one exists.
    pub fn restore_from(mut self, saved: Option<<U::State as RestorableState>::Saved>) -> Self
    where
        U::State: RestorableState,
    {
        if let Some(saved) = saved {
            self.initial_state = self.initial_state.restore_state(saved);
        }
        self
    }

    pub fn build(self) -> Store<U, Ui> {
        let (sender, receiver) = match self.event_capacity {
            Some(capacity) => flume::bounded(capacity),
            None => flume::unbounded(),
        };

        Store {
            name: self.name,
            state: Arc::new(StateCell::new(self.initial_state)),
            commands: Arc::new(Broadcast::new(self.handlers.len())),
            effects: Arc::new(Broadcast::new(1)),
            dispatcher: Dispatcher::new(sender.clone(), self.name),
            events: sender,
            launched: AtomicBool::new(false),
            pending: Mutex::new(Some(Pending {
                update: self.update,
                events: receiver,
                handlers: self.handlers,
            })),
        }
    }
}

struct EventLoop<U: Update> {
    name: &'static str,
    update: U,
    events: flume::Receiver<U::Event>,
    state: Arc<StateCell<U::State>>,
    commands: Arc<Broadcast<U::Command>>,
    effects: Arc<Broadcast<U::Effect>>,
}

impl<U: Update> EventLoop<U> {
    async fn run(mut self) -> Result<(), CommandHandlerError> {
        while let Ok(event) = self.events.recv_async().await {
            self.step(event).await;
        }
        tracing::debug!(store = self.name, "event bus closed, event loop finished");
        Ok(())
    }

    async fn step(&mut self, event: U::Event) {
        let current = self.state.get();
        let (state, commands, effects) = self.update.update(&current, event).into_parts();
        self.state.set(state);

        tracing::trace!(
            store = self.name,
            commands = commands.len(),
            effects = effects.len(),
            "transition applied"
        );

        if !commands.is_empty() {
            wait_for_subscribers(self.commands.subscribed(), self.name, "command handler").await;
            for command in commands {
                if self.commands.publish(command) == 0 {
                    tracing::trace!(store = self.name, "command reached no handler");
                }
            }
        }

        for effect in effects {
            wait_for_subscribers(self.effects.subscribed(), self.name, "effect observer").await;
            self.effects.publish(effect);
        }
    }
}

async fn wait_for_subscribers(gate: &Latch, store: &'static str, subscriber: &'static str) {
    if !gate.is_open() {
        tracing::debug!(store, "waiting for the first {subscriber} to subscribe");
        gate.wait().await;
    }
}

/// Pump a handler's events into the event bus until its stream ends.
///
/// Never waits on the bus. A full bounded bus fails the handler with
/// [`StoreError::DispatchOverflow`] as the cause.
async fn forward_events<Event: Send>(
    store: &'static str,
    handler: String,
    mut output: EventStream<Event>,
    events: flume::Sender<Event>,
) -> Result<(), CommandHandlerError> {
    let pump = async {
        while let Some(item) = output.next().await {
            let event = item?;
            match events.try_send(event) {
                Ok(()) => {}
                Err(flume::TrySendError::Full(_)) => {
                    return Err(StoreError::DispatchOverflow.into());
                }
                Err(flume::TrySendError::Disconnected(_)) => break,
            }
        }
        Ok::<(), BoxError>(())
    };

    match AssertUnwindSafe(pump).catch_unwind().await {
        Ok(Ok(())) => {
            tracing::debug!(store, handler = %handler, "command handler finished");
            Ok(())
        }
        Ok(Err(cause)) => Err(CommandHandlerError::new(handler, cause)),
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|message| (*message).to_owned())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_owned());
            Err(CommandHandlerError::new(handler, format!("panicked: {message}")))
        }
    }
}
