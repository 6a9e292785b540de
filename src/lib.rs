//! A reactive Model-View-Update store.
//!
//! A single authoritative state is changed only by a pure [`Update`]
//! function, driven by a serialized stream of events. Asynchronous work is
//! requested as commands and carried out by independent
//! [`CommandHandler`]s, whose results come back in as events. One-shot
//! effects are multicast to whoever is observing at the time.
//!
//! ## Example
//!
//! ```rust
//! use mvu_store::{
//!     async_trait, BoxError, Filtering, FilteringHandler, Next, Recorder, Store,
//!     TestExecutor, Update,
//! };
//!
//! #[derive(Clone, Debug, Default, PartialEq)]
//! struct CounterState { count: i32, is_loading: bool }
//!
//! #[derive(Clone, Debug)]
//! enum CounterEvent { Increment, AsyncIncrement, AsyncIncrementResult { value: i32 } }
//!
//! #[derive(Clone, Debug)]
//! enum CounterCommand { LoadIncrement { current_value: i32 } }
//!
//! #[derive(Clone, Debug, PartialEq)]
//! enum CounterEffect { ShowMessage(String) }
//!
//! struct CounterUpdate;
//!
//! impl Update for CounterUpdate {
//!     type State = CounterState;
//!     type Event = CounterEvent;
//!     type Command = CounterCommand;
//!     type Effect = CounterEffect;
//!
//!     fn update(
//!         &self,
//!         state: &CounterState,
//!         event: CounterEvent,
//!     ) -> Next<CounterState, CounterCommand, CounterEffect> {
//!         match event {
//!             CounterEvent::Increment => Next::new(CounterState {
//!                 count: state.count + 1,
//!                 ..state.clone()
//!             }),
//!             CounterEvent::AsyncIncrement => Next::new(CounterState {
//!                 is_loading: true,
//!                 ..state.clone()
//!             })
//!             .with_command(CounterCommand::LoadIncrement { current_value: state.count }),
//!             CounterEvent::AsyncIncrementResult { value } => Next::new(CounterState {
//!                 count: value,
//!                 is_loading: false,
//!             })
//!             .with_effect(CounterEffect::ShowMessage("Async increment completed!".into())),
//!         }
//!     }
//! }
//!
//! struct LoadIncrement;
//!
//! #[async_trait]
//! impl FilteringHandler<CounterCommand, CounterEvent> for LoadIncrement {
//!     type Filtered = i32;
//!
//!     fn select(&self, command: CounterCommand) -> Option<i32> {
//!         match command {
//!             CounterCommand::LoadIncrement { current_value } => Some(current_value),
//!         }
//!     }
//!
//!     async fn handle_command(&self, current_value: i32) -> Result<CounterEvent, BoxError> {
//!         Ok(CounterEvent::AsyncIncrementResult { value: current_value + 1 })
//!     }
//! }
//!
//! // Any `Spawner` works here, e.g. a closure around `tokio::spawn`.
//! let mut executor = TestExecutor::new();
//! let scope = executor.scope();
//!
//! let store = Store::<CounterUpdate, CounterEvent>::builder(CounterState::default(), CounterUpdate)
//!     .name("counter")
//!     .handler(Filtering::new(LoadIncrement))
//!     .build();
//! let effects = Recorder::attach(store.effects(), &scope);
//! store.launch(&scope).unwrap();
//!
//! store.dispatch(CounterEvent::Increment).unwrap();
//! store.dispatch(CounterEvent::AsyncIncrement).unwrap();
//! executor.run_until_stalled();
//!
//! assert_eq!(store.state(), CounterState { count: 2, is_loading: false });
//! assert_eq!(
//!     effects.values(),
//!     vec![CounterEffect::ShowMessage("Async increment completed!".into())]
//! );
//! ```

// Module declarations
mod bus;
mod dispatcher;
mod error;
mod handler;
mod latch;
mod next;
mod scope;
mod state;
mod store;
mod switch_latest;
mod update;

#[cfg(any(test, feature = "testing"))]
mod testing;

// Public re-exports
pub use async_trait::async_trait;
pub use bus::Subscription;
pub use dispatcher::Dispatcher;
pub use error::{BoxError, CommandHandlerError, StoreError};
pub use handler::{
    filtering_handler, CommandHandler, CommandStream, ConcurrencyPolicy, EventStream, Filtering,
    FilteringHandler, FilteringStream, FilteringStreamHandler, FnHandler,
};
pub use next::Next;
pub use scope::{Scope, Spawner};
pub use state::{RestorableState, StateProvider, StateStream};
pub use store::{Store, StoreBuilder};
pub use switch_latest::SwitchLatest;
pub use update::{EventObserver, Observed, UnhandledPolicy, Update, UpdateExt};

// Test utilities (only available with 'testing' feature or during tests)
#[cfg(any(test, feature = "testing"))]
pub use testing::{Recorder, TestExecutor, TestSpawner};
