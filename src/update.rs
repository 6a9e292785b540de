//! The transition function contract.

use core::fmt::Debug;

use crate::Next;

/// Pure transition function: `(State, Event) -> Next`.
///
/// The store calls [`update`](Self::update) exactly once per accepted event,
/// strictly in acceptance order and never concurrently with itself. It must
/// not block, perform I/O, or mutate shared data; asynchronous work is
/// requested by returning commands in the [`Next`].
///
/// # Example
///
/// ```rust
/// use mvu_store::{Next, Update};
///
/// #[derive(Clone, Debug, Default, PartialEq)]
/// struct State { count: i32 }
///
/// enum Event { Increment, Decrement }
///
/// struct Counter;
///
/// impl Update for Counter {
///     type State = State;
///     type Event = Event;
///     type Command = ();
///     type Effect = ();
///
///     fn update(&self, state: &State, event: Event) -> Next<State, (), ()> {
///         match event {
///             Event::Increment => Next::new(State { count: state.count + 1 }),
///             Event::Decrement => Next::new(State { count: state.count - 1 }),
///         }
///     }
/// }
///
/// let next = Counter.update(&State::default(), Event::Increment);
/// assert_eq!(next.state(), &State { count: 1 });
/// ```
pub trait Update: Send + 'static {
    /// The whole observable model of a feature.
    type State: Clone + Send + Sync + 'static;
    /// Everything that can happen, UI-originated or produced by handlers.
    type Event: Send + 'static;
    /// Requests for asynchronous work, broadcast to every command handler.
    type Command: Clone + Send + 'static;
    /// One-shot notifications for currently attached observers.
    type Effect: Clone + Send + 'static;

    /// Reduce an event against the current state.
    fn update(
        &self,
        state: &Self::State,
        event: Self::Event,
    ) -> Next<Self::State, Self::Command, Self::Effect>;
}

impl<U: Update + ?Sized> Update for Box<U> {
    type State = U::State;
    type Event = U::Event;
    type Command = U::Command;
    type Effect = U::Effect;

    fn update(
        &self,
        state: &Self::State,
        event: Self::Event,
    ) -> Next<Self::State, Self::Command, Self::Effect> {
        (**self).update(state, event)
    }
}

/// Receives every transition, primarily for analytics.
///
/// Closures of the form `Fn(&Event, &State, &State)` implement this trait.
pub trait EventObserver<State, Event>: Send + 'static {
    fn on_event(&self, event: &Event, updated_state: &State, old_state: &State);
}

impl<State, Event, F> EventObserver<State, Event> for F
where
    F: Fn(&Event, &State, &State) + Send + 'static,
{
    fn on_event(&self, event: &Event, updated_state: &State, old_state: &State) {
        self(event, updated_state, old_state)
    }
}

/// An [`Update`] with an [`EventObserver`] layered on top.
///
/// Created by [`UpdateExt::with_observer`]. The wrapped update's result is
/// returned untouched.
pub struct Observed<U, O> {
    update: U,
    observer: O,
}

impl<U, O> Update for Observed<U, O>
where
    U: Update,
    U::Event: Clone,
    O: EventObserver<U::State, U::Event>,
{
    type State = U::State;
    type Event = U::Event;
    type Command = U::Command;
    type Effect = U::Effect;

    fn update(
        &self,
        state: &Self::State,
        event: Self::Event,
    ) -> Next<Self::State, Self::Command, Self::Effect> {
        let next = self.update.update(state, event.clone());
        self.observer.on_event(&event, next.state(), state);
        next
    }
}

pub trait UpdateExt: Update + Sized {
    /// Subscribe an additional observer to every transition.
    ///
    /// The observer runs after the wrapped update and sees
    /// `(event, new_state, old_state)`.
    fn with_observer<O>(self, observer: O) -> Observed<Self, O>
    where
        Self::Event: Clone,
        O: EventObserver<Self::State, Self::Event>,
    {
        Observed {
            update: self,
            observer,
        }
    }
}

impl<U: Update> UpdateExt for U {}

/// What a transition does with an event the current state variant does not handle.
///
/// Either way the transition is a no-op: same state, no commands, no effects.
///
/// ```rust
/// use mvu_store::{Next, UnhandledPolicy};
///
/// #[derive(Clone, Debug, PartialEq)]
/// enum State { Idle, Loading }
///
/// #[derive(Debug)]
/// enum Event { Cancel }
///
/// let next: Next<State, (), ()> = UnhandledPolicy::Log.unhandled(&State::Idle, &Event::Cancel);
/// assert_eq!(next.state(), &State::Idle);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnhandledPolicy {
    /// Record the mismatch at `debug` level.
    #[default]
    Log,
    Silent,
}

impl UnhandledPolicy {
    pub fn unhandled<State, Command, Effect>(
        self,
        state: &State,
        event: &impl Debug,
    ) -> Next<State, Command, Effect>
    where
        State: Clone,
    {
        if self == UnhandledPolicy::Log {
            tracing::debug!(
                ?event,
                state = core::any::type_name::<State>(),
                "event not handled in the current state"
            );
        }
        Next::new(state.clone())
    }
}
