//! Command handlers: long-running tasks that turn commands into events.

use core::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future;
use futures::stream::{self, BoxStream, StreamExt};

use crate::error::BoxError;
use crate::switch_latest::SwitchLatest;

/// Every command published by the store, as seen by one handler.
pub type CommandStream<Command> = BoxStream<'static, Command>;

/// Events produced by a handler. An `Err` item is a handler failure.
pub type EventStream<Event> = BoxStream<'static, Result<Event, BoxError>>;

/// Consumes the broadcast command stream and produces events.
///
/// [`handle`](Self::handle) is called once when the store launches. The
/// handler sees every command and is responsible for ignoring the ones it
/// does not understand. Its events are fed back into the store's event bus
/// until the owning [`Scope`](crate::Scope) ends.
///
/// Most handlers don't implement this directly; see [`FilteringHandler`] and
/// [`FilteringStreamHandler`].
pub trait CommandHandler<Command, Event>: Send + Sync + 'static {
    /// Stable identity used in diagnostics and in
    /// [`CommandHandlerError`](crate::CommandHandlerError).
    fn name(&self) -> &str {
        core::any::type_name::<Self>()
    }

    fn handle(self: Arc<Self>, commands: CommandStream<Command>) -> EventStream<Event>;
}

/// How a handler treats a matching command that arrives while earlier work
/// is still running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConcurrencyPolicy {
    /// Process every command to completion, concurrently and independently.
    #[default]
    Merge,
    /// Cancel the handler's in-flight work when a newer matching command arrives.
    SwitchLatest,
}

fn apply_policy<Filtered, Event, F>(
    commands: BoxStream<'static, Filtered>,
    policy: ConcurrencyPolicy,
    work: F,
) -> EventStream<Event>
where
    Filtered: Send + 'static,
    Event: Send + 'static,
    F: FnMut(Filtered) -> EventStream<Event> + Send + Unpin + 'static,
{
    match policy {
        ConcurrencyPolicy::Merge => commands.flat_map_unordered(None::<usize>, work).boxed(),
        ConcurrencyPolicy::SwitchLatest => SwitchLatest::new(commands.map(work)).boxed(),
    }
}

/// A handler producing exactly one event per matching command.
///
/// # Example
///
/// ```rust
/// use mvu_store::{async_trait, BoxError, FilteringHandler};
///
/// #[derive(Clone)]
/// enum Command { LoadIncrement { current_value: i32 }, Save }
///
/// enum Event { AsyncIncrementResult { value: i32 } }
///
/// struct LoadIncrement;
///
/// #[async_trait]
/// impl FilteringHandler<Command, Event> for LoadIncrement {
///     type Filtered = i32;
///
///     fn select(&self, command: Command) -> Option<i32> {
///         match command {
///             Command::LoadIncrement { current_value } => Some(current_value),
///             _ => None,
///         }
///     }
///
///     async fn handle_command(&self, current_value: i32) -> Result<Event, BoxError> {
///         Ok(Event::AsyncIncrementResult { value: current_value + 1 })
///     }
/// }
/// ```
#[async_trait]
pub trait FilteringHandler<Command, Event>: Send + Sync + 'static {
    /// The part of a matching command the handler works on.
    type Filtered: Send + 'static;

    /// Claim a command, or return `None` to ignore it.
    fn select(&self, command: Command) -> Option<Self::Filtered>;

    fn policy(&self) -> ConcurrencyPolicy {
        ConcurrencyPolicy::Merge
    }

    async fn handle_command(&self, command: Self::Filtered) -> Result<Event, BoxError>;
}

/// A handler producing a sequence of events per matching command.
///
/// The sequence may be empty or unbounded, e.g. a subscription to streaming
/// updates. Under [`ConcurrencyPolicy::Merge`] sequences from different
/// commands interleave freely.
pub trait FilteringStreamHandler<Command, Event>: Send + Sync + 'static {
    type Filtered: Send + 'static;

    fn select(&self, command: Command) -> Option<Self::Filtered>;

    fn policy(&self) -> ConcurrencyPolicy {
        ConcurrencyPolicy::Merge
    }

    fn handle_command(&self, command: Self::Filtered) -> EventStream<Event>;
}

/// Adapts a [`FilteringHandler`] into a [`CommandHandler`].
pub struct Filtering<H> {
    handler: H,
}

impl<H> Filtering<H> {
    pub fn new(handler: H) -> Self {
        Self { handler }
    }
}

impl<Command, Event, H> CommandHandler<Command, Event> for Filtering<H>
where
    Command: Send + 'static,
    Event: Send + 'static,
    H: FilteringHandler<Command, Event>,
{
    fn name(&self) -> &str {
        core::any::type_name::<H>()
    }

    fn handle(self: Arc<Self>, commands: CommandStream<Command>) -> EventStream<Event> {
        let policy = self.handler.policy();
        let selector = self.clone();
        let filtered = commands
            .filter_map(move |command| future::ready(selector.handler.select(command)))
            .boxed();

        apply_policy(filtered, policy, move |command| {
            let this = self.clone();
            stream::once(async move { this.handler.handle_command(command).await }).boxed()
        })
    }
}

/// Adapts a [`FilteringStreamHandler`] into a [`CommandHandler`].
pub struct FilteringStream<H> {
    handler: H,
}

impl<H> FilteringStream<H> {
    pub fn new(handler: H) -> Self {
        Self { handler }
    }
}

impl<Command, Event, H> CommandHandler<Command, Event> for FilteringStream<H>
where
    Command: Send + 'static,
    Event: Send + 'static,
    H: FilteringStreamHandler<Command, Event>,
{
    fn name(&self) -> &str {
        core::any::type_name::<H>()
    }

    fn handle(self: Arc<Self>, commands: CommandStream<Command>) -> EventStream<Event> {
        let policy = self.handler.policy();
        let selector = self.clone();
        let filtered = commands
            .filter_map(move |command| future::ready(selector.handler.select(command)))
            .boxed();

        apply_policy(filtered, policy, move |command| {
            self.handler.handle_command(command)
        })
    }
}

/// Closure-backed handler built by [`filtering_handler`].
pub struct FnHandler<S, F> {
    name: &'static str,
    policy: ConcurrencyPolicy,
    select: S,
    work: F,
}

/// Build a single-event handler from a selector and an async function.
///
/// ```rust
/// use mvu_store::{filtering_handler, BoxError, CommandHandler, ConcurrencyPolicy};
///
/// #[derive(Clone)]
/// enum Command { Search(String) }
/// enum Event { Found(usize) }
///
/// let search = filtering_handler(
///     "search",
///     ConcurrencyPolicy::SwitchLatest,
///     |command: Command| match command {
///         Command::Search(query) => Some(query),
///     },
///     |query: String| async move { Ok::<_, BoxError>(Event::Found(query.len())) },
/// );
/// assert_eq!(CommandHandler::<Command, Event>::name(&search), "search");
/// ```
pub fn filtering_handler<Command, Filtered, Event, S, F, Fut>(
    name: &'static str,
    policy: ConcurrencyPolicy,
    select: S,
    work: F,
) -> FnHandler<S, F>
where
    S: Fn(Command) -> Option<Filtered> + Send + Sync + 'static,
    F: Fn(Filtered) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Event, BoxError>> + Send + 'static,
{
    FnHandler {
        name,
        policy,
        select,
        work,
    }
}

impl<Command, Filtered, Event, S, F, Fut> CommandHandler<Command, Event> for FnHandler<S, F>
where
    Command: Send + 'static,
    Filtered: Send + 'static,
    Event: Send + 'static,
    S: Fn(Command) -> Option<Filtered> + Send + Sync + 'static,
    F: Fn(Filtered) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Event, BoxError>> + Send + 'static,
{
    fn name(&self) -> &str {
        self.name
    }

    fn handle(self: Arc<Self>, commands: CommandStream<Command>) -> EventStream<Event> {
        let policy = self.policy;
        let selector = self.clone();
        let filtered = commands
            .filter_map(move |command| future::ready((selector.select)(command)))
            .boxed();

        apply_policy(filtered, policy, move |filtered| {
            stream::once((self.work)(filtered)).boxed()
        })
    }
}
