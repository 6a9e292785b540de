use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use futures::future;
use mvu_store::{
    async_trait, BoxError, CommandHandler, CommandStream, ConcurrencyPolicy, EventStream,
    FilteringHandler, FilteringStreamHandler, Next, Update,
};
use spin::Mutex;

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct ProbeState {
    pub(crate) received: Vec<u32>,
    pub(crate) transitions: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum ProbeEvent {
    Start(u32),
    StartMany(Vec<u32>),
    Ping,
    Notify(Vec<&'static str>),
    FetchAndNotify(u32, &'static str),
    Received(u32),
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum ProbeCommand {
    Fetch(u32),
    Ping,
}

pub(crate) type ProbeEffect = &'static str;

pub(crate) struct ProbeUpdate;

impl Update for ProbeUpdate {
    type State = ProbeState;
    type Event = ProbeEvent;
    type Command = ProbeCommand;
    type Effect = ProbeEffect;

    fn update(
        &self,
        state: &ProbeState,
        event: ProbeEvent,
    ) -> Next<ProbeState, ProbeCommand, ProbeEffect> {
        let mut next_state = ProbeState {
            transitions: state.transitions + 1,
            ..state.clone()
        };
        match event {
            ProbeEvent::Start(id) => Next::new(next_state).with_command(ProbeCommand::Fetch(id)),
            ProbeEvent::StartMany(ids) => {
                Next::new(next_state).with_commands(ids.into_iter().map(ProbeCommand::Fetch))
            }
            ProbeEvent::Ping => Next::new(next_state).with_command(ProbeCommand::Ping),
            ProbeEvent::Notify(messages) => Next::new(next_state).with_effects(messages),
            ProbeEvent::FetchAndNotify(id, message) => Next::from_parts(
                next_state,
                vec![ProbeCommand::Fetch(id)],
                vec![message],
            ),
            ProbeEvent::Received(id) => {
                next_state.received.push(id);
                Next::new(next_state)
            }
        }
    }
}

/// Holds handler work in flight until a test releases it.
///
/// A gate whose sender reports a disconnect was dropped by the handler,
/// i.e. its work was cancelled.
#[derive(Clone, Default)]
pub(crate) struct Gates {
    pending: Arc<Mutex<HashMap<u32, flume::Receiver<()>>>>,
}

impl Gates {
    pub(crate) fn close(&self, id: u32) -> flume::Sender<()> {
        let (sender, receiver) = flume::unbounded();
        self.pending.lock().insert(id, receiver);
        sender
    }

    fn take(&self, id: u32) -> Option<flume::Receiver<()>> {
        self.pending.lock().remove(&id)
    }

    async fn pass(&self, id: u32) {
        if let Some(gate) = self.take(id) {
            gate.recv_async().await.ok();
        }
    }
}

/// Answers `Fetch(id)` with `Received(id)` once the gate for `id` opens.
pub(crate) struct GatedFetch {
    pub(crate) gates: Gates,
    pub(crate) policy: ConcurrencyPolicy,
}

#[async_trait]
impl FilteringHandler<ProbeCommand, ProbeEvent> for GatedFetch {
    type Filtered = u32;

    fn select(&self, command: ProbeCommand) -> Option<u32> {
        match command {
            ProbeCommand::Fetch(id) => Some(id),
            ProbeCommand::Ping => None,
        }
    }

    fn policy(&self) -> ConcurrencyPolicy {
        self.policy
    }

    async fn handle_command(&self, id: u32) -> Result<ProbeEvent, BoxError> {
        self.gates.pass(id).await;
        Ok(ProbeEvent::Received(id))
    }
}

/// Emits `Received(id)` every time the gate for `id` is signalled.
pub(crate) struct StreamingFetch {
    pub(crate) gates: Gates,
    pub(crate) policy: ConcurrencyPolicy,
}

impl FilteringStreamHandler<ProbeCommand, ProbeEvent> for StreamingFetch {
    type Filtered = u32;

    fn select(&self, command: ProbeCommand) -> Option<u32> {
        match command {
            ProbeCommand::Fetch(id) => Some(id),
            ProbeCommand::Ping => None,
        }
    }

    fn policy(&self) -> ConcurrencyPolicy {
        self.policy
    }

    fn handle_command(&self, id: u32) -> EventStream<ProbeEvent> {
        match self.gates.take(id) {
            Some(gate) => gate
                .into_stream()
                .map(move |()| Ok(ProbeEvent::Received(id)))
                .boxed(),
            None => stream::empty().boxed(),
        }
    }
}

/// Records every command it sees and never produces events.
#[derive(Default)]
pub(crate) struct CommandLog {
    pub(crate) seen: Arc<Mutex<Vec<ProbeCommand>>>,
}

impl CommandHandler<ProbeCommand, ProbeEvent> for CommandLog {
    fn name(&self) -> &str {
        "command-log"
    }

    fn handle(self: Arc<Self>, commands: CommandStream<ProbeCommand>) -> EventStream<ProbeEvent> {
        commands
            .filter_map(move |command| {
                self.seen.lock().push(command);
                future::ready(None::<Result<ProbeEvent, BoxError>>)
            })
            .boxed()
    }
}
