//! The output of a single transition.

/// The atomic result of one call to [`Update::update`](crate::Update::update).
///
/// Bundles the new state with the commands to hand to command handlers and
/// the effects to multicast to observers. Order within `commands` and within
/// `effects` is preserved all the way through emission.
///
/// # Example
///
/// ```rust
/// use mvu_store::Next;
///
/// #[derive(Clone, Debug, PartialEq)]
/// struct State { count: i32, is_loading: bool }
///
/// #[derive(Debug, PartialEq)]
/// enum Command { LoadIncrement { current_value: i32 } }
///
/// #[derive(Debug, PartialEq)]
/// enum Effect { ShowMessage(String) }
///
/// // State only
/// let next: Next<State, Command, Effect> = Next::new(State { count: 1, is_loading: false });
/// assert!(next.commands().is_empty());
///
/// // State plus a command
/// let next: Next<State, Command, Effect> = Next::new(State { count: 1, is_loading: true })
///     .with_command(Command::LoadIncrement { current_value: 1 });
/// assert_eq!(next.commands().len(), 1);
///
/// // State plus an effect
/// let next: Next<State, Command, Effect> = Next::new(State { count: 2, is_loading: false })
///     .with_effect(Effect::ShowMessage("done".to_string()));
/// assert_eq!(next.effects().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Next<State, Command, Effect> {
    state: State,
    commands: Vec<Command>,
    effects: Vec<Effect>,
}

impl<State, Command, Effect> Next<State, Command, Effect> {
    /// A transition to `state` with no commands and no effects.
    pub fn new(state: State) -> Self {
        Self {
            state,
            commands: Vec::new(),
            effects: Vec::new(),
        }
    }

    pub fn from_parts(state: State, commands: Vec<Command>, effects: Vec<Effect>) -> Self {
        Self {
            state,
            commands,
            effects,
        }
    }

    /// Append one command after any already present.
    pub fn with_command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    /// Append commands, keeping their iteration order.
    pub fn with_commands(mut self, commands: impl IntoIterator<Item = Command>) -> Self {
        self.commands.extend(commands);
        self
    }

    /// Append one effect after any already present.
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Append effects, keeping their iteration order.
    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn into_parts(self) -> (State, Vec<Command>, Vec<Effect>) {
        (self.state, self.commands, self.effects)
    }
}
