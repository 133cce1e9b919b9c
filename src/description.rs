//! This module defines the declarative description of a machine, before flattening.
//!
//! Descriptions are read either from JSON or from the `.mt` text format (see
//! [`crate::parser`]). Both end up here: state names are classified as regular or template
//! once, entry keys and write values are tokenized, and destinations are classified.

use crate::alphabet::Alphabet;
use crate::types::{
    DirectionSpec, MachinationError, Token, DEFAULT_START_STATE, SAME_NAME, TEMPLATE_SENTINEL,
};
use indexmap::IndexMap;
use serde::Deserialize;

/// Whether a state is instantiated once, or once per triggering symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKind {
    Regular,
    /// The name ends with the template sentinel.
    Template,
}

impl StateKind {
    pub fn of(name: &str) -> Self {
        if name.ends_with(TEMPLATE_SENTINEL) {
            StateKind::Template
        } else {
            StateKind::Regular
        }
    }
}

/// Where a transition leads, as written in the description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// `SAME`: the enclosing (concrete) state.
    Same,
    /// A concrete state, which need not be described.
    State(String),
    /// A template reference, spelled with its trailing sentinel.
    Template(String),
}

impl Target {
    pub fn parse(destination: &str) -> Self {
        if destination == SAME_NAME {
            Target::Same
        } else if destination.ends_with(TEMPLATE_SENTINEL) {
            Target::Template(destination.to_string())
        } else {
            Target::State(destination.to_string())
        }
    }
}

/// The right-hand side of an entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub write: Token,
    pub direction: DirectionSpec,
    pub target: Target,
}

/// One line of a state: the symbol it matches (or a control word) and what to do.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: Token,
    pub action: Action,
}

/// A named state and its entries in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct StateDescription {
    pub name: String,
    pub kind: StateKind,
    pub entries: Vec<Entry>,
}

impl StateDescription {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            kind: StateKind::of(&name),
            name,
            entries: Vec::new(),
        }
    }

    /// Appends an entry from its persisted spelling.
    ///
    /// Fails if the key or write value is not a valid token, or if the key was already
    /// declared in this state.
    pub fn push(
        &mut self,
        key: &str,
        write: &str,
        direction: DirectionSpec,
        destination: &str,
    ) -> Result<(), MachinationError> {
        let key: Token = key.parse()?;

        if self.entries.iter().any(|entry| entry.key == key) {
            return Err(MachinationError::ValidationError(format!(
                "Duplicate entry {} in state \"{}\"",
                key, self.name
            )));
        }

        self.entries.push(Entry {
            key,
            action: Action {
                write: write.parse()?,
                direction,
                target: Target::parse(destination),
            },
        });

        Ok(())
    }

    pub fn is_template(&self) -> bool {
        self.kind == StateKind::Template
    }
}

/// All the states of a machine, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Description {
    states: IndexMap<String, StateDescription>,
}

impl Description {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a state. State names must be unique and non-empty.
    pub fn insert(&mut self, state: StateDescription) -> Result<(), MachinationError> {
        if state.name.is_empty() {
            return Err(MachinationError::ValidationError(
                "State names cannot be empty".to_string(),
            ));
        }

        if self.states.contains_key(&state.name) {
            return Err(MachinationError::ValidationError(format!(
                "Duplicate state \"{}\"",
                state.name
            )));
        }

        self.states.insert(state.name.clone(), state);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&StateDescription> {
        self.states.get(name)
    }

    /// Looks up a template by its persisted name (with the sentinel).
    pub fn template(&self, name: &str) -> Option<&StateDescription> {
        self.states.get(name).filter(|state| state.is_template())
    }

    /// Regular states, in declaration order.
    pub fn regular_states(&self) -> impl Iterator<Item = &StateDescription> {
        self.states.values().filter(|state| !state.is_template())
    }

    pub fn states(&self) -> impl Iterator<Item = &StateDescription> {
        self.states.values()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// The persisted shape of a state mapping: key -> `[write, direction, destination]`.
pub type RawStates = IndexMap<String, IndexMap<String, (String, DirectionSpec, String)>>;

impl TryFrom<RawStates> for Description {
    type Error = MachinationError;

    fn try_from(raw: RawStates) -> Result<Self, Self::Error> {
        let mut description = Description::new();

        for (name, entries) in raw {
            let mut state = StateDescription::new(name);
            for (key, (write, direction, destination)) in entries {
                state.push(&key, &write, direction, &destination)?;
            }
            description.insert(state)?;
        }

        Ok(description)
    }
}

/// A complete machine: its alphabet, the state to start in, and its states.
#[derive(Debug, Clone, PartialEq)]
pub struct Machine {
    pub name: Option<String>,
    pub alphabet: Alphabet,
    pub start: String,
    pub description: Description,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMachine {
    #[serde(default)]
    name: Option<String>,
    alphabet: Alphabet,
    #[serde(default = "default_start")]
    start: String,
    states: RawStates,
}

fn default_start() -> String {
    DEFAULT_START_STATE.to_string()
}

impl Machine {
    /// Reads a machine from its JSON form.
    pub fn from_json(input: &str) -> Result<Self, MachinationError> {
        let raw: RawMachine = serde_json::from_str(input)?;

        Ok(Self {
            name: raw.name,
            alphabet: raw.alphabet,
            start: raw.start,
            description: Description::try_from(raw.states)?,
        })
    }

    /// The machine's name, or `"unnamed"`.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed")
    }
}
