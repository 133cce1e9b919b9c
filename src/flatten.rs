//! This module compiles a [`Description`] down to a [`FlattenedTable`].
//!
//! Every regular state becomes one entry of the table. Template states are instantiated
//! lazily, once per triggering symbol, the first time a rule refers to them. Catch-all
//! entries are expanded over the effective alphabet so that each concrete state ends up with
//! at most one rule per symbol.

use crate::alphabet::Alphabet;
use crate::description::{Action, Description, Machine, StateDescription, Target};
use crate::types::{MachinationError, Rule, Symbol, Token, Write, TEMPLATE_SENTINEL};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, trace};

/// The result of flattening: concrete state names mapped to their ordered rules.
///
/// Iteration follows table order: regular states in declaration order, then template
/// instances in the order they were first referenced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FlattenedTable {
    states: IndexMap<String, Vec<Rule>>,
}

impl FlattenedTable {
    pub fn get(&self, state: &str) -> Option<&[Rule]> {
        self.states.get(state).map(Vec::as_slice)
    }

    pub fn contains(&self, state: &str) -> bool {
        self.states.contains_key(state)
    }

    /// Finds the rule that applies when `state` reads `symbol`.
    pub fn lookup(&self, state: &str, symbol: Symbol) -> Option<&Rule> {
        self.get(state)?.iter().find(|rule| rule.read == symbol)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Rule])> {
        self.states
            .iter()
            .map(|(name, rules)| (name.as_str(), rules.as_slice()))
    }

    pub fn states(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(String::as_str)
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn rule_count(&self) -> usize {
        self.states.values().map(Vec::len).sum()
    }
}

/// Flattens `description` over `alphabet`.
pub fn flatten(
    description: &Description,
    alphabet: &Alphabet,
) -> Result<FlattenedTable, MachinationError> {
    Flattener::new(description, alphabet).run()
}

/// Flattens a whole machine.
pub fn flatten_machine(machine: &Machine) -> Result<FlattenedTable, MachinationError> {
    flatten(&machine.description, &machine.alphabet)
}

/// A table entry while flattening is in progress.
#[derive(Debug)]
enum Slot {
    /// The name is taken; its rules are not built yet.
    Reserved,
    Done(Vec<Rule>),
}

/// A template instance waiting to be expanded.
#[derive(Debug)]
struct Instantiation<'a> {
    template: &'a StateDescription,
    concrete: String,
    symbol: Symbol,
}

/// Owns the table under construction and the pending instantiations.
///
/// A name is reserved in the table before its rules are built, so any reference to it
/// (including from its own body) resolves to the reservation instead of expanding again.
/// Pending instances are kept on an explicit work-list, which bounds nesting by memory
/// rather than by call-stack depth.
pub struct Flattener<'a> {
    description: &'a Description,
    symbols: BTreeSet<Symbol>,
    table: IndexMap<String, Slot>,
    pending: Vec<Instantiation<'a>>,
}

impl<'a> Flattener<'a> {
    pub fn new(description: &'a Description, alphabet: &Alphabet) -> Self {
        Self {
            description,
            symbols: alphabet.effective(),
            table: IndexMap::new(),
            pending: Vec::new(),
        }
    }

    /// Runs the whole pass and returns the finished table.
    pub fn run(mut self) -> Result<FlattenedTable, MachinationError> {
        let description = self.description;

        for state in description.regular_states() {
            self.table.insert(state.name.clone(), Slot::Reserved);
        }

        for state in description.regular_states() {
            debug!(state = %state.name, "flattening state");
            let rules = self.expand(state, &state.name, None)?;
            self.table.insert(state.name.clone(), Slot::Done(rules));
            self.drain()?;
        }

        // Instances requested before the pass started.
        self.drain()?;

        self.finish()
    }

    /// Returns the concrete name of `template` instantiated with `symbol`, reserving it
    /// and queueing its expansion the first time it is requested.
    ///
    /// `template` is the persisted name, trailing sentinel included.
    pub fn instantiate(
        &mut self,
        template: &str,
        symbol: Symbol,
    ) -> Result<String, MachinationError> {
        let prefix = template
            .strip_suffix(TEMPLATE_SENTINEL)
            .ok_or_else(|| MachinationError::MalformedTemplateName(template.to_string()))?;

        let description = self.description;
        let state = description
            .template(template)
            .ok_or_else(|| MachinationError::UndefinedTemplate(template.to_string()))?;

        if symbol == Symbol::Char(TEMPLATE_SENTINEL) {
            return Err(MachinationError::ReservedSymbol(symbol.to_string()));
        }

        let concrete = format!("{prefix}{symbol}");
        if self.table.contains_key(&concrete) {
            return Ok(concrete);
        }

        debug!(template, %symbol, instance = %concrete, "reserving instance");
        self.table.insert(concrete.clone(), Slot::Reserved);
        self.pending.push(Instantiation {
            template: state,
            concrete: concrete.clone(),
            symbol,
        });

        Ok(concrete)
    }

    /// Expands queued instances until none are left.
    fn drain(&mut self) -> Result<(), MachinationError> {
        while let Some(job) = self.pending.pop() {
            let rules = self.expand(job.template, &job.concrete, Some(job.symbol))?;
            self.table.insert(job.concrete, Slot::Done(rules));
        }

        Ok(())
    }

    /// Builds the rules of one concrete state.
    ///
    /// `name` is the concrete name `SAME` destinations resolve to, and `parameter` the
    /// instantiation symbol for templates.
    fn expand(
        &mut self,
        state: &StateDescription,
        name: &str,
        parameter: Option<Symbol>,
    ) -> Result<Vec<Rule>, MachinationError> {
        let mut covered = HashSet::new();
        let mut otherwise: Option<&Action> = None;
        let mut rules = Vec::with_capacity(self.symbols.len());

        for entry in &state.entries {
            let read = match entry.key {
                Token::Else => {
                    otherwise = Some(&entry.action);
                    continue;
                }
                Token::Symbol(symbol) => symbol,
                Token::Parameter => parameter
                    .ok_or_else(|| MachinationError::MisplacedParameter(state.name.clone()))?,
                Token::Same => {
                    return Err(MachinationError::UnexpectedToken {
                        state: name.to_string(),
                        token: entry.key,
                        position: "key",
                    })
                }
            };

            if !covered.insert(read) {
                return Err(MachinationError::DuplicateRule {
                    state: name.to_string(),
                    symbol: read,
                });
            }

            rules.push(self.build(state, name, parameter, read, &entry.action)?);
        }

        if let Some(action) = otherwise {
            let missing: Vec<Symbol> = self
                .symbols
                .iter()
                .filter(|symbol| !covered.contains(*symbol))
                .copied()
                .collect();

            for read in missing {
                rules.push(self.build(state, name, parameter, read, action)?);
            }
        }

        Ok(rules)
    }

    /// Builds the rule `read` triggers, instantiating the destination if it is a template.
    fn build(
        &mut self,
        state: &StateDescription,
        name: &str,
        parameter: Option<Symbol>,
        read: Symbol,
        action: &Action,
    ) -> Result<Rule, MachinationError> {
        let write = match action.write {
            Token::Symbol(symbol) => Write::Symbol(symbol),
            Token::Same => Write::Same,
            Token::Parameter => Write::Symbol(
                parameter.ok_or_else(|| MachinationError::MisplacedParameter(state.name.clone()))?,
            ),
            Token::Else => {
                return Err(MachinationError::UnexpectedToken {
                    state: name.to_string(),
                    token: action.write,
                    position: "write value",
                })
            }
        };

        let next_state = match &action.target {
            Target::Same => name.to_string(),
            Target::State(next) => next.clone(),
            Target::Template(template) => self.instantiate(template, read)?,
        };

        let rule = Rule::new(read, write, &action.direction, next_state)?;
        trace!(state = name, read = %rule.read, write = %rule.write, next = %rule.next_state, "rule");

        Ok(rule)
    }

    fn finish(self) -> Result<FlattenedTable, MachinationError> {
        let states = self
            .table
            .into_iter()
            .map(|(name, slot)| match slot {
                Slot::Done(rules) => Ok((name, rules)),
                Slot::Reserved => Err(MachinationError::ValidationError(format!(
                    "State \"{name}\" was never expanded"
                ))),
            })
            .collect::<Result<_, _>>()?;

        Ok(FlattenedTable { states })
    }
}
