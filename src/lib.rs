//! This crate compiles declarative Turing machine descriptions into flat transition tables.
//! It includes modules for reading descriptions (JSON or the `.mt` text format), flattening
//! catch-all entries and per-symbol template states into concrete rules, and rendering the
//! result as text or as a C table that a small runtime can embed.

pub mod alphabet;
pub mod description;
pub mod flatten;
pub mod loader;
pub mod parser;
pub mod programs;
pub mod render;
pub mod types;

/// Re-exports the `Alphabet` struct from the alphabet module.
pub use alphabet::Alphabet;
/// Re-exports the description model.
pub use description::{Description, Machine, StateDescription, StateKind, Target};
/// Re-exports the flattening engine.
pub use flatten::{flatten, flatten_machine, FlattenedTable, Flattener};
/// Re-exports the `MachineLoader` struct and the description `Format`.
pub use loader::{Format, MachineLoader};
/// Re-exports the `parse` function from the parser module.
pub use parser::parse;
/// Re-exports `MachineInfo`, `MachineManager`, and `MACHINES` from the programs module.
pub use programs::{MachineInfo, MachineManager, MACHINES};
/// Re-exports the renderers.
pub use render::{CodeTable, Formal, Human, Renderer};
/// Re-exports the core types.
pub use types::{Direction, DirectionSpec, MachinationError, Rule, Symbol, Token, Write};
