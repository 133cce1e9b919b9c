//! This module defines the core data structures shared by the description model, the
//! flattening engine and the renderers: symbols, reserved tokens, directions, rules and
//! the error type.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::parser::Rule as GrammarRule;

/// Trailing character marking a state name as a template.
pub const TEMPLATE_SENTINEL: char = '.';
/// Spelling of the blank symbol in descriptions.
pub const BLANK_NAME: &str = "NUL";
/// Spelling of the end-of-input symbol in descriptions.
pub const END_NAME: &str = "EOT";
/// Catch-all key.
pub const ELSE_NAME: &str = "ELSE";
/// Same-as-trigger marker, valid as a write value or a destination.
pub const SAME_NAME: &str = "SAME";
/// Template-parameter marker, valid as a key or a write value inside templates.
pub const PARAMETER_NAME: &str = "DOT";
/// Name of the state the code table numbers 0 when none is given.
pub const DEFAULT_START_STATE: &str = "start";
/// The maximum allowed size for a description in bytes.
pub const MAX_DESCRIPTION_SIZE: usize = 65536; // 64KB

/// A tape symbol.
///
/// Ordering is by code point for characters, followed by the two reserved symbols. This is
/// the order in which catch-all entries are expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Symbol {
    /// A user symbol from the alphabet.
    Char(char),
    /// An empty cell, spelled `NUL`.
    Blank,
    /// The end-of-input marker, spelled `EOT`.
    End,
}

impl Symbol {
    /// Returns `true` for `Blank` and `End`.
    pub fn is_reserved(&self) -> bool {
        !matches!(self, Symbol::Char(_))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Char(c) => write!(f, "{c}"),
            Symbol::Blank => f.write_str(BLANK_NAME),
            Symbol::End => f.write_str(END_NAME),
        }
    }
}

impl FromStr for Symbol {
    type Err = MachinationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Token::from_str(s)? {
            Token::Symbol(symbol) => Ok(symbol),
            _ => Err(MachinationError::ReservedSymbol(s.to_string())),
        }
    }
}

impl Serialize for Symbol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// A token as written in a description: either a symbol or one of the control words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    Symbol(Symbol),
    /// `ELSE`
    Else,
    /// `SAME`
    Same,
    /// `DOT`
    Parameter,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Symbol(symbol) => write!(f, "{symbol}"),
            Token::Else => f.write_str(ELSE_NAME),
            Token::Same => f.write_str(SAME_NAME),
            Token::Parameter => f.write_str(PARAMETER_NAME),
        }
    }
}

impl FromStr for Token {
    type Err = MachinationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = match s {
            BLANK_NAME => Token::Symbol(Symbol::Blank),
            END_NAME => Token::Symbol(Symbol::End),
            ELSE_NAME => Token::Else,
            SAME_NAME => Token::Same,
            PARAMETER_NAME => Token::Parameter,
            _ => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(TEMPLATE_SENTINEL), None) => {
                        return Err(MachinationError::ReservedSymbol(s.to_string()))
                    }
                    (Some(c), None) => Token::Symbol(Symbol::Char(c)),
                    _ => return Err(MachinationError::InvalidSymbol(s.to_string())),
                }
            }
        };

        Ok(token)
    }
}

/// Head movement of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Move the head one position to the left.
    Left,
    /// Move the head one position to the right.
    Right,
    /// Stop the machine.
    Halt,
}

impl Direction {
    /// The numeric code used by descriptions and the generated code table.
    pub fn code(&self) -> i8 {
        match self {
            Direction::Left => -1,
            Direction::Right => 1,
            Direction::Halt => 0,
        }
    }
}

/// A direction exactly as it appeared in a description, validated when a [`Rule`] is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DirectionSpec {
    Integer(i64),
    /// An integer past `i64::MAX`.
    Unsigned(u64),
    Name(String),
    /// Any other JSON value.
    Other(serde_json::Value),
}

impl fmt::Display for DirectionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectionSpec::Integer(n) => write!(f, "{n}"),
            DirectionSpec::Unsigned(n) => write!(f, "{n}"),
            DirectionSpec::Name(name) => f.write_str(name),
            DirectionSpec::Other(value) => write!(f, "{value}"),
        }
    }
}

impl TryFrom<&DirectionSpec> for Direction {
    type Error = MachinationError;

    fn try_from(spec: &DirectionSpec) -> Result<Self, Self::Error> {
        match spec {
            DirectionSpec::Integer(-1) => Ok(Direction::Left),
            DirectionSpec::Integer(0) => Ok(Direction::Halt),
            DirectionSpec::Integer(1) => Ok(Direction::Right),
            DirectionSpec::Integer(n) => Err(MachinationError::InvalidDirection(n.to_string())),
            DirectionSpec::Unsigned(n) => Err(MachinationError::InvalidDirection(n.to_string())),
            DirectionSpec::Name(name) => match name.as_str() {
                "left" => Ok(Direction::Left),
                "right" => Ok(Direction::Right),
                _ => Err(MachinationError::InvalidDirection(name.clone())),
            },
            DirectionSpec::Other(value) => {
                Err(MachinationError::InvalidDirectionType(value.to_string()))
            }
        }
    }
}

/// The value written by a rule before it is bound to the symbol the rule reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Write {
    Symbol(Symbol),
    /// Write back whatever was read.
    Same,
}

/// A single concrete transition of the flattened table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// The symbol this rule matches.
    pub read: Symbol,
    /// The symbol written over the matched cell.
    pub write: Symbol,
    /// Where the head goes afterwards.
    pub direction: Direction,
    /// The state the machine transitions to.
    pub next_state: String,
}

impl Rule {
    /// Builds a rule, resolving `Write::Same` to `read` and validating the direction.
    ///
    /// The destination is taken as-is; resolving template references is the flattener's job.
    pub fn new(
        read: Symbol,
        write: Write,
        direction: &DirectionSpec,
        next_state: impl Into<String>,
    ) -> Result<Self, MachinationError> {
        Ok(Self {
            read,
            write: match write {
                Write::Symbol(symbol) => symbol,
                Write::Same => read,
            },
            direction: Direction::try_from(direction)?,
            next_state: next_state.into(),
        })
    }
}

/// Represents the errors raised while loading, flattening or rendering a machine.
#[derive(Debug, Error)]
pub enum MachinationError {
    /// A direction that is neither an integer nor a string.
    #[error("Unknown type for direction: {0}")]
    InvalidDirectionType(String),
    /// An integer direction outside `-1..=1`, or an unknown direction name.
    #[error("Invalid direction \"{0}\"")]
    InvalidDirection(String),
    /// A destination names a template that the description does not define.
    #[error("Undefined template \"{0}\"")]
    UndefinedTemplate(String),
    /// Instantiation was requested for a name without the template sentinel.
    #[error("\"{0}\" does not end with a dot")]
    MalformedTemplateName(String),
    /// The renderer only works on whole tables.
    #[error("Operation not supported: {0}")]
    NotSupported(String),
    /// A symbol that is neither a single character nor a reserved symbol name.
    #[error("Invalid symbol \"{0}\"")]
    InvalidSymbol(String),
    /// A control word used where a tape symbol is required.
    #[error("\"{0}\" is reserved and cannot be used as a tape symbol")]
    ReservedSymbol(String),
    /// The template parameter appears outside of a template.
    #[error("State \"{0}\" is not a template and cannot use DOT")]
    MisplacedParameter(String),
    /// A control word used in a position where it has no meaning.
    #[error("Unexpected {token} as {position} in state \"{state}\"")]
    UnexpectedToken {
        state: String,
        token: Token,
        position: &'static str,
    },
    /// Two explicit entries of one concrete state match the same symbol.
    #[error("State \"{state}\" has more than one rule for symbol {symbol}")]
    DuplicateRule { state: String, symbol: Symbol },
    /// The start state of a code table is not part of the flattened table.
    #[error("Start state \"{0}\" is not defined")]
    UndefinedStartState(String),
    /// Indicates an error during the parsing of a text description.
    #[error("Description parsing error: {0}")]
    ParseError(#[from] Box<pest::error::Error<GrammarRule>>),
    /// Indicates an error while reading a JSON description.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    /// Indicates a structurally invalid description.
    #[error("Description validation error: {0}")]
    ValidationError(String),
    /// Indicates an error related to file system operations.
    #[error("File error: {0}")]
    FileError(String),
}
