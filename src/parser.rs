//! This module provides the parser for `.mt` machine descriptions, utilizing the `pest` crate.
//! It defines the grammar for `.mt` files and functions to parse the input into a `Machine`.

use crate::{
    alphabet::Alphabet,
    description::{Description, Machine, StateDescription},
    types::{DirectionSpec, MachinationError, Token, DEFAULT_START_STATE},
};
use pest::{
    error::{Error, ErrorVariant},
    iterators::Pair,
    Parser as PestParser, Span,
};
use pest_derive::Parser as PestParser;
use std::collections::HashSet;

/// Derives a `PestParser` for the machine grammar defined in `grammar.pest`.
#[derive(PestParser)]
#[grammar = "grammar.pest"]
pub struct MachineParser;

/// Parses the given input string into a `Machine`.
///
/// # Arguments
///
/// * `input` - A string slice containing the machine description.
///
/// # Returns
///
/// * `Ok(Machine)` if the input is successfully parsed.
/// * `Err(MachinationError::ParseError)` if there are any syntax errors, duplicate sections,
///   states or entries.
/// * `Err(MachinationError::ValidationError)` if the `alphabet` section is missing.
/// * `Err(MachinationError::InvalidSymbol)` if a quoted symbol uses an unknown escape.
pub fn parse(input: &str) -> Result<Machine, MachinationError> {
    let root = MachineParser::parse(Rule::machine, input.trim())
        .map_err(|e| MachinationError::ParseError(e.into()))?
        .next()
        .ok_or_else(|| MachinationError::ValidationError("Empty description".to_string()))?;

    parse_machine(root)
}

/// Parses the top-level structure of a description from a `Pair<Rule::machine>`.
fn parse_machine(pair: Pair<Rule>) -> Result<Machine, MachinationError> {
    let mut name: Option<String> = None;
    let mut alphabet: Option<Alphabet> = None;
    let mut start: Option<String> = None;
    let mut description: Option<Description> = None;
    let mut seen = HashSet::new();

    for p in pair.into_inner() {
        let span = p.as_span();
        let rule = p.as_rule();

        check_unique_rule(rule, span, &mut seen)?;

        match rule {
            Rule::name => name = Some(p.into_inner().as_str().trim().to_string()),
            Rule::alphabet => alphabet = Some(Alphabet::from_chars(p.into_inner().as_str())?),
            Rule::start => start = Some(p.into_inner().as_str().to_string()),
            Rule::states => description = Some(parse_states(p)?),
            _ => {} // EOI
        }
    }

    let alphabet = alphabet.ok_or_else(|| {
        MachinationError::ValidationError("Missing 'alphabet' section".to_string())
    })?;

    Ok(Machine {
        name,
        alphabet,
        start: start.unwrap_or_else(|| DEFAULT_START_STATE.to_string()),
        description: description.unwrap_or_default(),
    })
}

/// Parses every state block of a `Pair<Rule::states>`.
fn parse_states(pair: Pair<Rule>) -> Result<Description, MachinationError> {
    let mut description = Description::new();

    for state_pair in pair.into_inner() {
        let span = state_pair.as_span();
        let state = parse_state(state_pair)?;

        if description.get(&state.name).is_some() {
            return Err(parse_error(
                &format!("Duplicate state: {}", state.name),
                span,
            ));
        }

        description.insert(state)?;
    }

    Ok(description)
}

/// Parses one state header and its entries.
fn parse_state(pair: Pair<Rule>) -> Result<StateDescription, MachinationError> {
    let mut pairs = pair.into_inner();
    let name = pairs.next().map(|p| p.as_str()).unwrap_or_default();
    let mut state = StateDescription::new(name);

    for entry in pairs {
        let span = entry.as_span();
        let mut parts = entry.into_inner();
        let (Some(key), Some(write), Some(direction), Some(destination)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(parse_error("Incomplete entry", span));
        };

        let key = parse_symbol(key)?;
        let token: Token = key.parse()?;
        if state.entries.iter().any(|e| e.key == token) {
            return Err(parse_error(
                &format!("Duplicate entry {key} in state {}", state.name),
                span,
            ));
        }

        state.push(
            &key,
            &parse_symbol(write)?,
            parse_direction(direction.as_str()),
            destination.as_str(),
        )?;
    }

    Ok(state)
}

/// Returns the spelling of a `Pair<Rule::symbol>`, with quotes removed and escapes resolved.
fn parse_symbol(pair: Pair<Rule>) -> Result<String, MachinationError> {
    let Some(inner) = pair.clone().into_inner().next() else {
        return Ok(pair.as_str().to_string());
    };

    match inner.as_rule() {
        Rule::quoted => {
            let raw = inner.into_inner().as_str();
            unescape(raw)
                .map(String::from)
                .ok_or_else(|| MachinationError::InvalidSymbol(raw.to_string()))
        }
        _ => Ok(inner.as_str().to_string()),
    }
}

/// Resolves the content of a quoted symbol.
fn unescape(raw: &str) -> Option<char> {
    let mut chars = raw.chars();
    match (chars.next()?, chars.next()) {
        ('\\', Some(escaped)) => match escaped {
            'n' => Some('\n'),
            't' => Some('\t'),
            '\\' | '\'' => Some(escaped),
            _ => None,
        },
        (c, None) => Some(c),
        _ => None,
    }
}

/// Integers become `DirectionSpec::Integer`; anything else is kept as a name.
fn parse_direction(text: &str) -> DirectionSpec {
    text.parse::<i64>()
        .map(DirectionSpec::Integer)
        .unwrap_or_else(|_| DirectionSpec::Name(text.to_string()))
}

/// Creates a `MachinationError::ParseError` from a message and a `Span`.
fn parse_error(msg: &str, span: Span) -> MachinationError {
    MachinationError::ParseError(Box::new(Error::new_from_span(
        ErrorVariant::CustomError {
            message: msg.to_string(),
        },
        span,
    )))
}

/// Checks if a given section has already been declared.
fn check_unique_rule(
    rule: Rule,
    span: Span,
    seen: &mut HashSet<Rule>,
) -> Result<(), MachinationError> {
    if !matches!(rule, Rule::name | Rule::alphabet | Rule::start | Rule::states) {
        return Ok(());
    };

    if !seen.insert(rule) {
        return Err(parse_error(
            &format!("Duplicate \"{rule:?}:\" declaration"),
            span,
        ));
    }

    Ok(())
}
