//! This module provides the renderers that turn a [`FlattenedTable`] into text: a readable
//! listing, a formal transition-function listing, and a C header a runtime can
//! `#include`.

use crate::flatten::FlattenedTable;
use crate::types::{Direction, MachinationError, Rule, Symbol};
use indexmap::IndexMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

/// Default file written by [`CodeTable`].
pub const DEFAULT_CODE_TABLE_PATH: &str = "rules.h";

/// Formats a flattened table, rule by rule.
pub trait Renderer {
    /// Formats one rule of `state`.
    fn render_rule(&self, state: &str, rule: &Rule) -> Result<String, MachinationError>;

    /// Formats a state as its rules, one per line.
    fn render_state(&self, state: &str, rules: &[Rule]) -> Result<String, MachinationError> {
        Ok(rules
            .iter()
            .map(|rule| self.render_rule(state, rule))
            .collect::<Result<Vec<_>, _>>()?
            .join("\n"))
    }

    /// Formats every state, in table order.
    fn render_all(&self, table: &FlattenedTable) -> Result<String, MachinationError> {
        Ok(table
            .iter()
            .map(|(state, rules)| self.render_state(state, rules))
            .collect::<Result<Vec<_>, _>>()?
            .join("\n"))
    }
}

/// A listing meant to be read by people.
///
/// ```text
/// scan:
///   0:   "1",   right, scan
///   1:   "1",   left,  final
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Human;

impl Renderer for Human {
    fn render_rule(&self, _state: &str, rule: &Rule) -> Result<String, MachinationError> {
        let read = format!("{}:", rule.read);
        let write = format!("\"{}\",", rule.write);
        let direction = match rule.direction {
            Direction::Halt => "0,",
            Direction::Right => "right,",
            Direction::Left => "left,",
        };

        Ok(format!(
            "  {read:4} {write:6} {direction:6} {}",
            rule.next_state
        ))
    }

    fn render_state(&self, state: &str, rules: &[Rule]) -> Result<String, MachinationError> {
        let mut lines = vec![format!("{state}:")];
        lines.extend(
            rules
                .iter()
                .map(|rule| self.render_rule(state, rule))
                .collect::<Result<Vec<_>, _>>()?,
        );

        Ok(lines.join("\n"))
    }
}

/// One line per transition: `(state, read) -> (write, direction, next)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Formal;

impl Renderer for Formal {
    fn render_rule(&self, state: &str, rule: &Rule) -> Result<String, MachinationError> {
        let direction = match rule.direction {
            Direction::Halt => "final",
            Direction::Right => "right",
            Direction::Left => "left",
        };

        Ok(format!(
            "({state}, {}) -> ({}, {direction}, {})",
            rule.read, rule.write, rule.next_state
        ))
    }
}

/// A C header holding the table as an array of `struct rule`.
///
/// States are numbered: `start` is 0 and every other name, whether it has rules or only
/// appears as a destination, gets the next free id in order of first appearance.
#[derive(Debug, Clone)]
pub struct CodeTable {
    pub start: String,
    pub path: PathBuf,
}

impl CodeTable {
    pub fn new(start: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            start: start.into(),
            path: path.into(),
        }
    }

    /// Builds the header text without touching the file system.
    pub fn generate(&self, table: &FlattenedTable) -> Result<String, MachinationError> {
        let ids = self.state_ids(table)?;
        let mut out = String::from(HEADER_PRELUDE);

        let mut count = 0;
        for (state, rules) in table.iter() {
            for rule in rules {
                out.push_str(&format!(
                    "  {{{}, {}, {}, {}, {}}},\n",
                    ids[state],
                    symbol_literal(rule.read)?,
                    symbol_literal(rule.write)?,
                    rule.direction.code(),
                    ids[rule.next_state.as_str()],
                ));
                count += 1;
            }
        }

        out.push_str("};\n\n");
        out.push_str(&format!("#define RULES_SIZE {count}\n"));

        Ok(out)
    }

    /// Maps every state name to its numeric id.
    pub fn state_ids<'t>(
        &self,
        table: &'t FlattenedTable,
    ) -> Result<IndexMap<&'t str, usize>, MachinationError> {
        let (start, _) = table
            .iter()
            .find(|(state, _)| *state == self.start)
            .ok_or_else(|| MachinationError::UndefinedStartState(self.start.clone()))?;

        let mut ids = IndexMap::new();
        ids.insert(start, 0);

        for (state, rules) in table.iter() {
            let next = ids.len();
            ids.entry(state).or_insert(next);
            for rule in rules {
                let next = ids.len();
                ids.entry(rule.next_state.as_str()).or_insert(next);
            }
        }

        Ok(ids)
    }
}

impl Default for CodeTable {
    fn default() -> Self {
        Self::new(crate::types::DEFAULT_START_STATE, DEFAULT_CODE_TABLE_PATH)
    }
}

impl Renderer for CodeTable {
    fn render_rule(&self, _state: &str, _rule: &Rule) -> Result<String, MachinationError> {
        Err(MachinationError::NotSupported(
            "the code table renders whole tables only".to_string(),
        ))
    }

    fn render_state(&self, _state: &str, _rules: &[Rule]) -> Result<String, MachinationError> {
        Err(MachinationError::NotSupported(
            "the code table renders whole tables only".to_string(),
        ))
    }

    /// Writes the header to `self.path` and returns it.
    fn render_all(&self, table: &FlattenedTable) -> Result<String, MachinationError> {
        let header = self.generate(table)?;

        let file_error = |e: std::io::Error| {
            MachinationError::FileError(format!(
                "Failed to write {}: {}",
                self.path.display(),
                e
            ))
        };

        let mut writer = BufWriter::new(File::create(&self.path).map_err(file_error)?);
        writer.write_all(header.as_bytes()).map_err(file_error)?;
        writer.flush().map_err(file_error)?;

        info!(path = %self.path.display(), rules = table.rule_count(), "wrote code table");
        Ok(header)
    }
}

const HEADER_PRELUDE: &str = "\
#pragma once

#define NUL '\\0'
#define EOT '\\x04'

#define LEFT -1
#define FINAL 0
#define RIGHT 1

struct rule
{
  int state;
  char read;
  char write;
  int dir;
  int destination;
};

static const struct rule rules[] = {
";

/// Spells a symbol as a C character literal.
///
/// Only ASCII fits the runtime's `char` fields; anything else is refused.
fn symbol_literal(symbol: Symbol) -> Result<String, MachinationError> {
    let literal = match symbol {
        Symbol::Blank => "NUL".to_string(),
        Symbol::End => "EOT".to_string(),
        Symbol::Char('\\') => "'\\\\'".to_string(),
        Symbol::Char('\'') => "'\\''".to_string(),
        Symbol::Char('\n') => "'\\n'".to_string(),
        Symbol::Char('\t') => "'\\t'".to_string(),
        Symbol::Char(c) if c.is_ascii_graphic() || c == ' ' => format!("'{c}'"),
        Symbol::Char(c) if c.is_ascii() => format!("'\\x{:02x}'", c as u32),
        Symbol::Char(c) => {
            return Err(MachinationError::NotSupported(format!(
                "symbol {c:?} does not fit in a C char"
            )))
        }
    };

    Ok(literal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Alphabet;
    use crate::flatten::flatten_machine;
    use crate::parser::parse;
    use tempfile::tempdir;

    fn scan_table() -> FlattenedTable {
        let machine = parse(
            r#"
alphabet: 01
states:
  start:
    0 -> 1, right, SAME
    ELSE -> SAME, left, final
"#,
        )
        .unwrap();

        flatten_machine(&machine).unwrap()
    }

    #[test]
    fn test_human_renderer() {
        let rendered = Human.render_all(&scan_table()).unwrap();
        let lines: Vec<_> = rendered.lines().collect();

        assert_eq!(lines[0], "start:");
        assert_eq!(lines[1], "  0:   \"1\",   right, start");
        assert_eq!(lines[2], "  1:   \"1\",   left,  final");
        assert_eq!(lines[3], "  NUL: \"NUL\", left,  final");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn test_human_renderer_halt() {
        let rule = Rule {
            read: Symbol::Char('a'),
            write: Symbol::Char('a'),
            direction: Direction::Halt,
            next_state: "done".into(),
        };

        assert_eq!(
            Human.render_rule("s", &rule).unwrap(),
            "  a:   \"a\",   0,     done"
        );
    }

    #[test]
    fn test_formal_renderer() {
        let rendered = Formal.render_all(&scan_table()).unwrap();
        let lines: Vec<_> = rendered.lines().collect();

        assert_eq!(lines[0], "(start, 0) -> (1, right, start)");
        assert_eq!(lines[3], "(start, EOT) -> (EOT, left, final)");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_state_ids() {
        let table = scan_table();
        let ids = CodeTable::default().state_ids(&table).unwrap();

        assert_eq!(ids["start"], 0);
        assert_eq!(ids["final"], 1);
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn test_start_state_gets_id_zero() {
        let machine = parse(
            r#"
alphabet: a
start: b
states:
  a:
    a -> a, right, b
  b:
    a -> a, 0, c
"#,
        )
        .unwrap();
        let table = flatten_machine(&machine).unwrap();
        let ids = CodeTable::new("b", "unused.h").state_ids(&table).unwrap();

        assert_eq!(ids["b"], 0);
        assert_eq!(ids["a"], 1);
        assert_eq!(ids["c"], 2);
    }

    #[test]
    fn test_missing_start_state() {
        let table = scan_table();
        let error = CodeTable::new("nope", "unused.h").generate(&table).unwrap_err();
        assert!(matches!(error, MachinationError::UndefinedStartState(ref s) if s == "nope"));
    }

    #[test]
    fn test_code_table_rows() {
        let header = CodeTable::default().generate(&scan_table()).unwrap();

        assert!(header.contains("  {0, '0', '1', 1, 0},\n"));
        assert!(header.contains("  {0, '1', '1', -1, 1},\n"));
        assert!(header.contains("  {0, NUL, NUL, -1, 1},\n"));
        assert!(header.contains("  {0, EOT, EOT, -1, 1},\n"));
        assert!(header.ends_with("#define RULES_SIZE 4\n"));
    }

    #[test]
    fn test_symbol_escaping() {
        assert_eq!(symbol_literal(Symbol::Char('\\')).unwrap(), r"'\\'");
        assert_eq!(symbol_literal(Symbol::Char('\'')).unwrap(), r"'\''");
        assert_eq!(symbol_literal(Symbol::Char('"')).unwrap(), "'\"'");
        assert_eq!(symbol_literal(Symbol::Char(' ')).unwrap(), "' '");
        assert_eq!(symbol_literal(Symbol::Char('\r')).unwrap(), r"'\x0d'");
        assert_eq!(symbol_literal(Symbol::Char('\0')).unwrap(), r"'\x00'");
        assert_eq!(symbol_literal(Symbol::Char('\x7f')).unwrap(), r"'\x7f'");
        assert_eq!(symbol_literal(Symbol::Blank).unwrap(), "NUL");
    }

    #[test]
    fn test_code_table_rejects_non_ascii_symbols() {
        let machine = parse("alphabet: é\nstates:\n  start:\n    ELSE -> SAME, right, SAME").unwrap();
        let table = flatten_machine(&machine).unwrap();

        let error = CodeTable::default().generate(&table).unwrap_err();
        assert!(matches!(error, MachinationError::NotSupported(ref m) if m.contains('é')));
    }

    #[test]
    fn test_code_table_rejects_rule_rendering() {
        let table = scan_table();
        let rules = table.get("start").unwrap();

        let error = CodeTable::default().render_rule("start", &rules[0]).unwrap_err();
        assert!(matches!(error, MachinationError::NotSupported(_)));
    }

    #[test]
    fn test_code_table_writes_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rules.h");
        let table = scan_table();

        let rendered = CodeTable::new("start", &path).render_all(&table).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();

        assert_eq!(rendered, written);
        assert!(written.starts_with("#pragma once"));
    }

    #[test]
    fn test_code_table_unwritable_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("rules.h");

        let error = CodeTable::new("start", path)
            .render_all(&scan_table())
            .unwrap_err();
        assert!(matches!(error, MachinationError::FileError(_)));
    }

    #[test]
    fn test_empty_alphabet_table() {
        let machine = parse("alphabet:\nstates:\n  start:\n    ELSE -> SAME, 0, start").unwrap();
        assert_eq!(machine.alphabet, Alphabet::from_chars("").unwrap());

        let header = CodeTable::default()
            .generate(&flatten_machine(&machine).unwrap())
            .unwrap();
        assert!(header.ends_with("#define RULES_SIZE 2\n"));
    }
}
