//! The user alphabet and the effective symbol set derived from it.

use crate::types::{MachinationError, Symbol, Token, TEMPLATE_SENTINEL};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;

/// The symbols a machine may find on its tape, as declared by the user.
///
/// `Blank` and `End` are always part of the effective alphabet, whether or not the user
/// listed them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Alphabet {
    symbols: BTreeSet<Symbol>,
}

impl Alphabet {
    /// Builds an alphabet where every character of `chars` is a symbol.
    ///
    /// The template sentinel is rejected: an instance named after it would read as a
    /// template again.
    pub fn from_chars(chars: &str) -> Result<Self, MachinationError> {
        let symbols = chars
            .chars()
            .map(|c| match c {
                TEMPLATE_SENTINEL => Err(MachinationError::ReservedSymbol(c.to_string())),
                _ => Ok(Symbol::Char(c)),
            })
            .collect::<Result<_, _>>()?;

        Ok(Self { symbols })
    }

    /// Builds an alphabet from individual symbol spellings.
    ///
    /// `NUL` and `EOT` are accepted. Control words and the template sentinel are rejected.
    pub fn from_symbols<I, S>(symbols: I) -> Result<Self, MachinationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let symbols = symbols
            .into_iter()
            .map(|s| match s.as_ref().parse::<Token>()? {
                Token::Symbol(symbol) => Ok(symbol),
                _ => Err(MachinationError::ReservedSymbol(s.as_ref().to_string())),
            })
            .collect::<Result<_, _>>()?;

        Ok(Self { symbols })
    }

    /// The declared symbols plus `Blank` and `End`, in enumeration order.
    pub fn effective(&self) -> BTreeSet<Symbol> {
        let mut symbols = self.symbols.clone();
        symbols.insert(Symbol::Blank);
        symbols.insert(Symbol::End);
        symbols
    }

    pub fn contains(&self, symbol: Symbol) -> bool {
        symbol.is_reserved() || self.symbols.contains(&symbol)
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl Serialize for Alphabet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let chars: String = self
            .symbols
            .iter()
            .filter_map(|symbol| match symbol {
                Symbol::Char(c) => Some(*c),
                _ => None,
            })
            .collect();
        serializer.serialize_str(&chars)
    }
}

/// Accepts either a string of characters or a list of symbol spellings.
impl<'de> Deserialize<'de> for Alphabet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Chars(String),
            Symbols(Vec<String>),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Chars(chars) => Alphabet::from_chars(&chars).map_err(serde::de::Error::custom),
            Raw::Symbols(symbols) => {
                Alphabet::from_symbols(symbols).map_err(serde::de::Error::custom)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_alphabet_adds_reserved_symbols() {
        let alphabet = Alphabet::from_chars("10").unwrap();
        let effective: Vec<_> = alphabet.effective().into_iter().collect();

        assert_eq!(
            effective,
            vec![Symbol::Char('0'), Symbol::Char('1'), Symbol::Blank, Symbol::End]
        );
    }

    #[test]
    fn test_empty_alphabet() {
        let alphabet = Alphabet::from_chars("").unwrap();
        assert!(alphabet.is_empty());
        assert_eq!(alphabet.effective().len(), 2);
        assert!(alphabet.contains(Symbol::Blank));
        assert!(!alphabet.contains(Symbol::Char('a')));
    }

    #[test]
    fn test_duplicate_chars_collapse() {
        let alphabet = Alphabet::from_chars("abba").unwrap();
        assert_eq!(alphabet.effective().len(), 4);
    }

    #[test]
    fn test_from_symbols() {
        let alphabet = Alphabet::from_symbols(["a", "NUL", "b"]).unwrap();
        assert_eq!(alphabet.effective().len(), 4);
        assert!(alphabet.contains(Symbol::Char('b')));
    }

    #[test]
    fn test_from_symbols_rejects_control_words() {
        for word in ["ELSE", "SAME", "DOT"] {
            let result = Alphabet::from_symbols(["a", word]);
            assert!(matches!(result, Err(MachinationError::ReservedSymbol(ref w)) if w == word));
        }

        let result = Alphabet::from_symbols(["ab"]);
        assert!(matches!(result, Err(MachinationError::InvalidSymbol(_))));
    }

    #[test]
    fn test_sentinel_is_not_a_symbol() {
        let result = Alphabet::from_chars("a.");
        assert!(matches!(result, Err(MachinationError::ReservedSymbol(ref w)) if w == "."));

        let result = Alphabet::from_symbols(["a", "."]);
        assert!(matches!(result, Err(MachinationError::ReservedSymbol(ref w)) if w == "."));

        assert!(serde_json::from_str::<Alphabet>(r#""a.""#).is_err());
    }

    #[test]
    fn test_deserialize_both_forms() {
        let chars: Alphabet = serde_json::from_str(r#""01""#).unwrap();
        let list: Alphabet = serde_json::from_str(r#"["0", "1"]"#).unwrap();
        assert_eq!(chars, list);

        assert!(serde_json::from_str::<Alphabet>(r#"["ELSE"]"#).is_err());
        assert_eq!(serde_json::to_string(&chars).unwrap(), r#""01""#);
    }
}
