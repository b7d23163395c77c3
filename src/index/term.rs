use std::fmt;
use serde::{Serialize, Deserialize};
use crate::core::error::{Error, Result};

const FIELD_SEPARATOR: u8 = 0;

/// A (field, normalized token) pair; the unit of the index vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Term {
    pub field: String,
    pub text: String,
}

impl Term {
    pub fn new(field: impl Into<String>, text: impl Into<String>) -> Self {
        Term { field: field.into(), text: text.into() }
    }

    /// Dictionary key: `field 0x00 text`. Byte order of keys matches `Ord`.
    pub fn key(&self) -> Vec<u8> {
        let mut key = Vec::with_capacity(self.field.len() + 1 + self.text.len());
        key.extend_from_slice(self.field.as_bytes());
        key.push(FIELD_SEPARATOR);
        key.extend_from_slice(self.text.as_bytes());
        key
    }

    pub fn from_key(key: &[u8]) -> Result<Self> {
        let split = key.iter()
            .position(|b| *b == FIELD_SEPARATOR)
            .ok_or_else(|| Error::store("term key without field separator"))?;

        let field = std::str::from_utf8(&key[..split])
            .map_err(|_| Error::store("invalid UTF-8 in term field"))?;
        let text = std::str::from_utf8(&key[split + 1..])
            .map_err(|_| Error::store("invalid UTF-8 in term text"))?;

        Ok(Term::new(field, text))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field, self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_order_follows_term_order() {
        let mut terms = vec![
            Term::new("ab", "a"),
            Term::new("a", "zzz"),
            Term::new("a", "b"),
            Term::new("content", "fox"),
        ];
        let mut keys: Vec<Vec<u8>> = terms.iter().map(Term::key).collect();
        terms.sort();
        keys.sort();

        let decoded: Vec<Term> = keys.iter().map(|k| Term::from_key(k).unwrap()).collect();
        assert_eq!(decoded, terms);
    }

    #[test]
    fn malformed_keys_are_store_errors() {
        assert!(Term::from_key(b"no-separator").is_err());
        assert!(Term::from_key(&[b'f', 0, 0xff]).is_err());
    }
}
