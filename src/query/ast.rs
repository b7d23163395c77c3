use std::fmt;
use serde::{Serialize, Deserialize};

/// Main query enum. Leaves address one field; inner nodes combine children.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Query {
    Term(TermQuery),         // Single normalized token
    Phrase(PhraseQuery),     // Tokens at fixed relative positions
    And(Vec<Query>),
    Or(Vec<Query>),
    Not(Box<Query>),         // Only meaningful inside And/Or
}

/// Single term query
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TermQuery {
    pub field: String,
    pub text: String,
}

/// Phrase query. `offsets[i]` is the position of `terms[i]` relative to the
/// first term, as produced by the analyzer (stop words leave gaps).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhraseQuery {
    pub field: String,
    pub terms: Vec<String>,
    pub offsets: Vec<u32>,
}

impl Query {
    pub fn term(field: impl Into<String>, text: impl Into<String>) -> Self {
        Query::Term(TermQuery { field: field.into(), text: text.into() })
    }

    /// Phrase with consecutive offsets
    pub fn phrase(field: impl Into<String>, terms: Vec<String>) -> Self {
        let offsets = (0..terms.len() as u32).collect();
        Query::Phrase(PhraseQuery { field: field.into(), terms, offsets })
    }

    /// Negate, collapsing `NOT NOT q` to `q`.
    pub fn not(query: Query) -> Self {
        match query {
            Query::Not(inner) => *inner,
            other => Query::Not(Box::new(other)),
        }
    }

    pub fn is_negative(&self) -> bool {
        matches!(self, Query::Not(_))
    }

    /// Texts of non-negated leaves on `field`, in query order
    pub fn positive_terms(&self, field: &str) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_positive(field, &mut out);
        out
    }

    fn collect_positive(&self, field: &str, out: &mut Vec<String>) {
        match self {
            Query::Term(t) if t.field == field => out.push(t.text.clone()),
            Query::Phrase(p) if p.field == field => out.extend(p.terms.iter().cloned()),
            Query::And(children) | Query::Or(children) => {
                for child in children {
                    child.collect_positive(field, out);
                }
            }
            _ => {}
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Term(t) => write!(f, "{}:{}", t.field, t.text),
            Query::Phrase(p) => write!(f, "{}:\"{}\"", p.field, p.terms.join(" ")),
            Query::And(children) => write_group(f, children, " AND "),
            Query::Or(children) => write_group(f, children, " OR "),
            Query::Not(inner) => write!(f, "NOT {}", inner),
        }
    }
}

fn write_group(f: &mut fmt::Formatter<'_>, children: &[Query], separator: &str) -> fmt::Result {
    write!(f, "(")?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", separator)?;
        }
        write!(f, "{}", child)?;
    }
    write!(f, ")")
}
