use std::collections::HashSet;
use std::sync::Arc;
use crate::analysis::analyzer::Analyzer;
use crate::core::error::{Error, Result};
use crate::query::ast::{PhraseQuery, Query};
use crate::query::lexer::{self, QueryToken, TokenKind};

/// Query parser for converting query strings to a `Query` tree.
///
/// Precedence is NOT > AND > OR; juxtaposed clauses are ANDed. Words run
/// through the same analyzer the index was built with, so case folding and
/// stemming match. Values on keyword fields are taken verbatim.
pub struct QueryParser {
    pub default_field: String,
    pub analyzer: Arc<Analyzer>,
    pub keyword_fields: HashSet<String>,
}

struct Cursor {
    tokens: Vec<QueryToken>,
    pos: usize,
    end: usize,         // Input length, reported for errors at end of input
}

impl Cursor {
    fn peek(&self) -> Option<&QueryToken> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<QueryToken> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn position(&self) -> usize {
        self.peek().map(|t| t.position).unwrap_or(self.end)
    }

    /// Whether the next token can begin a clause
    fn at_clause_start(&self) -> bool {
        matches!(
            self.peek().map(|t| &t.kind),
            Some(TokenKind::Word(_) | TokenKind::Quoted(_) | TokenKind::Field(_) | TokenKind::LParen
                | TokenKind::Not | TokenKind::Required | TokenKind::Prohibited)
        )
    }
}

impl QueryParser {
    pub fn new(default_field: impl Into<String>, analyzer: Arc<Analyzer>) -> Self {
        QueryParser {
            default_field: default_field.into(),
            analyzer,
            keyword_fields: HashSet::new(),
        }
    }

    pub fn with_keyword_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keyword_fields.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn parse(&self, input: &str) -> Result<Query> {
        if input.trim().is_empty() {
            return Err(Error::parse(0, "empty query"));
        }

        let mut cursor = Cursor {
            tokens: lexer::tokenize(input)?,
            pos: 0,
            end: input.len(),
        };
        let field = self.default_field.clone();
        let query = self.parse_or(&mut cursor, &field)?;

        if let Some(token) = cursor.peek() {
            let message = match token.kind {
                TokenKind::RParen => "unbalanced ')'",
                _ => "unexpected token",
            };
            return Err(Error::parse(token.position, message));
        }

        let query = query.ok_or_else(|| Error::parse(0, "query has no searchable terms"))?;
        check_has_positive(&query)?;
        Ok(query)
    }

    fn parse_or(&self, cursor: &mut Cursor, field: &str) -> Result<Option<Query>> {
        let mut clauses = Vec::new();
        clauses.extend(self.parse_and(cursor, field)?);

        while let Some(TokenKind::Or) = cursor.peek().map(|t| &t.kind) {
            let operator = cursor.position();
            cursor.next();
            if !cursor.at_clause_start() {
                return Err(Error::parse(operator, "dangling OR"));
            }
            clauses.extend(self.parse_and(cursor, field)?);
        }

        Ok(combine(clauses, Query::Or))
    }

    fn parse_and(&self, cursor: &mut Cursor, field: &str) -> Result<Option<Query>> {
        let mut clauses = Vec::new();
        clauses.extend(self.parse_unary(cursor, field)?);

        loop {
            if let Some(TokenKind::And) = cursor.peek().map(|t| &t.kind) {
                let operator = cursor.position();
                cursor.next();
                if !cursor.at_clause_start() {
                    return Err(Error::parse(operator, "dangling AND"));
                }
            } else if !cursor.at_clause_start() {
                break;
            }
            clauses.extend(self.parse_unary(cursor, field)?);
        }

        Ok(combine(clauses, Query::And))
    }

    fn parse_unary(&self, cursor: &mut Cursor, field: &str) -> Result<Option<Query>> {
        match cursor.peek().map(|t| &t.kind) {
            Some(TokenKind::Not | TokenKind::Prohibited) => {
                let operator = cursor.position();
                cursor.next();
                if !cursor.at_clause_start() {
                    return Err(Error::parse(operator, "negation without a clause"));
                }
                Ok(self.parse_unary(cursor, field)?.map(Query::not))
            }
            Some(TokenKind::Required) => {
                let operator = cursor.position();
                cursor.next();
                if !cursor.at_clause_start() {
                    return Err(Error::parse(operator, "'+' without a clause"));
                }
                self.parse_unary(cursor, field)
            }
            _ => self.parse_primary(cursor, field),
        }
    }

    fn parse_primary(&self, cursor: &mut Cursor, field: &str) -> Result<Option<Query>> {
        let position = cursor.position();
        let Some(token) = cursor.next() else {
            return Err(Error::parse(position, "unexpected end of query"));
        };

        match token.kind {
            TokenKind::Word(text) | TokenKind::Quoted(text) => Ok(self.leaf(field, &text)),
            TokenKind::Field(name) => {
                match cursor.peek().map(|t| &t.kind) {
                    Some(TokenKind::Word(_) | TokenKind::Quoted(_) | TokenKind::LParen) => {
                        self.parse_primary(cursor, &name)
                    }
                    _ => Err(Error::parse(cursor.position(), format!("missing value for field '{}'", name))),
                }
            }
            TokenKind::LParen => {
                let inner = self.parse_or(cursor, field)?;
                match cursor.next() {
                    Some(QueryToken { kind: TokenKind::RParen, .. }) => Ok(inner),
                    _ => Err(Error::parse(position, "unbalanced '('")),
                }
            }
            TokenKind::RParen => Err(Error::parse(position, "unbalanced ')'")),
            TokenKind::And | TokenKind::Or => Err(Error::parse(position, "dangling operator")),
            TokenKind::Not | TokenKind::Required | TokenKind::Prohibited => {
                Err(Error::parse(position, "operator without a clause"))
            }
        }
    }

    /// Word or quoted text on `field`. Several tokens make a phrase; text
    /// that analyzes to nothing is dropped.
    fn leaf(&self, field: &str, text: &str) -> Option<Query> {
        if self.keyword_fields.contains(field) {
            return Some(Query::term(field, text));
        }

        let tokens: Vec<_> = self.analyzer.analyze(text).collect();
        match tokens.len() {
            0 => None,
            1 => tokens.into_iter().next().map(|t| Query::term(field, t.text)),
            _ => {
                let base = tokens[0].position;
                Some(Query::Phrase(PhraseQuery {
                    field: field.to_string(),
                    offsets: tokens.iter().map(|t| t.position - base).collect(),
                    terms: tokens.into_iter().map(|t| t.text).collect(),
                }))
            }
        }
    }
}

fn combine(mut clauses: Vec<Query>, group: fn(Vec<Query>) -> Query) -> Option<Query> {
    match clauses.len() {
        0 => None,
        1 => clauses.pop(),
        _ => Some(group(clauses)),
    }
}

/// Reject clause lists (and a whole query) made only of negations
fn check_has_positive(query: &Query) -> Result<()> {
    match query {
        Query::Not(_) => Err(Error::parse(0, "query has only negated clauses")),
        Query::And(children) | Query::Or(children) => {
            if children.iter().all(Query::is_negative) {
                return Err(Error::parse(0, "clause list has only negated clauses"));
            }
            for child in children {
                match child {
                    Query::Not(inner) => check_nested(inner)?,
                    other => check_has_positive(other)?,
                }
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn check_nested(query: &Query) -> Result<()> {
    match query {
        Query::And(_) | Query::Or(_) => check_has_positive(query),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;

    fn parser() -> QueryParser {
        QueryParser::new("content", Arc::new(Analyzer::standard()))
            .with_keyword_fields(["filename"])
    }

    fn parse(input: &str) -> Query {
        parser().parse(input).unwrap()
    }

    fn error_position(input: &str) -> usize {
        let err = parser().parse(input).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse, "{}", input);
        err.position.unwrap()
    }

    #[test]
    fn juxtaposition_is_and_with_case_folding() {
        assert_eq!(parse("Quick FOX"), Query::And(vec![
            Query::term("content", "quick"),
            Query::term("content", "fox"),
        ]));
    }

    #[test]
    fn and_binds_tighter_than_or() {
        assert_eq!(parse("a OR b AND c"), Query::Or(vec![
            Query::term("content", "a"),
            Query::And(vec![Query::term("content", "b"), Query::term("content", "c")]),
        ]));
        assert_eq!(parse("(a || b) && c"), Query::And(vec![
            Query::Or(vec![Query::term("content", "a"), Query::term("content", "b")]),
            Query::term("content", "c"),
        ]));
    }

    #[test]
    fn negation_forms() {
        let expected = Query::And(vec![
            Query::term("content", "fox"),
            Query::not(Query::term("content", "dog")),
        ]);
        assert_eq!(parse("fox -dog"), expected);
        assert_eq!(parse("fox AND NOT dog"), expected);
        assert_eq!(parse("+fox !dog"), expected);
        assert_eq!(parse("fox NOT NOT dog"), Query::And(vec![
            Query::term("content", "fox"),
            Query::term("content", "dog"),
        ]));
    }

    #[test]
    fn quoted_text_and_multi_token_words_become_phrases() {
        let phrase = Query::phrase("content", vec!["brown".into(), "fox".into()]);
        assert_eq!(parse("\"Brown Fox\""), phrase);
        assert_eq!(parse("brown-fox"), phrase);
        assert_eq!(parse("\"fox\""), Query::term("content", "fox"));
    }

    #[test]
    fn field_prefixes_and_keyword_fields() {
        assert_eq!(parse("title:Rust"), Query::term("title", "rust"));
        assert_eq!(parse("filename:A.txt"), Query::term("filename", "A.txt"));
        assert_eq!(parse("title:(a b)"), Query::And(vec![
            Query::term("title", "a"),
            Query::term("title", "b"),
        ]));
    }

    #[test]
    fn words_without_tokens_are_dropped() {
        assert_eq!(parse("fox ..."), Query::term("content", "fox"));
    }

    #[test]
    fn error_positions() {
        assert_eq!(error_position(""), 0);
        assert_eq!(error_position("   "), 0);
        assert_eq!(error_position("fox \"quick"), 4);
        assert_eq!(error_position("(fox AND dog"), 0);
        assert_eq!(error_position("fox dog)"), 7);
        assert_eq!(error_position("fox AND"), 4);
        assert_eq!(error_position("OR fox"), 0);
        assert_eq!(error_position("fox -"), 4);
        assert_eq!(error_position("fox title:"), 10);
    }

    #[test]
    fn negation_only_queries_are_rejected() {
        assert_eq!(error_position("-fox"), 0);
        assert_eq!(error_position("NOT fox AND NOT dog"), 0);
        assert_eq!(error_position("cat (NOT fox -dog)"), 0);
        assert!(parser().parse("cat -(fox dog)").is_ok());
    }

    #[test]
    fn punctuation_only_query_has_no_terms() {
        assert_eq!(error_position("!?. ,"), 0);
    }
}
