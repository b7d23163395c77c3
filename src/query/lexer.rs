use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_till1, take_until},
    character::complete::char,
    combinator::value,
    sequence::{delimited, terminated},
};
use crate::core::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Word(String),
    Quoted(String),
    Field(String),       // `name:` prefix
    LParen,
    RParen,
    And,                 // AND, &&
    Or,                  // OR, ||
    Not,                 // NOT, !
    Required,            // +
    Prohibited,          // -
}

/// Lexed query token with its byte offset in the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryToken {
    pub kind: TokenKind,
    pub position: usize,
}

fn is_word_boundary(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '"' | ':')
}

fn symbol(input: &str) -> IResult<&str, TokenKind> {
    alt((
        value(TokenKind::And, tag("&&")),
        value(TokenKind::Or, tag("||")),
        value(TokenKind::LParen, char('(')),
        value(TokenKind::RParen, char(')')),
        value(TokenKind::Not, char('!')),
        value(TokenKind::Required, char('+')),
        value(TokenKind::Prohibited, char('-')),
    )).parse(input)
}

fn quoted(input: &str) -> IResult<&str, &str> {
    delimited(char('"'), take_until("\""), char('"')).parse(input)
}

fn word(input: &str) -> IResult<&str, &str> {
    take_till1(is_word_boundary).parse(input)
}

fn field(input: &str) -> IResult<&str, &str> {
    terminated(word, char(':')).parse(input)
}

fn keyword_or_word(text: &str) -> TokenKind {
    match text {
        "AND" => TokenKind::And,
        "OR" => TokenKind::Or,
        "NOT" => TokenKind::Not,
        _ => TokenKind::Word(text.to_string()),
    }
}

/// Split a query string into tokens. Fails only on an unterminated quote or
/// a stray `:`.
pub fn tokenize(input: &str) -> Result<Vec<QueryToken>> {
    let mut tokens = Vec::new();
    let mut rest = input.trim_start();

    while !rest.is_empty() {
        let position = input.len() - rest.len();

        let (remaining, kind) = if rest.starts_with('"') {
            let (remaining, text) = quoted(rest)
                .map_err(|_| Error::parse(position, "unterminated quote"))?;
            (remaining, TokenKind::Quoted(text.to_string()))
        } else if let Ok((remaining, kind)) = symbol(rest) {
            (remaining, kind)
        } else if let Ok((remaining, name)) = field(rest) {
            (remaining, TokenKind::Field(name.to_string()))
        } else if let Ok((remaining, text)) = word(rest) {
            (remaining, keyword_or_word(text))
        } else {
            let unexpected = rest.chars().next().unwrap_or(' ');
            return Err(Error::parse(position, format!("unexpected '{}'", unexpected)));
        };

        tokens.push(QueryToken { kind, position });
        rest = remaining.trim_start();
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn operators_fields_and_groups() {
        assert_eq!(kinds("title:rust && (fast || -slow)"), vec![
            TokenKind::Field("title".into()),
            TokenKind::Word("rust".into()),
            TokenKind::And,
            TokenKind::LParen,
            TokenKind::Word("fast".into()),
            TokenKind::Or,
            TokenKind::Prohibited,
            TokenKind::Word("slow".into()),
            TokenKind::RParen,
        ]);
    }

    #[test]
    fn keyword_operators_are_case_sensitive() {
        assert_eq!(kinds("a AND b and NOT c"), vec![
            TokenKind::Word("a".into()),
            TokenKind::And,
            TokenKind::Word("b".into()),
            TokenKind::Word("and".into()),
            TokenKind::Not,
            TokenKind::Word("c".into()),
        ]);
    }

    #[test]
    fn quoted_phrase_keeps_inner_text_and_position() {
        let tokens = tokenize("  +\"brown fox\"").unwrap();
        assert_eq!(tokens[0], QueryToken { kind: TokenKind::Required, position: 2 });
        assert_eq!(tokens[1], QueryToken { kind: TokenKind::Quoted("brown fox".into()), position: 3 });
    }

    #[test]
    fn unterminated_quote_reports_its_offset() {
        let err = tokenize("fox \"quick brown").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert_eq!(err.position, Some(4));
    }

    #[test]
    fn hyphen_inside_a_word_is_not_an_operator() {
        assert_eq!(kinds("well-known"), vec![TokenKind::Word("well-known".into())]);
    }
}
