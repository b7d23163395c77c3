use std::str::CharIndices;
use crate::analysis::token::Token;
use unicode_segmentation::UnicodeSegmentation;

/// Lazy token sequence borrowed from the analyzed text.
pub type TokenStream<'a> = Box<dyn Iterator<Item = Token> + 'a>;

pub trait Tokenizer: Send + Sync {
    fn tokenize<'a>(&self, text: &'a str) -> TokenStream<'a>;

    fn name(&self) -> &str;

    fn clone_box(&self) -> Box<dyn Tokenizer>;
}

/// Splits on every non-alphanumeric character. Tokens longer than
/// `max_token_length` bytes are skipped but still consume a position.
#[derive(Clone)]
pub struct AlphanumericTokenizer {
    pub max_token_length: usize,
}

impl Default for AlphanumericTokenizer {
    fn default() -> Self {
        AlphanumericTokenizer {
            max_token_length: 255,
        }
    }
}

impl Tokenizer for AlphanumericTokenizer {
    fn tokenize<'a>(&self, text: &'a str) -> TokenStream<'a> {
        Box::new(AlphanumericTokens {
            text,
            chars: text.char_indices(),
            position: 0,
            max_token_length: self.max_token_length,
        })
    }

    fn name(&self) -> &str {
        "alphanumeric"
    }

    fn clone_box(&self) -> Box<dyn Tokenizer> {
        Box::new(self.clone())
    }
}

struct AlphanumericTokens<'a> {
    text: &'a str,
    chars: CharIndices<'a>,
    position: u32,
    max_token_length: usize,
}

impl<'a> Iterator for AlphanumericTokens<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            let start = loop {
                let (idx, c) = self.chars.next()?;
                if c.is_alphanumeric() {
                    break idx;
                }
            };

            let mut end = self.text.len();
            for (idx, c) in self.chars.by_ref() {
                if !c.is_alphanumeric() {
                    end = idx;
                    break;
                }
            }

            let position = self.position;
            self.position += 1;

            if end - start <= self.max_token_length {
                return Some(Token::new(self.text[start..end].to_string(), position, start));
            }
        }
    }
}

/// Unicode word-boundary tokenizer (UAX #29)
#[derive(Clone)]
pub struct UnicodeWordTokenizer {
    pub max_token_length: usize,
}

impl Default for UnicodeWordTokenizer {
    fn default() -> Self {
        UnicodeWordTokenizer {
            max_token_length: 255,
        }
    }
}

impl Tokenizer for UnicodeWordTokenizer {
    fn tokenize<'a>(&self, text: &'a str) -> TokenStream<'a> {
        let max_token_length = self.max_token_length;
        Box::new(
            text.unicode_word_indices()
                .enumerate()
                .filter(move |(_, (_, word))| word.len() <= max_token_length)
                .map(|(position, (offset, word))| Token::new(word.to_string(), position as u32, offset)),
        )
    }

    fn name(&self) -> &str {
        "unicode"
    }

    fn clone_box(&self) -> Box<dyn Tokenizer> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(stream: TokenStream<'_>) -> Vec<String> {
        stream.map(|t| t.text).collect()
    }

    #[test]
    fn splits_on_non_alphanumeric_boundaries() {
        let tokenizer = AlphanumericTokenizer::default();
        let tokens: Vec<Token> = tokenizer.tokenize("  Hello, world!--42x ").collect();

        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0], Token::new("Hello".to_string(), 0, 2));
        assert_eq!(tokens[1].text, "world");
        assert_eq!(tokens[1].offset, 9);
        assert_eq!(tokens[2].text, "42x");
        assert_eq!(tokens[2].position, 2);
    }

    #[test]
    fn empty_and_punctuation_only_inputs_yield_nothing() {
        let tokenizer = AlphanumericTokenizer::default();
        assert!(texts(tokenizer.tokenize("")).is_empty());
        assert!(texts(tokenizer.tokenize("... -- !!")).is_empty());
    }

    #[test]
    fn overlong_tokens_are_skipped_but_keep_their_position() {
        let tokenizer = AlphanumericTokenizer { max_token_length: 4 };
        let tokens: Vec<Token> = tokenizer.tokenize("tiny enormous end").collect();

        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].text, "end");
        assert_eq!(tokens[1].position, 2);
    }

    #[test]
    fn non_ascii_letters_stay_inside_tokens() {
        let tokenizer = AlphanumericTokenizer::default();
        assert_eq!(texts(tokenizer.tokenize("café über-straße")), vec!["café", "über", "straße"]);
    }

    #[test]
    fn unicode_tokenizer_keeps_apostrophes() {
        let tokenizer = UnicodeWordTokenizer::default();
        assert_eq!(texts(tokenizer.tokenize("can't stop")), vec!["can't", "stop"]);
    }
}
