use rust_stemmers::{Algorithm, Stemmer};
use crate::analysis::filter::TokenFilter;
use crate::analysis::token::Token;

pub struct StemmerFilter {
    pub algorithm: Algorithm,
    stemmer: Stemmer,
}

impl StemmerFilter {
    pub fn new(algorithm: Algorithm) -> Self {
        StemmerFilter {
            algorithm,
            stemmer: Stemmer::create(algorithm),
        }
    }
}

impl TokenFilter for StemmerFilter {
    fn filter(&self, mut token: Token) -> Option<Token> {
        let stemmed = self.stemmer.stem(&token.text);
        if stemmed != token.text {
            token.text = stemmed.into_owned();
        }
        Some(token)
    }

    fn name(&self) -> &str {
        "stemmer"
    }

    fn clone_box(&self) -> Box<dyn TokenFilter> {
        Box::new(StemmerFilter::new(self.algorithm))
    }
}
