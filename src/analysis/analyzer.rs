use std::collections::HashMap;
use std::sync::Arc;
use parking_lot::RwLock;
use rust_stemmers::Algorithm;
use crate::analysis::filter::TokenFilter;
use crate::analysis::filters::lowercase::LowercaseFilter;
use crate::analysis::filters::stemmer::StemmerFilter;
use crate::analysis::filters::stopword::StopWordFilter;
use crate::analysis::token::Token;
use crate::analysis::tokenizer::{AlphanumericTokenizer, Tokenizer, UnicodeWordTokenizer};
use crate::core::error::{Error, ErrorKind, Result};

/// Text analysis pipeline: one tokenizer followed by a chain of filters.
///
/// `analyze` is lazy and restartable; every call tokenizes from the start and
/// depends only on the input text and the pipeline configuration.
pub struct Analyzer {
    pub tokenizer: Box<dyn Tokenizer>,
    pub filters: Vec<Box<dyn TokenFilter>>,
    pub name: String,
}

impl Analyzer {
    pub fn new(name: String, tokenizer: Box<dyn Tokenizer>) -> Self {
        Analyzer {
            tokenizer,
            filters: Vec::new(),
            name,
        }
    }

    pub fn add_filter(mut self, filter: Box<dyn TokenFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn analyze<'a>(&'a self, text: &'a str) -> impl Iterator<Item = Token> + 'a {
        self.tokenizer
            .tokenize(text)
            .filter_map(move |token| {
                self.filters.iter().try_fold(token, |token, filter| filter.filter(token))
            })
    }

    /// Normalized token texts only
    pub fn terms(&self, text: &str) -> Vec<String> {
        self.analyze(text).map(|token| token.text).collect()
    }

    /// Lowercased alphanumeric runs; the default pipeline.
    pub fn standard() -> Self {
        Analyzer::new("standard".to_string(),
                      Box::new(AlphanumericTokenizer::default()))
            .add_filter(Box::new(LowercaseFilter))
    }

    /// Standard pipeline plus English stop words and Snowball stemming
    pub fn english() -> Self {
        Analyzer::new("english".to_string(),
                      Box::new(AlphanumericTokenizer::default()))
            .add_filter(Box::new(LowercaseFilter))
            .add_filter(Box::new(StopWordFilter::english()))
            .add_filter(Box::new(StemmerFilter::new(Algorithm::English)))
    }

    pub fn unicode() -> Self {
        Analyzer::new("unicode".to_string(),
                      Box::new(UnicodeWordTokenizer::default()))
            .add_filter(Box::new(LowercaseFilter))
    }
}

impl Clone for Analyzer {
    fn clone(&self) -> Self {
        Analyzer {
            tokenizer: self.tokenizer.clone_box(),
            filters: self.filters.iter().map(|f| f.clone_box()).collect(),
            name: self.name.clone(),
        }
    }
}

/// Registry for managing analyzers
pub struct AnalyzerRegistry {
    analyzers: RwLock<HashMap<String, Arc<Analyzer>>>,
}

impl AnalyzerRegistry {
    pub fn new() -> Self {
        let registry = AnalyzerRegistry {
            analyzers: RwLock::new(HashMap::new()),
        };

        registry.register(Analyzer::standard());
        registry.register(Analyzer::english());
        registry.register(Analyzer::unicode());
        registry
    }

    /// Registers under the analyzer's own name, replacing any previous entry.
    pub fn register(&self, analyzer: Analyzer) {
        self.analyzers.write().insert(analyzer.name.clone(), Arc::new(analyzer));
    }

    pub fn get(&self, name: &str) -> Result<Arc<Analyzer>> {
        self.analyzers.read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::new(ErrorKind::NotFound, format!("Analyzer '{}' not found", name)))
    }
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_lowercases_and_splits() {
        let analyzer = Analyzer::standard();
        assert_eq!(analyzer.terms("The Quick-Brown FOX!"), vec!["the", "quick", "brown", "fox"]);
    }

    #[test]
    fn analysis_is_restartable() {
        let analyzer = Analyzer::standard();
        let text = "Repeatable Analysis, repeatable RESULTS";
        let first: Vec<Token> = analyzer.analyze(text).collect();
        let second: Vec<Token> = analyzer.analyze(text).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn stop_words_leave_position_gaps() {
        let analyzer = Analyzer::english();
        let tokens: Vec<Token> = analyzer.analyze("the running of the dogs").collect();

        let pairs: Vec<(&str, u32)> = tokens.iter().map(|t| (t.text.as_str(), t.position)).collect();
        assert_eq!(pairs, vec![("run", 1), ("dog", 4)]);
    }

    #[test]
    fn registry_resolves_builtins_and_custom_pipelines() {
        let registry = AnalyzerRegistry::new();
        assert_eq!(registry.get("english").unwrap().name(), "english");

        registry.register(
            Analyzer::new("raw".to_string(), Box::new(AlphanumericTokenizer::default()))
        );
        assert_eq!(registry.get("raw").unwrap().terms("Keep CASE"), vec!["Keep", "CASE"]);

        let err = registry.get("klingon").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
