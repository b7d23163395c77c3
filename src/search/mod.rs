pub mod results;
pub mod evaluator;
pub mod snippet;
pub mod searcher;
pub mod cache;
