pub mod types;
pub mod engine;
pub mod config;
pub mod error;
pub mod cancel;
