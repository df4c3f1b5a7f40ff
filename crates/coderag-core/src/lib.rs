//! Configuration loading and construction of the indexer, providers, and tools.

pub mod bootstrap;
pub mod config;

pub use config::Config;
