//! Embedding and synthesis providers.
//!
//! Every component that turns text into vectors receives an explicit provider
//! value; nothing in the pipeline reaches for a process-wide embedder.

pub mod any;
pub mod error;
pub mod hash;
pub mod http;
#[cfg(feature = "mock")]
pub mod mock;
pub mod ollama;
pub mod provider;

pub use error::{LlmError, Result};
pub use provider::LlmProvider;
