use std::future::Future;

use crate::error::{LlmError, Result};

/// Capability shared by ingest and query: turn text into vectors and,
/// optionally, produce an answer from a prompt.
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    fn supports_embeddings(&self) -> bool;

    /// Embed a single text.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or returns no vector.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>>> + Send;

    /// Embed several texts, preserving order.
    ///
    /// The default issues one [`LlmProvider::embed`] call per text; backends with a
    /// native batch endpoint override it.
    ///
    /// # Errors
    ///
    /// Returns the first embedding failure.
    fn embed_batch(&self, texts: &[String]) -> impl Future<Output = Result<Vec<Vec<f32>>>> + Send {
        async move {
            let mut vectors = Vec::with_capacity(texts.len());
            for text in texts {
                vectors.push(self.embed(text).await?);
            }
            Ok(vectors)
        }
    }

    /// Generate a completion for `prompt`, capped at `max_tokens`.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::GenerateUnsupported`] unless the backend overrides it.
    fn generate(
        &self,
        prompt: &str,
        max_tokens: u32,
    ) -> impl Future<Output = Result<String>> + Send {
        let _ = (prompt, max_tokens);
        let provider = self.name().to_owned();
        async move { Err(LlmError::GenerateUnsupported { provider }) }
    }
}
