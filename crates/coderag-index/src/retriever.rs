//! Similarity queries against a collection.

use coderag_llm::LlmProvider;

use crate::error::{IndexError, Result};
use crate::gateway::CollectionHandle;
use crate::metadata::{ChunkMetadata, stringify_payload};

/// One cleaned nearest-neighbour hit.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub metadata: ChunkMetadata,
    pub text: String,
    pub distance: f32,
}

impl<P: LlmProvider> CollectionHandle<P> {
    /// Embed `question` with the collection's provider and return the `top_k`
    /// nearest chunks in the order the store ranked them.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidArgument`] for `top_k == 0` before any
    /// embedding or store call, otherwise any provider or store failure.
    pub async fn query(&self, question: &str, top_k: usize) -> Result<Vec<RetrievedChunk>> {
        if top_k == 0 {
            return Err(IndexError::InvalidArgument(
                "top_k must be greater than zero.".into(),
            ));
        }
        let vector = self.provider.embed(question).await?;
        let hits = self.store.search(self.name(), vector, top_k).await?;
        tracing::debug!(collection = self.name(), top_k, hits = hits.len(), "query answered");

        Ok(hits
            .into_iter()
            .map(|hit| RetrievedChunk {
                metadata: ChunkMetadata::from_strings(&stringify_payload(&hit.payload)),
                text: hit.document.unwrap_or_default(),
                distance: hit.distance.unwrap_or(0.0),
            })
            .collect())
    }
}
