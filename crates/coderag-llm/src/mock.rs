//! Test-only mock provider.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{LlmError, Result};
use crate::hash::HashEmbedder;
use crate::provider::LlmProvider;

/// Embeds through a [`HashEmbedder`] unless a fixed vector is registered for
/// the exact text; answers synthesis requests from a queue.
#[derive(Debug, Clone)]
pub struct MockProvider {
    responses: Arc<Mutex<Vec<String>>>,
    embed_calls: Arc<AtomicUsize>,
    pub default_response: String,
    pub embeddings: HashMap<String, Vec<f32>>,
    pub hasher: HashEmbedder,
    pub fail_embed: bool,
    pub fail_generate: bool,
    pub embeddings_supported: bool,
    /// Milliseconds to sleep before returning a response.
    pub delay_ms: u64,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            embed_calls: Arc::new(AtomicUsize::new(0)),
            default_response: "mock answer".into(),
            embeddings: HashMap::new(),
            hasher: HashEmbedder::new(64),
            fail_embed: false,
            fail_generate: false,
            embeddings_supported: true,
            delay_ms: 0,
        }
    }
}

impl MockProvider {
    #[must_use]
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing_embed() -> Self {
        Self {
            fail_embed: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing_generate() -> Self {
        Self {
            fail_generate: true,
            ..Self::default()
        }
    }

    /// A generation-only provider.
    #[must_use]
    pub fn without_embeddings() -> Self {
        Self {
            embeddings_supported: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_embedding(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.embeddings.insert(text.into(), vector);
        self
    }

    #[must_use]
    pub fn with_delay(mut self, ms: u64) -> Self {
        self.delay_ms = ms;
        self
    }

    /// Number of texts embedded so far, shared across clones.
    #[must_use]
    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
    }
}

impl LlmProvider for MockProvider {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "mock"
    }

    fn supports_embeddings(&self) -> bool {
        self.embeddings_supported
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.pause().await;
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_embed {
            return Err(LlmError::Other("mock embedding error".into()));
        }
        Ok(self
            .embeddings
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.hasher.embed_text(text)))
    }

    async fn generate(&self, _prompt: &str, _max_tokens: u32) -> Result<String> {
        self.pause().await;
        if self.fail_generate {
            return Err(LlmError::Other("mock synthesis error".into()));
        }
        let mut responses = self
            .responses
            .lock()
            .map_err(|_| LlmError::Other("mock response queue poisoned".into()))?;
        if responses.is_empty() {
            Ok(self.default_response.clone())
        } else {
            Ok(responses.remove(0))
        }
    }
}
