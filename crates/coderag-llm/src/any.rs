use crate::error::Result;
use crate::hash::HashEmbedder;
#[cfg(feature = "mock")]
use crate::mock::MockProvider;
use crate::ollama::OllamaProvider;
use crate::provider::LlmProvider;

/// Generates a match over every `AnyProvider` variant, binding the inner
/// provider to `$p` and evaluating `$expr` for each arm.
macro_rules! delegate_provider {
    ($self:expr, |$p:ident| $expr:expr) => {
        match $self {
            AnyProvider::Ollama($p) => $expr,
            AnyProvider::Local($p) => $expr,
            #[cfg(feature = "mock")]
            AnyProvider::Mock($p) => $expr,
        }
    };
}

#[derive(Debug, Clone)]
pub enum AnyProvider {
    Ollama(OllamaProvider),
    Local(HashEmbedder),
    #[cfg(feature = "mock")]
    Mock(MockProvider),
}

impl LlmProvider for AnyProvider {
    fn name(&self) -> &str {
        delegate_provider!(self, |p| p.name())
    }

    fn supports_embeddings(&self) -> bool {
        delegate_provider!(self, |p| p.supports_embeddings())
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        delegate_provider!(self, |p| p.embed(text).await)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        delegate_provider!(self, |p| p.embed_batch(texts).await)
    }

    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        delegate_provider!(self, |p| p.generate(prompt, max_tokens).await)
    }
}

impl From<OllamaProvider> for AnyProvider {
    fn from(p: OllamaProvider) -> Self {
        Self::Ollama(p)
    }
}

impl From<HashEmbedder> for AnyProvider {
    fn from(p: HashEmbedder) -> Self {
        Self::Local(p)
    }
}

#[cfg(feature = "mock")]
impl From<MockProvider> for AnyProvider {
    fn from(p: MockProvider) -> Self {
        Self::Mock(p)
    }
}
