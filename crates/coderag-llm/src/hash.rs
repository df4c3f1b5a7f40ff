//! Offline feature-hashing embedder.
//!
//! Splits text into identifier-like tokens, hashes each token into a fixed
//! number of signed buckets and L2-normalises the result. Deterministic across
//! runs and machines, so an index built with it can be queried later without
//! any model download or network service.

use crate::error::Result;
use crate::provider::LlmProvider;

pub const DEFAULT_DIMENSION: usize = 384;

#[derive(Debug, Clone, Copy)]
pub struct HashEmbedder {
    dimension: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

impl HashEmbedder {
    /// A zero `dimension` is raised to 1.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[must_use]
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in tokens(text) {
            let (bucket, sign) = self.bucket(&token);
            vector[bucket] += sign;
        }
        normalize(&mut vector);
        vector
    }

    fn bucket(&self, token: &str) -> (usize, f32) {
        let hash = blake3::hash(token.as_bytes());
        let bytes = hash.as_bytes();
        let mut head = [0u8; 8];
        head.copy_from_slice(&bytes[..8]);
        let raw = u64::from_le_bytes(head);
        // dimension fits in u64 on every supported target
        let bucket = usize::try_from(raw % self.dimension as u64).unwrap_or(0);
        let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
        (bucket, sign)
    }
}

/// Lower-cased identifier tokens; `snake_case` words also contribute their parts.
fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|word| !word.is_empty())
        .flat_map(|word| {
            let lower = word.to_lowercase();
            let parts: Vec<String> = if lower.contains('_') {
                lower
                    .split('_')
                    .filter(|p| !p.is_empty())
                    .map(str::to_owned)
                    .collect()
            } else {
                Vec::new()
            };
            std::iter::once(lower).chain(parts)
        })
}

fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

impl LlmProvider for HashEmbedder {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "local-hash"
    }

    fn supports_embeddings(&self) -> bool {
        true
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }
}
