use std::time::Duration;

use ollama_rs::Ollama;
use ollama_rs::generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest};
use serde::{Deserialize, Serialize};

use crate::error::{LlmError, Result};
use crate::http::default_client;
use crate::provider::LlmProvider;

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Ollama,
    http: reqwest::Client,
    base_url: String,
    embedding_model: String,
    synthesis_model: Option<String>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

impl OllamaProvider {
    /// `timeout` bounds every HTTP call made for answer synthesis.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, embedding_model: String, timeout: Duration) -> Result<Self> {
        let base_url = normalize_base_url(base_url);
        let (host, port) = parse_host_port(&base_url);
        Ok(Self {
            client: Ollama::new(host, port),
            http: default_client(timeout)?,
            base_url,
            embedding_model,
            synthesis_model: None,
        })
    }

    #[must_use]
    pub fn with_synthesis_model(mut self, model: impl Into<String>) -> Self {
        self.synthesis_model = Some(model.into());
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn synthesis_model(&self) -> Option<&str> {
        self.synthesis_model.as_deref()
    }

    async fn embed_many(&self, input: EmbeddingsInput) -> Result<Vec<Vec<f32>>> {
        let request = GenerateEmbeddingsRequest::new(self.embedding_model.clone(), input);
        let response = self
            .client
            .generate_embeddings(request)
            .await
            .map_err(|e| LlmError::Other(format!("Ollama embedding request failed: {e}")))?;
        Ok(response.embeddings)
    }
}

impl LlmProvider for OllamaProvider {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "ollama"
    }

    fn supports_embeddings(&self) -> bool {
        true
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_many(EmbeddingsInput::from(text))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::EmptyResponse {
                provider: "ollama".into(),
            })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = self
            .embed_many(EmbeddingsInput::Multiple(texts.to_vec()))
            .await?;
        if vectors.len() != texts.len() {
            return Err(LlmError::Other(format!(
                "Ollama returned {} embeddings for {} inputs",
                vectors.len(),
                texts.len()
            )));
        }
        Ok(vectors)
    }

    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let Some(model) = self.synthesis_model.as_deref() else {
            return Err(LlmError::GenerateUnsupported {
                provider: "ollama without a synthesis model".into(),
            });
        };
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model,
            prompt,
            stream: false,
            options: GenerateOptions {
                num_predict: max_tokens,
            },
        };

        tracing::debug!(%url, model, max_tokens, "requesting synthesis");
        let response = self.http.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                provider: "ollama".into(),
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let parsed: GenerateResponse = response.json().await?;
        let answer = parsed.response.trim();
        if answer.is_empty() {
            return Err(LlmError::EmptyResponse {
                provider: "ollama".into(),
            });
        }
        Ok(answer.to_owned())
    }
}

/// Trim, default to [`DEFAULT_BASE_URL`], add `http://` when no scheme is
/// given and drop trailing slashes.
#[must_use]
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return DEFAULT_BASE_URL.to_owned();
    }
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_owned()
    } else {
        format!("http://{trimmed}")
    };
    with_scheme.trim_end_matches('/').to_owned()
}

fn parse_host_port(url: &str) -> (String, u16) {
    let url = url.trim_end_matches('/');
    if let Some(colon_pos) = url.rfind(':') {
        let port_str = &url[colon_pos + 1..];
        if let Ok(port) = port_str.parse::<u16>() {
            let host = url[..colon_pos].to_string();
            return (host, port);
        }
    }
    (url.to_string(), 11434)
}
