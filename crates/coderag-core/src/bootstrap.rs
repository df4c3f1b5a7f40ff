//! Build providers, the indexer, and the tool surface from a loaded [`Config`].

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use coderag_index::chunker::ChunkerConfig;
use coderag_index::indexer::IngestOptions;
use coderag_index::selector::FileSelector;
use coderag_llm::any::AnyProvider;
use coderag_llm::hash::HashEmbedder;
use coderag_llm::ollama::OllamaProvider;
use coderag_tools::{CodebaseTools, ToolDefaults};

use crate::config::{Config, ProviderKind};

/// The embedding provider used for both ingest and query.
///
/// # Errors
///
/// Returns an error if the HTTP client for Ollama cannot be built.
pub fn create_embedder(config: &Config) -> anyhow::Result<AnyProvider> {
    match config.llm.provider {
        ProviderKind::Local => Ok(HashEmbedder::default().into()),
        ProviderKind::Ollama => {
            let provider = OllamaProvider::new(
                &config.llm.base_url,
                config.llm.embedding_model.clone(),
                Duration::from_secs(config.llm.timeout),
            )
            .context("failed to create Ollama embedding provider")?;
            Ok(provider.into())
        }
    }
}

/// The synthesis provider, present only when a synthesis model is configured.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built.
pub fn create_synthesis(config: &Config) -> anyhow::Result<Option<AnyProvider>> {
    let Some(model) = config.llm.synthesis_model.as_deref() else {
        return Ok(None);
    };
    let provider = OllamaProvider::new(
        &config.llm.base_url,
        config.llm.embedding_model.clone(),
        Duration::from_secs(config.llm.timeout),
    )
    .context("failed to create Ollama synthesis provider")?
    .with_synthesis_model(model);
    tracing::debug!(model, base_url = provider.base_url(), "synthesis enabled");
    Ok(Some(provider.into()))
}

#[must_use]
pub fn tool_defaults(config: &Config) -> ToolDefaults {
    ToolDefaults {
        db_dir: config.index.db_dir.clone(),
        collection: config.index.collection.clone(),
        top_k: config.query.top_k,
        rows_limit: config.query.rows_limit,
    }
}

/// Tool surface wired to the configured embedder and optional synthesis.
///
/// # Errors
///
/// Returns an error if a provider cannot be created.
pub fn create_tools(config: &Config) -> anyhow::Result<CodebaseTools<AnyProvider>> {
    let tools = CodebaseTools::new(Arc::new(create_embedder(config)?), tool_defaults(config));
    Ok(match create_synthesis(config)? {
        Some(synthesis) => tools.with_synthesis(
            Arc::new(synthesis),
            config.llm.max_tokens,
            Duration::from_secs(config.llm.timeout),
        ),
        None => tools,
    })
}

/// # Errors
///
/// Returns an error if `batch_size` is zero.
pub fn ingest_options(config: &Config, reset: bool) -> anyhow::Result<IngestOptions> {
    let ingest = &config.ingest;
    Ok(IngestOptions {
        collection: config.index.collection.clone(),
        selector: FileSelector::new(
            ingest.extensions.clone(),
            ingest.include_hidden,
            ingest.max_file_mb,
        ),
        chunker: ChunkerConfig {
            chunk_lines: ingest.chunk_lines,
            chunk_overlap: ingest.chunk_overlap,
        },
        batch_size: NonZeroUsize::new(ingest.batch_size)
            .context("ingest.batch_size must be greater than zero")?,
        reset,
    })
}
