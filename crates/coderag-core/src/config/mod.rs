mod env;
mod types;

#[cfg(test)]
mod tests;

pub use types::*;

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Reject values no operation can run with.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first offending setting.
    pub fn validate(&self) -> anyhow::Result<()> {
        let ingest = &self.ingest;
        if ingest.chunk_lines == 0 {
            bail!("ingest.chunk_lines must be greater than zero");
        }
        if ingest.chunk_overlap >= ingest.chunk_lines {
            bail!(
                "ingest.chunk_overlap ({}) must be less than ingest.chunk_lines ({})",
                ingest.chunk_overlap,
                ingest.chunk_lines
            );
        }
        if ingest.batch_size == 0 {
            bail!("ingest.batch_size must be greater than zero");
        }
        if ingest.max_file_mb.is_nan() || ingest.max_file_mb <= 0.0 {
            bail!("ingest.max_file_mb must be positive");
        }
        if self.query.top_k == 0 {
            bail!("query.top_k must be greater than zero");
        }
        if self.query.rows_limit == 0 {
            bail!("query.rows_limit must be greater than zero");
        }
        if self.llm.max_tokens == 0 {
            bail!("llm.max_tokens must be greater than zero");
        }
        if self.llm.timeout == 0 {
            bail!("llm.timeout must be greater than zero");
        }
        if self.index.collection.trim().is_empty() {
            bail!("index.collection must not be empty");
        }
        Ok(())
    }
}

/// Priority: `--config` argument > `CODERAG_CONFIG` env > `config/default.toml`.
#[must_use]
pub fn resolve_config_path(cli: Option<&Path>) -> PathBuf {
    if let Some(path) = cli {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var("CODERAG_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("config/default.toml")
}
