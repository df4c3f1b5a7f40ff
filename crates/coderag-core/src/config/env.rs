use coderag_index::selector::parse_extensions;

use super::Config;

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_index();
        self.apply_env_overrides_llm();
    }

    fn apply_env_overrides_index(&mut self) {
        if let Ok(v) = std::env::var("CODERAG_DB_DIR") {
            self.index.db_dir = v.into();
        }
        if let Ok(v) = std::env::var("CODERAG_COLLECTION") {
            self.index.collection = v;
        }
        if let Ok(v) = std::env::var("CODERAG_EXTENSIONS") {
            self.ingest.extensions = parse_extensions(Some(&v));
        }
        if let Ok(v) = std::env::var("CODERAG_INCLUDE_HIDDEN")
            && let Ok(enabled) = v.parse::<bool>()
        {
            self.ingest.include_hidden = enabled;
        }
        if let Ok(v) = std::env::var("CODERAG_MAX_FILE_MB")
            && let Ok(mb) = v.parse::<f64>()
        {
            self.ingest.max_file_mb = mb;
        }
        if let Ok(v) = std::env::var("CODERAG_CHUNK_LINES")
            && let Ok(n) = v.parse::<usize>()
        {
            self.ingest.chunk_lines = n;
        }
        if let Ok(v) = std::env::var("CODERAG_CHUNK_OVERLAP")
            && let Ok(n) = v.parse::<usize>()
        {
            self.ingest.chunk_overlap = n;
        }
        if let Ok(v) = std::env::var("CODERAG_BATCH_SIZE")
            && let Ok(n) = v.parse::<usize>()
        {
            self.ingest.batch_size = n;
        }
        if let Ok(v) = std::env::var("CODERAG_TOP_K")
            && let Ok(n) = v.parse::<usize>()
        {
            self.query.top_k = n;
        }
        if let Ok(v) = std::env::var("CODERAG_ROWS_LIMIT")
            && let Ok(n) = v.parse::<usize>()
        {
            self.query.rows_limit = n;
        }
    }

    fn apply_env_overrides_llm(&mut self) {
        if let Ok(v) = std::env::var("CODERAG_LLM_PROVIDER") {
            if let Ok(kind) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.llm.provider = kind;
            } else {
                tracing::warn!("ignoring invalid CODERAG_LLM_PROVIDER value: {v}");
            }
        }
        if let Ok(v) = std::env::var("CODERAG_OLLAMA_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("CODERAG_EMBEDDING_MODEL") {
            self.llm.embedding_model = v;
        }
        if let Ok(v) = std::env::var("CODERAG_SYNTHESIS_MODEL") {
            let v = v.trim();
            self.llm.synthesis_model = (!v.is_empty()).then(|| v.to_owned());
        }
        if let Ok(v) = std::env::var("CODERAG_SYNTHESIS_MAX_TOKENS")
            && let Ok(n) = v.parse::<u32>()
        {
            self.llm.max_tokens = n;
        }
        if let Ok(v) = std::env::var("CODERAG_SYNTHESIS_TIMEOUT")
            && let Ok(secs) = v.parse::<u64>()
        {
            self.llm.timeout = secs;
        }
    }
}
