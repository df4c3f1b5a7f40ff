use std::io::Write;
use std::path::PathBuf;

use serial_test::serial;

use super::*;

const ENV_KEYS: [&str; 17] = [
    "CODERAG_CONFIG",
    "CODERAG_DB_DIR",
    "CODERAG_COLLECTION",
    "CODERAG_EXTENSIONS",
    "CODERAG_INCLUDE_HIDDEN",
    "CODERAG_MAX_FILE_MB",
    "CODERAG_CHUNK_LINES",
    "CODERAG_CHUNK_OVERLAP",
    "CODERAG_BATCH_SIZE",
    "CODERAG_TOP_K",
    "CODERAG_ROWS_LIMIT",
    "CODERAG_LLM_PROVIDER",
    "CODERAG_OLLAMA_URL",
    "CODERAG_EMBEDDING_MODEL",
    "CODERAG_SYNTHESIS_MODEL",
    "CODERAG_SYNTHESIS_MAX_TOKENS",
    "CODERAG_SYNTHESIS_TIMEOUT",
];

fn clear_env() {
    for key in ENV_KEYS {
        unsafe { std::env::remove_var(key) };
    }
}

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn defaults_when_nothing_configured() {
    let config = Config::default();
    assert_eq!(config.index.db_dir, PathBuf::from(".coderag"));
    assert_eq!(config.index.collection, "code-rag");
    assert_eq!(config.ingest.extensions.len(), 24);
    assert!(config.ingest.extensions.contains(&".rs".to_owned()));
    assert!(!config.ingest.include_hidden);
    assert!((config.ingest.max_file_mb - 2.0).abs() < f64::EPSILON);
    assert_eq!(config.ingest.chunk_lines, 40);
    assert_eq!(config.ingest.chunk_overlap, 10);
    assert_eq!(config.ingest.batch_size, 64);
    assert_eq!(config.query.top_k, 5);
    assert_eq!(config.query.rows_limit, 10);
    assert_eq!(config.llm.provider, ProviderKind::Local);
    assert_eq!(config.llm.base_url, "http://localhost:11434");
    assert_eq!(config.llm.embedding_model, "nomic-embed-text");
    assert!(config.llm.synthesis_model.is_none());
    assert_eq!(config.llm.max_tokens, 400);
    assert_eq!(config.llm.timeout, 120);
    config.validate().unwrap();
}

#[test]
#[serial]
fn load_missing_file_uses_defaults() {
    clear_env();
    let config = Config::load(std::path::Path::new("/nonexistent/coderag.toml")).unwrap();
    assert_eq!(config.index.collection, "code-rag");
    assert_eq!(config.query.top_k, 5);
}

#[test]
#[serial]
fn load_partial_file_fills_defaults() {
    clear_env();
    let file = write_config(
        r#"
[index]
collection = "backend"

[ingest]
chunk_lines = 60
extensions = [".rs"]

[llm]
provider = "ollama"
synthesis_model = "llama3"
"#,
    );
    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.index.collection, "backend");
    assert_eq!(config.index.db_dir, PathBuf::from(".coderag"));
    assert_eq!(config.ingest.chunk_lines, 60);
    assert_eq!(config.ingest.chunk_overlap, 10);
    assert_eq!(config.ingest.extensions, [".rs"]);
    assert_eq!(config.llm.provider, ProviderKind::Ollama);
    assert_eq!(config.llm.synthesis_model.as_deref(), Some("llama3"));
    assert_eq!(config.llm.max_tokens, 400);
}

#[test]
#[serial]
fn load_rejects_malformed_toml() {
    clear_env();
    let file = write_config("[ingest\nchunk_lines = ");
    let err = Config::load(file.path()).unwrap_err();
    assert!(err.to_string().contains("failed to parse config file"));
}

#[test]
#[serial]
fn env_overrides_file_values() {
    clear_env();
    let file = write_config("[query]\ntop_k = 3\n");
    unsafe {
        std::env::set_var("CODERAG_TOP_K", "9");
        std::env::set_var("CODERAG_DB_DIR", "/tmp/idx");
        std::env::set_var("CODERAG_EXTENSIONS", "RS, py");
        std::env::set_var("CODERAG_INCLUDE_HIDDEN", "true");
        std::env::set_var("CODERAG_LLM_PROVIDER", "ollama");
        std::env::set_var("CODERAG_SYNTHESIS_MODEL", "qwen2.5");
        std::env::set_var("CODERAG_SYNTHESIS_TIMEOUT", "15");
    }
    let config = Config::load(file.path()).unwrap();
    clear_env();

    assert_eq!(config.query.top_k, 9);
    assert_eq!(config.index.db_dir, PathBuf::from("/tmp/idx"));
    assert_eq!(config.ingest.extensions, [".rs", ".py"]);
    assert!(config.ingest.include_hidden);
    assert_eq!(config.llm.provider, ProviderKind::Ollama);
    assert_eq!(config.llm.synthesis_model.as_deref(), Some("qwen2.5"));
    assert_eq!(config.llm.timeout, 15);
}

#[test]
#[serial]
fn unparseable_env_values_are_ignored() {
    clear_env();
    unsafe {
        std::env::set_var("CODERAG_CHUNK_LINES", "forty");
        std::env::set_var("CODERAG_LLM_PROVIDER", "claude");
        std::env::set_var("CODERAG_INCLUDE_HIDDEN", "sometimes");
    }
    let config = Config::load(std::path::Path::new("/nonexistent")).unwrap();
    clear_env();

    assert_eq!(config.ingest.chunk_lines, 40);
    assert_eq!(config.llm.provider, ProviderKind::Local);
    assert!(!config.ingest.include_hidden);
}

#[test]
#[serial]
fn blank_synthesis_model_env_clears_it() {
    clear_env();
    let file = write_config("[llm]\nsynthesis_model = \"llama3\"\n");
    unsafe { std::env::set_var("CODERAG_SYNTHESIS_MODEL", "  ") };
    let config = Config::load(file.path()).unwrap();
    clear_env();
    assert!(config.llm.synthesis_model.is_none());
}

#[test]
fn validate_rejects_unusable_values() {
    let cases: [(fn(&mut Config), &str); 8] = [
        (|c| c.ingest.chunk_lines = 0, "chunk_lines"),
        (|c| c.ingest.chunk_overlap = 40, "chunk_overlap"),
        (|c| c.ingest.batch_size = 0, "batch_size"),
        (|c| c.ingest.max_file_mb = 0.0, "max_file_mb"),
        (|c| c.query.top_k = 0, "top_k"),
        (|c| c.query.rows_limit = 0, "rows_limit"),
        (|c| c.llm.max_tokens = 0, "max_tokens"),
        (|c| c.llm.timeout = 0, "timeout"),
    ];
    for (mutate, field) in cases {
        let mut config = Config::default();
        mutate(&mut config);
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains(field), "{field}: {err}");
    }
}

#[test]
fn validate_accepts_zero_overlap() {
    let mut config = Config::default();
    config.ingest.chunk_overlap = 0;
    config.validate().unwrap();
}

#[test]
#[serial]
fn config_path_priority() {
    clear_env();
    assert_eq!(
        resolve_config_path(Some(std::path::Path::new("custom.toml"))),
        PathBuf::from("custom.toml")
    );
    assert_eq!(resolve_config_path(None), PathBuf::from("config/default.toml"));
    unsafe { std::env::set_var("CODERAG_CONFIG", "/etc/coderag.toml") };
    assert_eq!(resolve_config_path(None), PathBuf::from("/etc/coderag.toml"));
    assert_eq!(
        resolve_config_path(Some(std::path::Path::new("cli.toml"))),
        PathBuf::from("cli.toml")
    );
    clear_env();
}

#[test]
fn provider_kind_display() {
    assert_eq!(ProviderKind::Local.to_string(), "local");
    assert_eq!(ProviderKind::Ollama.as_str(), "ollama");
}

#[test]
fn config_serializes_back_to_toml() {
    let text = toml::to_string(&Config::default()).unwrap();
    assert!(text.contains("collection = \"code-rag\""));
    assert!(!text.contains("synthesis_model"));
}

#[test]
#[serial]
fn shipped_default_config_matches_builtin_defaults() {
    clear_env();
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/default.toml");
    let shipped = Config::load(&path).unwrap();
    let builtin = Config::default();
    assert_eq!(shipped.index.collection, builtin.index.collection);
    assert_eq!(shipped.ingest.extensions, builtin.ingest.extensions);
    assert_eq!(shipped.ingest.chunk_lines, builtin.ingest.chunk_lines);
    assert_eq!(shipped.query.top_k, builtin.query.top_k);
    assert_eq!(shipped.llm.provider, builtin.llm.provider);
    assert!(shipped.llm.synthesis_model.is_none());
    shipped.validate().unwrap();
}
