//! The three read-only codebase operations behind one dispatch table.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use coderag_index::IndexError;
use coderag_index::gateway::{CollectionHandle, IndexGateway};
use coderag_index::presenter::{
    format_collections, format_context, format_rows, offline_summary, synthesis_prompt,
};
use coderag_index::retriever::RetrievedChunk;
use coderag_llm::LlmProvider;
use tokio::sync::Mutex;

use crate::executor::{ToolCall, ToolError, ToolOutput, deserialize_params};
use crate::params::{ListCollectionsParams, ListRowsParams, QueryCodebaseParams};
use crate::registry::{LIST_COLLECTIONS, LIST_ROWS, QUERY_CODEBASE, ToolRegistry};

pub const NO_MATCHES: &str = "No matches found. Make sure the collection has been ingested.";
const SEPARATOR: &str = "-----------";

/// Values used when a call leaves a field out.
#[derive(Debug, Clone)]
pub struct ToolDefaults {
    pub db_dir: PathBuf,
    pub collection: String,
    pub top_k: usize,
    pub rows_limit: usize,
}

impl Default for ToolDefaults {
    fn default() -> Self {
        Self {
            db_dir: PathBuf::from(".coderag"),
            collection: "code-rag".into(),
            top_k: 5,
            rows_limit: 10,
        }
    }
}

struct Synthesis<P> {
    provider: Arc<P>,
    max_tokens: u32,
    timeout: Duration,
}

pub struct CodebaseTools<P> {
    embedder: Arc<P>,
    synthesis: Option<Synthesis<P>>,
    defaults: ToolDefaults,
    registry: ToolRegistry,
    // one pool per index directory, opened on first use
    gateways: Mutex<HashMap<PathBuf, IndexGateway<P>>>,
}

impl<P: LlmProvider> CodebaseTools<P> {
    /// `embedder` must be the provider the collections were ingested with.
    #[must_use]
    pub fn new(embedder: Arc<P>, defaults: ToolDefaults) -> Self {
        Self {
            embedder,
            synthesis: None,
            defaults,
            registry: ToolRegistry::codebase(),
            gateways: Mutex::new(HashMap::new()),
        }
    }

    /// Answer queries with `provider` instead of the offline summary.
    #[must_use]
    pub fn with_synthesis(mut self, provider: Arc<P>, max_tokens: u32, timeout: Duration) -> Self {
        self.synthesis = Some(Synthesis {
            provider,
            max_tokens,
            timeout,
        });
        self
    }

    #[must_use]
    pub fn defaults(&self) -> &ToolDefaults {
        &self.defaults
    }

    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Route `call` by tool id. Unknown ids yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `ToolError::InvalidParams` when the params do not deserialize
    /// or fail validation.
    pub async fn execute(&self, call: &ToolCall) -> Result<Option<ToolOutput>, ToolError> {
        let Some(def) = self.registry.find(&call.tool_id) else {
            tracing::debug!(tool_id = %call.tool_id, "unknown tool");
            return Ok(None);
        };
        let summary = match def.id {
            LIST_COLLECTIONS => self.list_collections(deserialize_params(&call.params)?).await,
            QUERY_CODEBASE => self.query_codebase(deserialize_params(&call.params)?).await?,
            LIST_ROWS => self.list_rows(deserialize_params(&call.params)?).await?,
            _ => return Ok(None),
        };
        Ok(Some(ToolOutput {
            tool_name: call.tool_id.clone(),
            summary,
        }))
    }

    pub async fn list_collections(&self, params: ListCollectionsParams) -> String {
        let db_dir = self.db_dir(params.db_dir.as_deref());
        let collections = match self.gateway(&db_dir).await {
            Ok(Some(gateway)) => gateway.list().await,
            Ok(None) => Ok(Vec::new()),
            Err(e) => Err(e),
        };
        match collections {
            Ok(collections) => format_collections(&db_dir, &collections),
            Err(e) => {
                tracing::warn!(db_dir = %db_dir.display(), "list collections failed: {e:#}");
                format!("Failed to list collections: {e}")
            }
        }
    }

    /// Retrieve the nearest chunks for `question` and render them with an answer.
    ///
    /// # Errors
    ///
    /// Returns `ToolError::InvalidParams` if `top_k` is not positive. Every
    /// other failure is rendered into the returned text.
    pub async fn query_codebase(&self, params: QueryCodebaseParams) -> Result<String, ToolError> {
        let top_k = positive(params.top_k, self.defaults.top_k, "top_k")?;
        let collection = params
            .collection
            .unwrap_or_else(|| self.defaults.collection.clone());
        let db_dir = self.db_dir(params.db_dir.as_deref());

        let contexts = match self.open(&db_dir, &collection).await {
            Ok(handle) => handle.query(&params.question, top_k).await,
            Err(e) => Err(e),
        };
        let contexts = match contexts {
            Ok(contexts) => contexts,
            Err(IndexError::CollectionNotFound { .. }) => {
                return Ok(not_found(&collection, &db_dir));
            }
            Err(e) => {
                tracing::warn!(collection = %collection, "query failed: {e:#}");
                return Ok(format!("Query failed: {e}"));
            }
        };
        if contexts.is_empty() {
            return Ok(NO_MATCHES.to_owned());
        }

        let mut sections = Vec::with_capacity(contexts.len() + 3);
        sections.push(format!("Collection '{collection}' @ {}", db_dir.display()));
        sections.extend(
            contexts
                .iter()
                .enumerate()
                .map(|(i, c)| format_context(&c.metadata, &c.text, c.distance, i + 1)),
        );
        sections.push(SEPARATOR.to_owned());
        sections.push(self.answer(&params.question, &contexts).await);
        Ok(sections.join("\n\n"))
    }

    /// # Errors
    ///
    /// Returns `ToolError::InvalidParams` if `limit` is not positive or
    /// `offset` is negative.
    pub async fn list_rows(&self, params: ListRowsParams) -> Result<String, ToolError> {
        let limit = positive(params.limit, self.defaults.rows_limit, "limit")?;
        let offset = match params.offset {
            None => 0,
            Some(n) => usize::try_from(n)
                .map_err(|_| ToolError::invalid("offset must be zero or greater."))?,
        };
        let collection = params
            .collection
            .unwrap_or_else(|| self.defaults.collection.clone());
        let db_dir = self.db_dir(params.db_dir.as_deref());

        let window = match self.open(&db_dir, &collection).await {
            Ok(handle) => handle.get(limit, offset, params.include_documents).await,
            Err(e) => Err(e),
        };
        Ok(match window {
            Ok(window) => format_rows(&collection, &db_dir, &window, params.include_documents),
            Err(IndexError::CollectionNotFound { .. }) => not_found(&collection, &db_dir),
            Err(e) => {
                tracing::warn!(collection = %collection, "list rows failed: {e:#}");
                format!("Failed to fetch rows: {e}")
            }
        })
    }

    /// The cached gateway for `db_dir`. Directories without an index are not cached.
    async fn gateway(&self, db_dir: &Path) -> coderag_index::Result<Option<IndexGateway<P>>> {
        if let Some(gateway) = self.gateways.lock().await.get(db_dir) {
            return Ok(Some(gateway.clone()));
        }
        let Some(gateway) = IndexGateway::open_existing(db_dir, Arc::clone(&self.embedder)).await?
        else {
            return Ok(None);
        };
        tracing::debug!(db_dir = %db_dir.display(), "index opened");
        let mut gateways = self.gateways.lock().await;
        Ok(Some(
            gateways
                .entry(db_dir.to_path_buf())
                .or_insert(gateway)
                .clone(),
        ))
    }

    async fn open(&self, db_dir: &Path, collection: &str) -> coderag_index::Result<CollectionHandle<P>> {
        let Some(gateway) = self.gateway(db_dir).await? else {
            return Err(IndexError::CollectionNotFound {
                collection: collection.to_owned(),
                db_dir: db_dir.to_path_buf(),
            });
        };
        gateway.open(collection).await
    }

    async fn answer(&self, question: &str, contexts: &[RetrievedChunk]) -> String {
        let Some(synthesis) = &self.synthesis else {
            return offline_summary(question, contexts);
        };
        let prompt = synthesis_prompt(question, contexts);
        let call = synthesis.provider.generate(&prompt, synthesis.max_tokens);
        match tokio::time::timeout(synthesis.timeout, call).await {
            Ok(Ok(answer)) => answer,
            Ok(Err(e)) => {
                tracing::warn!(provider = synthesis.provider.name(), "synthesis failed: {e:#}");
                format!("Synthesis failed: {e}")
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = synthesis.timeout.as_secs(),
                    "synthesis timed out"
                );
                format!("Synthesis failed: no response within {:?}", synthesis.timeout)
            }
        }
    }

    fn db_dir(&self, requested: Option<&str>) -> PathBuf {
        resolve_db_dir(requested.map_or(self.defaults.db_dir.as_path(), Path::new))
    }
}

fn positive(value: Option<i64>, default: usize, name: &str) -> Result<usize, ToolError> {
    match value {
        None => Ok(default),
        Some(n) if n > 0 => {
            usize::try_from(n).map_err(|_| ToolError::invalid(format!("{name} is too large.")))
        }
        Some(_) => Err(ToolError::invalid(format!("{name} must be greater than zero."))),
    }
}

fn not_found(collection: &str, db_dir: &Path) -> String {
    format!(
        "Collection '{collection}' was not found in {}. Run the ingestion first.",
        db_dir.display()
    )
}

/// Expand a leading `~` and make the path absolute against the working directory.
#[must_use]
pub fn resolve_db_dir(path: &Path) -> PathBuf {
    let expanded = match path.strip_prefix("~") {
        Ok(rest) => match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    };
    std::path::absolute(&expanded).unwrap_or(expanded)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fs;
    use std::num::NonZeroUsize;

    use coderag_index::chunker::ChunkerConfig;
    use coderag_index::indexer::{CodeIndexer, IngestOptions};
    use coderag_index::selector::{FileSelector, parse_extensions};
    use coderag_llm::mock::MockProvider;

    use super::*;

    async fn ingested(db: &Path, src: &Path, provider: Arc<MockProvider>) {
        fs::create_dir_all(src.join("src")).unwrap();
        let body: String = (1..=50).map(|i| format!("fn handler_{i}() {{}}\n")).collect();
        fs::write(src.join("src/routes.rs"), body).unwrap();
        fs::write(src.join("README.md"), "# Routes\nparse_request helpers\n").unwrap();

        let gateway = IndexGateway::create(db, provider).await.unwrap();
        let options = IngestOptions {
            collection: "code-rag".into(),
            selector: FileSelector::new(parse_extensions(None), false, 2.0),
            chunker: ChunkerConfig::default(),
            batch_size: NonZeroUsize::new(8).unwrap(),
            reset: false,
        };
        CodeIndexer::new(gateway, options).ingest(src).await.unwrap();
    }

    fn tools(db: &Path, provider: Arc<MockProvider>) -> CodebaseTools<MockProvider> {
        CodebaseTools::new(
            provider,
            ToolDefaults {
                db_dir: db.to_path_buf(),
                ..ToolDefaults::default()
            },
        )
    }

    fn query(question: &str) -> QueryCodebaseParams {
        QueryCodebaseParams {
            question: question.into(),
            top_k: None,
            collection: None,
            db_dir: None,
        }
    }

    #[tokio::test]
    async fn zero_top_k_is_rejected_before_any_embedding() {
        let provider = Arc::new(MockProvider::default());
        let tools = tools(Path::new("/nonexistent"), Arc::clone(&provider));
        let err = tools
            .query_codebase(QueryCodebaseParams {
                top_k: Some(0),
                ..query("anything")
            })
            .await
            .unwrap_err();
        assert_eq!(err.message(), "top_k must be greater than zero.");
        assert_eq!(provider.embed_calls(), 0);
    }

    #[tokio::test]
    async fn row_window_validation() {
        let tools = tools(Path::new("/nonexistent"), Arc::new(MockProvider::default()));
        let err = tools
            .list_rows(ListRowsParams {
                limit: Some(0),
                ..ListRowsParams::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.message(), "limit must be greater than zero.");

        let err = tools
            .list_rows(ListRowsParams {
                offset: Some(-1),
                ..ListRowsParams::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.message(), "offset must be zero or greater.");
    }

    #[tokio::test]
    async fn missing_index_reads_as_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("db");
        let tools = tools(&db, Arc::new(MockProvider::default()));

        let out = tools.query_codebase(query("where?")).await.unwrap();
        assert_eq!(
            out,
            format!("Collection 'code-rag' was not found in {}. Run the ingestion first.", db.display())
        );
        let out = tools.list_rows(ListRowsParams::default()).await.unwrap();
        assert!(out.starts_with("Collection 'code-rag' was not found"));
        let out = tools.list_collections(ListCollectionsParams::default()).await;
        assert!(out.starts_with("No collections found in"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn query_renders_contexts_and_offline_summary() {
        let dir = tempfile::tempdir().unwrap();
        let (db, src) = (dir.path().join("db"), dir.path().join("src"));
        let provider = Arc::new(MockProvider::default());
        ingested(&db, &src, Arc::clone(&provider)).await;

        let tools = tools(&db, provider);
        let out = tools
            .query_codebase(QueryCodebaseParams {
                top_k: Some(2),
                ..query("handler_3")
            })
            .await
            .unwrap();
        let sections: Vec<&str> = out.split("\n\n").collect();
        assert_eq!(sections[0], format!("Collection 'code-rag' @ {}", db.display()));
        assert!(sections[1].starts_with("[1] "));
        assert!(out.contains("\n\n[2] "));
        assert!(!out.contains("[3] "));
        assert!(out.contains(SEPARATOR));
        assert!(out.contains("No external LLM selected"));
        assert!(out.contains("Question: handler_3"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn synthesis_answer_and_failure() {
        let dir = tempfile::tempdir().unwrap();
        let (db, src) = (dir.path().join("db"), dir.path().join("src"));
        let provider = Arc::new(MockProvider::default());
        ingested(&db, &src, Arc::clone(&provider)).await;

        let answering = tools(&db, Arc::clone(&provider)).with_synthesis(
            Arc::new(MockProvider::with_responses(vec!["Routes live in src/routes.rs.".into()])),
            400,
            Duration::from_secs(5),
        );
        let out = answering.query_codebase(query("where are routes?")).await.unwrap();
        assert!(out.ends_with(&format!("{SEPARATOR}\n\nRoutes live in src/routes.rs.")));

        let failing = tools(&db, Arc::clone(&provider)).with_synthesis(
            Arc::new(MockProvider::failing_generate()),
            400,
            Duration::from_secs(5),
        );
        let out = failing.query_codebase(query("where are routes?")).await.unwrap();
        assert!(out.contains("[1] "));
        assert!(out.ends_with("Synthesis failed: mock synthesis error"));

        let slow = tools(&db, provider).with_synthesis(
            Arc::new(MockProvider::default().with_delay(500)),
            400,
            Duration::from_millis(20),
        );
        let out = slow.query_codebase(query("where are routes?")).await.unwrap();
        assert!(out.ends_with("Synthesis failed: no response within 20ms"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn empty_collection_has_no_matches() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("db");
        let provider = Arc::new(MockProvider::default());
        IndexGateway::create(&db, Arc::clone(&provider))
            .await
            .unwrap()
            .open_or_create("code-rag", false)
            .await
            .unwrap();

        let out = tools(&db, provider).query_codebase(query("x")).await.unwrap();
        assert_eq!(out, NO_MATCHES);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn embedding_failure_is_rendered() {
        let dir = tempfile::tempdir().unwrap();
        let (db, src) = (dir.path().join("db"), dir.path().join("src"));
        ingested(&db, &src, Arc::new(MockProvider::default())).await;

        let tools = tools(&db, Arc::new(MockProvider::failing_embed()));
        let out = tools.query_codebase(query("x")).await.unwrap();
        assert!(out.starts_with("Query failed: "), "{out}");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn rows_and_collections_after_ingest() {
        let dir = tempfile::tempdir().unwrap();
        let (db, src) = (dir.path().join("db"), dir.path().join("src"));
        let provider = Arc::new(MockProvider::default());
        ingested(&db, &src, Arc::clone(&provider)).await;
        let tools = tools(&db, provider);

        let out = tools.list_collections(ListCollectionsParams::default()).await;
        assert!(out.contains("- code-rag (3 rows) [embedder=mock, kind=code-rag]"), "{out}");

        let out = tools
            .list_rows(ListRowsParams {
                limit: Some(1),
                offset: Some(1),
                include_documents: true,
                ..ListRowsParams::default()
            })
            .await
            .unwrap();
        assert!(out.contains("Total rows: 3"));
        assert!(out.contains("[2] id="));
        assert!(out.contains("--- document ---"));
        assert!(!out.contains("[3] id="));

        let out = tools
            .list_rows(ListRowsParams {
                offset: Some(50),
                ..ListRowsParams::default()
            })
            .await
            .unwrap();
        assert!(out.ends_with("No rows found for the requested window."));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn index_is_opened_once_per_directory() {
        let dir = tempfile::tempdir().unwrap();
        let (db, src) = (dir.path().join("db"), dir.path().join("src"));
        let provider = Arc::new(MockProvider::default());
        let tools = tools(&db, Arc::clone(&provider));

        let out = tools.query_codebase(query("parse_request")).await.unwrap();
        assert!(out.ends_with("Run the ingestion first."), "{out}");
        assert!(tools.gateways.lock().await.is_empty());

        ingested(&db, &src, Arc::clone(&provider)).await;
        tools.query_codebase(query("parse_request")).await.unwrap();
        tools.query_codebase(query("handler")).await.unwrap();
        tools.list_rows(ListRowsParams::default()).await.unwrap();
        tools.list_collections(ListCollectionsParams::default()).await;
        assert_eq!(tools.gateways.lock().await.len(), 1);

        let other = dir.path().join("other");
        let out = tools
            .list_collections(ListCollectionsParams {
                db_dir: Some(other.display().to_string()),
            })
            .await;
        assert!(out.starts_with("No collections found in"), "{out}");
        assert_eq!(tools.gateways.lock().await.len(), 1);

        fs::write(src.join("extra.rs"), "fn extra() {}\n").unwrap();
        ingested(&db, &src, provider).await;
        let out = tools.list_rows(ListRowsParams::default()).await.unwrap();
        assert!(out.contains("Total rows: 4"), "cached index sees new writes: {out}");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_queries_do_not_block_each_other() {
        let dir = tempfile::tempdir().unwrap();
        let (db, src) = (dir.path().join("db"), dir.path().join("src"));
        ingested(&db, &src, Arc::new(MockProvider::default())).await;

        let tools = tools(&db, Arc::new(MockProvider::default().with_delay(50)));
        let (a, b, c) = tokio::join!(
            tools.query_codebase(query("handler_1")),
            tools.query_codebase(query("Routes")),
            tools.list_rows(ListRowsParams::default()),
        );
        assert!(a.unwrap().contains("[1] "));
        assert!(b.unwrap().contains("[1] "));
        assert!(c.unwrap().contains("Total rows: 3"));
    }

    #[tokio::test]
    async fn execute_dispatches_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let tools = tools(dir.path(), Arc::new(MockProvider::default()));

        let call = ToolCall {
            tool_id: LIST_COLLECTIONS.into(),
            params: HashMap::new(),
        };
        let out = tools.execute(&call).await.unwrap().unwrap();
        assert_eq!(out.tool_name, "list_collections");
        assert!(out.summary.starts_with("No collections found"));

        let call = ToolCall {
            tool_id: "shell".into(),
            params: HashMap::new(),
        };
        assert!(tools.execute(&call).await.unwrap().is_none());

        let call = ToolCall {
            tool_id: QUERY_CODEBASE.into(),
            params: HashMap::from([("top_k".to_owned(), serde_json::json!(3))]),
        };
        let err = tools.execute(&call).await.unwrap_err();
        assert!(err.message().contains("question"));

        let call = ToolCall {
            tool_id: LIST_ROWS.into(),
            params: HashMap::from([("limit".to_owned(), serde_json::json!(-2))]),
        };
        let err = tools.execute(&call).await.unwrap_err();
        assert_eq!(err.message(), "limit must be greater than zero.");
    }

    #[test]
    fn db_dir_resolution() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(resolve_db_dir(Path::new(".coderag")), cwd.join(".coderag"));
        assert_eq!(resolve_db_dir(Path::new("/var/idx")), PathBuf::from("/var/idx"));
        if let Some(home) = std::env::var_os("HOME") {
            assert_eq!(resolve_db_dir(Path::new("~/idx")), PathBuf::from(home).join("idx"));
        }
    }
}
