//! Collection lifecycle and bulk writes on top of a [`VectorStore`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use coderag_llm::{LlmError, LlmProvider};
use serde::Serialize;

use crate::assembler::Chunk;
use crate::error::{IndexError, Result};
use crate::metadata::stringify_payload;
use crate::sqlite_store::SqliteVectorStore;
use crate::vector_store::{CollectionInfo, VectorPoint, VectorStore};

/// Entry point to every collection stored under one index directory.
pub struct IndexGateway<P> {
    store: Arc<dyn VectorStore>,
    provider: Arc<P>,
    db_dir: PathBuf,
}

impl<P> Clone for IndexGateway<P> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            provider: Arc::clone(&self.provider),
            db_dir: self.db_dir.clone(),
        }
    }
}

/// A collection bound to the embedding provider used to write and query it.
pub struct CollectionHandle<P> {
    name: String,
    db_dir: PathBuf,
    pub(crate) store: Arc<dyn VectorStore>,
    pub(crate) provider: Arc<P>,
}

impl<P> Clone for CollectionHandle<P> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            db_dir: self.db_dir.clone(),
            store: Arc::clone(&self.store),
            provider: Arc::clone(&self.provider),
        }
    }
}

/// A page of raw rows plus the collection total.
#[derive(Debug, Clone, Serialize)]
pub struct RowWindow {
    pub total: u64,
    pub offset: usize,
    pub rows: Vec<RawRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RawRow {
    pub id: String,
    pub metadata: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
}

impl<P: LlmProvider> IndexGateway<P> {
    #[must_use]
    pub fn new(store: Arc<dyn VectorStore>, provider: Arc<P>, db_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            provider,
            db_dir: db_dir.into(),
        }
    }

    /// Create `db_dir` if needed and open its `SQLite` store.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the store fails to open.
    pub async fn create(db_dir: &Path, provider: Arc<P>) -> Result<Self> {
        tokio::fs::create_dir_all(db_dir).await?;
        let store = SqliteVectorStore::open(db_dir).await?;
        Ok(Self::new(Arc::new(store), provider, db_dir))
    }

    /// Open an index directory for reading; `None` when nothing was ingested there yet.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing store cannot be opened.
    pub async fn open_existing(db_dir: &Path, provider: Arc<P>) -> Result<Option<Self>> {
        let Some(store) = SqliteVectorStore::open_existing(db_dir).await? else {
            return Ok(None);
        };
        Ok(Some(Self::new(Arc::new(store), provider, db_dir)))
    }

    #[must_use]
    pub fn db_dir(&self) -> &Path {
        &self.db_dir
    }

    /// Open `name` for writing, creating it when missing. With `reset` an
    /// existing collection is dropped first.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot embed, or if the store
    /// rejects the delete or create.
    pub async fn open_or_create(&self, name: &str, reset: bool) -> Result<CollectionHandle<P>> {
        if !self.provider.supports_embeddings() {
            return Err(LlmError::EmbedUnsupported {
                provider: self.provider.name().to_owned(),
            }
            .into());
        }
        if reset && self.store.delete_collection(name).await? {
            tracing::info!(collection = name, "deleted existing collection");
        }
        let metadata = BTreeMap::from([
            ("kind".to_owned(), "code-rag".to_owned()),
            ("embedder".to_owned(), self.provider.name().to_owned()),
        ]);
        self.store.create_collection(name, metadata).await?;
        Ok(self.handle(name))
    }

    /// Open an existing collection for reading.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::CollectionNotFound`] if `name` does not exist.
    pub async fn open(&self, name: &str) -> Result<CollectionHandle<P>> {
        if !self.store.collection_exists(name).await? {
            return Err(IndexError::CollectionNotFound {
                collection: name.to_owned(),
                db_dir: self.db_dir.clone(),
            });
        }
        Ok(self.handle(name))
    }

    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn list(&self) -> Result<Vec<CollectionInfo>> {
        Ok(self.store.list_collections().await?)
    }

    fn handle(&self, name: &str) -> CollectionHandle<P> {
        CollectionHandle {
            name: name.to_owned(),
            db_dir: self.db_dir.clone(),
            store: Arc::clone(&self.store),
            provider: Arc::clone(&self.provider),
        }
    }
}

impl<P: LlmProvider> CollectionHandle<P> {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn db_dir(&self) -> &Path {
        &self.db_dir
    }

    /// Embed and write `chunks` as one store call. Returns the number written.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding or the write fails; nothing from this
    /// batch is committed in that case.
    pub async fn upsert(&self, chunks: &[Chunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.provider.embed_batch(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(IndexError::Other(format!(
                "embedder returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let points = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| VectorPoint {
                id: chunk.id.clone(),
                vector,
                document: chunk.text.clone(),
                payload: chunk.metadata.to_payload(),
            })
            .collect();
        self.store.upsert(&self.name, points).await?;
        Ok(chunks.len())
    }

    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn count(&self) -> Result<u64> {
        Ok(self.store.count(&self.name).await?)
    }

    /// Raw rows in store order, for inspection.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn get(
        &self,
        limit: usize,
        offset: usize,
        include_documents: bool,
    ) -> Result<RowWindow> {
        let total = self.count().await?;
        let rows = self
            .store
            .get(&self.name, limit, offset, include_documents)
            .await?
            .into_iter()
            .map(|row| RawRow {
                id: row.id,
                metadata: stringify_payload(&row.payload),
                document: row.document,
            })
            .collect();
        Ok(RowWindow {
            total,
            offset,
            rows,
        })
    }
}
