use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use serde::Serialize;

/// Flat key/value payload stored next to each vector.
pub type Payload = BTreeMap<String, serde_json::Value>;

#[derive(Debug, thiserror::Error)]
pub enum VectorStoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("collection {0} not found")]
    CollectionNotFound(String),
    #[error("vector dimension mismatch in {collection}: expected {expected}, got {actual}")]
    Dimension {
        collection: String,
        expected: usize,
        actual: usize,
    },
    #[error("scoring task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("store lock poisoned: {0}")]
    Poisoned(String),
}

#[derive(Debug, Clone)]
pub struct VectorPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub document: String,
    pub payload: Payload,
}

/// A row returned by paged inspection, in store order.
#[derive(Debug, Clone)]
pub struct StoredRow {
    pub id: String,
    pub document: Option<String>,
    pub payload: Payload,
}

/// A nearest-neighbour hit. Stores that cannot report a field leave it `None`.
#[derive(Debug, Clone)]
pub struct ScoredRow {
    pub id: String,
    pub document: Option<String>,
    pub distance: Option<f32>,
    pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionInfo {
    pub name: String,
    pub count: u64,
    pub metadata: BTreeMap<String, String>,
}

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait VectorStore: Send + Sync {
    /// Create `collection` with `metadata`; an existing collection is left untouched.
    fn create_collection(
        &self,
        collection: &str,
        metadata: BTreeMap<String, String>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>>;

    fn collection_exists(&self, collection: &str) -> BoxFuture<'_, Result<bool, VectorStoreError>>;

    /// Returns `false` when there was nothing to delete.
    fn delete_collection(&self, collection: &str) -> BoxFuture<'_, Result<bool, VectorStoreError>>;

    fn list_collections(&self) -> BoxFuture<'_, Result<Vec<CollectionInfo>, VectorStoreError>>;

    /// Insert or overwrite points by id. An overwritten point keeps its position.
    fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>>;

    fn count(&self, collection: &str) -> BoxFuture<'_, Result<u64, VectorStoreError>>;

    fn get(
        &self,
        collection: &str,
        limit: usize,
        offset: usize,
        include_documents: bool,
    ) -> BoxFuture<'_, Result<Vec<StoredRow>, VectorStoreError>>;

    /// The `limit` nearest points by cosine distance, nearest first.
    fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<ScoredRow>, VectorStoreError>>;
}

/// `1 - cosine_similarity`; a zero vector is treated as orthogonal to everything.
#[must_use]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

/// Score `candidates` against `query` and keep the `limit` nearest.
/// Equal distances keep candidate order.
pub(crate) fn rank_nearest<T>(
    query: &[f32],
    candidates: Vec<(T, Vec<f32>)>,
    limit: usize,
) -> Vec<(T, f32)> {
    let mut scored: Vec<(T, f32)> = candidates
        .into_iter()
        .map(|(item, vector)| {
            let distance = cosine_distance(query, &vector);
            (item, distance)
        })
        .collect();
    scored.sort_by(|a, b| a.1.total_cmp(&b.1));
    scored.truncate(limit);
    scored
}
