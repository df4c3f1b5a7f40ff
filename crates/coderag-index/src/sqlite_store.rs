//! SQLite-backed [`VectorStore`]: one database file per index directory,
//! vectors kept as little-endian `f32` blobs and scored by brute force.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};

use crate::vector_store::{
    BoxFuture, CollectionInfo, Payload, ScoredRow, StoredRow, VectorPoint, VectorStore,
    VectorStoreError, rank_nearest,
};

/// File name of the database inside an index directory.
pub const DB_FILE: &str = "coderag.db";

#[derive(Debug, Clone)]
pub struct SqliteVectorStore {
    pool: SqlitePool,
}

impl SqliteVectorStore {
    /// Open (or create) `<dir>/coderag.db` and run migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrations fail.
    pub async fn open(dir: &Path) -> Result<Self, VectorStoreError> {
        let path = db_path(dir);
        let opts = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await?;
        Self::migrate(pool).await
    }

    /// Open the database under `dir` only if it was created before.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing database cannot be opened.
    pub async fn open_existing(dir: &Path) -> Result<Option<Self>, VectorStoreError> {
        if !db_path(dir).is_file() {
            return Ok(None);
        }
        Self::open(dir).await.map(Some)
    }

    /// Private in-memory database, used by tests.
    ///
    /// # Errors
    ///
    /// Returns an error if migrations fail.
    pub async fn in_memory() -> Result<Self, VectorStoreError> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        // every connection to :memory: is a separate database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;
        Self::migrate(pool).await
    }

    async fn migrate(pool: SqlitePool) -> Result<Self, VectorStoreError> {
        sqlx::migrate!().run(&pool).await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn dimension(&self, collection: &str) -> Result<Option<i64>, VectorStoreError> {
        let row: Option<(Option<i64>,)> =
            sqlx::query_as("SELECT dimension FROM collections WHERE name = ?")
                .bind(collection)
                .fetch_optional(&self.pool)
                .await?;
        row.map(|(dim,)| dim)
            .ok_or_else(|| VectorStoreError::CollectionNotFound(collection.to_owned()))
    }

    async fn ensure_exists(&self, collection: &str) -> Result<(), VectorStoreError> {
        self.dimension(collection).await.map(|_| ())
    }

    async fn upsert_points(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> Result<(), VectorStoreError> {
        let Some(first) = points.first() else {
            return Ok(());
        };
        let incoming = first.vector.len();
        let stored = self.dimension(collection).await?;
        let expected = stored.map_or(incoming, |d| usize::try_from(d).unwrap_or(usize::MAX));
        if let Some(bad) = points.iter().find(|p| p.vector.len() != expected) {
            return Err(VectorStoreError::Dimension {
                collection: collection.to_owned(),
                expected,
                actual: bad.vector.len(),
            });
        }

        let mut tx = self.pool.begin().await?;
        if stored.is_none() {
            sqlx::query("UPDATE collections SET dimension = ? WHERE name = ?")
                .bind(i64::try_from(expected).unwrap_or(i64::MAX))
                .bind(collection)
                .execute(&mut *tx)
                .await?;
        }
        for point in &points {
            let payload = serde_json::to_string(&point.payload)?;
            sqlx::query(
                "INSERT INTO points (collection, id, document, payload, embedding) \
                 VALUES (?, ?, ?, ?, ?) \
                 ON CONFLICT(collection, id) DO UPDATE SET \
                 document = excluded.document, payload = excluded.payload, \
                 embedding = excluded.embedding",
            )
            .bind(collection)
            .bind(&point.id)
            .bind(&point.document)
            .bind(payload)
            .bind(encode_vector(&point.vector))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn search_points(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: usize,
    ) -> Result<Vec<ScoredRow>, VectorStoreError> {
        if let Some(stored) = self.dimension(collection).await? {
            let expected = usize::try_from(stored).unwrap_or(usize::MAX);
            if vector.len() != expected {
                return Err(VectorStoreError::Dimension {
                    collection: collection.to_owned(),
                    expected,
                    actual: vector.len(),
                });
            }
        }
        let rows: Vec<(String, String, String, Vec<u8>)> = sqlx::query_as(
            "SELECT id, document, payload, embedding FROM points \
             WHERE collection = ? ORDER BY seq",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        let ranked = tokio::task::spawn_blocking(move || {
            let candidates = rows
                .into_iter()
                .map(|(id, document, payload, embedding)| {
                    ((id, document, payload), decode_vector(&embedding))
                })
                .collect();
            rank_nearest(&vector, candidates, limit)
        })
        .await?;

        ranked
            .into_iter()
            .map(|((id, document, payload), distance)| {
                Ok(ScoredRow {
                    id,
                    document: Some(document),
                    distance: Some(distance),
                    payload: parse_payload(&payload)?,
                })
            })
            .collect()
    }
}

fn db_path(dir: &Path) -> PathBuf {
    dir.join(DB_FILE)
}

fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|x| x.to_le_bytes()).collect()
}

fn decode_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn parse_payload(raw: &str) -> Result<Payload, VectorStoreError> {
    Ok(serde_json::from_str(raw)?)
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

impl VectorStore for SqliteVectorStore {
    fn create_collection(
        &self,
        collection: &str,
        metadata: BTreeMap<String, String>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let metadata = serde_json::to_string(&metadata)?;
            sqlx::query(
                "INSERT INTO collections (name, metadata) VALUES (?, ?) \
                 ON CONFLICT(name) DO NOTHING",
            )
            .bind(&collection)
            .bind(metadata)
            .execute(&self.pool)
            .await?;
            Ok(())
        })
    }

    fn collection_exists(&self, collection: &str) -> BoxFuture<'_, Result<bool, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM collections WHERE name = ?")
                .bind(&collection)
                .fetch_one(&self.pool)
                .await?;
            Ok(n > 0)
        })
    }

    fn delete_collection(&self, collection: &str) -> BoxFuture<'_, Result<bool, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let mut tx = self.pool.begin().await?;
            sqlx::query("DELETE FROM points WHERE collection = ?")
                .bind(&collection)
                .execute(&mut *tx)
                .await?;
            let deleted = sqlx::query("DELETE FROM collections WHERE name = ?")
                .bind(&collection)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            tx.commit().await?;
            Ok(deleted > 0)
        })
    }

    fn list_collections(&self) -> BoxFuture<'_, Result<Vec<CollectionInfo>, VectorStoreError>> {
        Box::pin(async move {
            let rows: Vec<(String, String, i64)> = sqlx::query_as(
                "SELECT c.name, c.metadata, \
                 (SELECT COUNT(*) FROM points p WHERE p.collection = c.name) \
                 FROM collections c ORDER BY c.name",
            )
            .fetch_all(&self.pool)
            .await?;
            rows.into_iter()
                .map(|(name, metadata, count)| {
                    Ok(CollectionInfo {
                        name,
                        count: u64::try_from(count).unwrap_or(0),
                        metadata: serde_json::from_str(&metadata)?,
                    })
                })
                .collect()
        })
    }

    fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move { self.upsert_points(&collection, points).await })
    }

    fn count(&self, collection: &str) -> BoxFuture<'_, Result<u64, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            self.ensure_exists(&collection).await?;
            let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM points WHERE collection = ?")
                .bind(&collection)
                .fetch_one(&self.pool)
                .await?;
            Ok(u64::try_from(n).unwrap_or(0))
        })
    }

    fn get(
        &self,
        collection: &str,
        limit: usize,
        offset: usize,
        include_documents: bool,
    ) -> BoxFuture<'_, Result<Vec<StoredRow>, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            self.ensure_exists(&collection).await?;
            let rows: Vec<(String, String, String)> = sqlx::query_as(
                "SELECT id, document, payload FROM points WHERE collection = ? \
                 ORDER BY seq LIMIT ? OFFSET ?",
            )
            .bind(&collection)
            .bind(to_i64(limit))
            .bind(to_i64(offset))
            .fetch_all(&self.pool)
            .await?;
            rows.into_iter()
                .map(|(id, document, payload)| {
                    Ok(StoredRow {
                        id,
                        document: include_documents.then_some(document),
                        payload: parse_payload(&payload)?,
                    })
                })
                .collect()
        })
    }

    fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<ScoredRow>, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move { self.search_points(&collection, vector, limit).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(id: &str, vector: Vec<f32>, doc: &str) -> VectorPoint {
        let mut payload = Payload::new();
        payload.insert("path".into(), serde_json::json!(format!("{id}.rs")));
        VectorPoint {
            id: id.into(),
            vector,
            document: doc.into(),
            payload,
        }
    }

    async fn store_with(name: &str) -> SqliteVectorStore {
        let store = SqliteVectorStore::in_memory().await.unwrap();
        store.create_collection(name, BTreeMap::new()).await.unwrap();
        store
    }

    #[test]
    fn vector_blob_round_trip() {
        let v = vec![0.5f32, -1.25, 3.0];
        assert_eq!(decode_vector(&encode_vector(&v)), v);
    }

    #[tokio::test]
    async fn wal_journal_mode_enabled_on_file_db() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteVectorStore::open(dir.path()).await.unwrap();

        let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
            .fetch_one(store.pool())
            .await
            .unwrap();

        assert_eq!(mode, "wal");
        assert!(dir.path().join(DB_FILE).is_file());
    }

    #[tokio::test]
    async fn open_existing_returns_none_without_database() {
        let dir = tempfile::tempdir().unwrap();
        assert!(
            SqliteVectorStore::open_existing(dir.path())
                .await
                .unwrap()
                .is_none()
        );
        assert!(!dir.path().join(DB_FILE).exists());
    }

    #[tokio::test]
    async fn create_collection_is_idempotent_and_keeps_metadata() {
        let store = SqliteVectorStore::in_memory().await.unwrap();
        let meta = BTreeMap::from([("kind".to_owned(), "code-rag".to_owned())]);
        store.create_collection("c", meta.clone()).await.unwrap();
        store.create_collection("c", BTreeMap::new()).await.unwrap();

        let list = store.list_collections().await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].metadata, meta);
        assert_eq!(list[0].count, 0);
    }

    #[tokio::test]
    async fn upsert_overwrites_in_place() {
        let store = store_with("c").await;
        store
            .upsert("c", vec![point("a", vec![1.0, 0.0], "one"), point("b", vec![0.0, 1.0], "two")])
            .await
            .unwrap();
        store
            .upsert("c", vec![point("a", vec![1.0, 0.0], "one again")])
            .await
            .unwrap();

        assert_eq!(store.count("c").await.unwrap(), 2);
        let rows = store.get("c", 10, 0, true).await.unwrap();
        assert_eq!(rows[0].id, "a");
        assert_eq!(rows[0].document.as_deref(), Some("one again"));
        assert_eq!(rows[1].id, "b");
    }

    #[tokio::test]
    async fn upsert_rejects_dimension_mismatch() {
        let store = store_with("c").await;
        store.upsert("c", vec![point("a", vec![1.0, 0.0], "x")]).await.unwrap();
        let err = store
            .upsert("c", vec![point("b", vec![1.0, 0.0, 0.0], "y")])
            .await
            .unwrap_err();
        assert!(matches!(err, VectorStoreError::Dimension { expected: 2, actual: 3, .. }));
    }

    #[tokio::test]
    async fn get_pages_and_hides_documents() {
        let store = store_with("c").await;
        let points = (0..5)
            .map(|i| point(&format!("p{i}"), vec![1.0, i as f32], "doc"))
            .collect();
        store.upsert("c", points).await.unwrap();

        let rows = store.get("c", 2, 3, false).await.unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["p3", "p4"]);
        assert!(rows.iter().all(|r| r.document.is_none()));

        assert!(store.get("c", 5, 50, true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_returns_nearest_first() {
        let store = store_with("c").await;
        store
            .upsert(
                "c",
                vec![
                    point("far", vec![-1.0, 0.0], "far"),
                    point("near", vec![1.0, 0.1], "near"),
                    point("mid", vec![0.0, 1.0], "mid"),
                ],
            )
            .await
            .unwrap();

        let hits = store.search("c", vec![1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "near");
        assert_eq!(hits[1].id, "mid");
        assert!(hits[0].distance.unwrap() <= hits[1].distance.unwrap());
        assert_eq!(hits[0].payload["path"], "near.rs");
    }

    #[tokio::test]
    async fn search_rejects_query_of_other_dimension() {
        let store = store_with("c").await;
        assert!(store.search("c", vec![1.0; 8], 3).await.unwrap().is_empty());

        store.upsert("c", vec![point("a", vec![1.0, 0.0], "x")]).await.unwrap();
        let err = store.search("c", vec![1.0; 8], 3).await.unwrap_err();
        assert!(matches!(err, VectorStoreError::Dimension { expected: 2, actual: 8, .. }));
        assert_eq!(store.search("c", vec![1.0, 0.0], 3).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_collection_is_not_found() {
        let store = SqliteVectorStore::in_memory().await.unwrap();
        assert!(matches!(
            store.count("nope").await.unwrap_err(),
            VectorStoreError::CollectionNotFound(_)
        ));
        assert!(matches!(
            store.search("nope", vec![1.0], 1).await.unwrap_err(),
            VectorStoreError::CollectionNotFound(_)
        ));
    }

    #[tokio::test]
    async fn delete_collection_reports_existence_and_drops_points() {
        let store = store_with("c").await;
        store.upsert("c", vec![point("a", vec![1.0], "x")]).await.unwrap();

        assert!(store.delete_collection("c").await.unwrap());
        assert!(!store.delete_collection("c").await.unwrap());
        assert!(!store.collection_exists("c").await.unwrap());

        store.create_collection("c", BTreeMap::new()).await.unwrap();
        assert_eq!(store.count("c").await.unwrap(), 0);
    }
}
