use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use crate::vector_store::{
    BoxFuture, CollectionInfo, Payload, ScoredRow, StoredRow, VectorPoint, VectorStore,
    VectorStoreError, rank_nearest,
};

struct InMemoryCollection {
    metadata: BTreeMap<String, String>,
    // insertion order is the store order
    points: Vec<VectorPoint>,
    positions: HashMap<String, usize>,
}

/// Non-persistent [`VectorStore`] with the same ordering rules as the `SQLite` store.
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, InMemoryCollection>>,
}

impl InMemoryVectorStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryVectorStore").finish_non_exhaustive()
    }
}

fn poisoned(e: impl std::fmt::Display) -> VectorStoreError {
    VectorStoreError::Poisoned(e.to_string())
}

fn not_found(collection: &str) -> VectorStoreError {
    VectorStoreError::CollectionNotFound(collection.to_owned())
}

impl VectorStore for InMemoryVectorStore {
    fn create_collection(
        &self,
        collection: &str,
        metadata: BTreeMap<String, String>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let mut cols = self.collections.write().map_err(poisoned)?;
            cols.entry(collection)
                .or_insert_with(|| InMemoryCollection {
                    metadata,
                    points: Vec::new(),
                    positions: HashMap::new(),
                });
            Ok(())
        })
    }

    fn collection_exists(&self, collection: &str) -> BoxFuture<'_, Result<bool, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let cols = self.collections.read().map_err(poisoned)?;
            Ok(cols.contains_key(&collection))
        })
    }

    fn delete_collection(&self, collection: &str) -> BoxFuture<'_, Result<bool, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let mut cols = self.collections.write().map_err(poisoned)?;
            Ok(cols.remove(&collection).is_some())
        })
    }

    fn list_collections(&self) -> BoxFuture<'_, Result<Vec<CollectionInfo>, VectorStoreError>> {
        Box::pin(async move {
            let cols = self.collections.read().map_err(poisoned)?;
            let mut infos: Vec<CollectionInfo> = cols
                .iter()
                .map(|(name, col)| CollectionInfo {
                    name: name.clone(),
                    count: col.points.len() as u64,
                    metadata: col.metadata.clone(),
                })
                .collect();
            infos.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(infos)
        })
    }

    fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let mut cols = self.collections.write().map_err(poisoned)?;
            let col = cols.get_mut(&collection).ok_or_else(|| not_found(&collection))?;
            let expected = col
                .points
                .first()
                .or(points.first())
                .map_or(0, |p| p.vector.len());
            if let Some(bad) = points.iter().find(|p| p.vector.len() != expected) {
                return Err(VectorStoreError::Dimension {
                    collection,
                    expected,
                    actual: bad.vector.len(),
                });
            }
            for point in points {
                if let Some(&pos) = col.positions.get(&point.id) {
                    col.points[pos] = point;
                } else {
                    col.positions.insert(point.id.clone(), col.points.len());
                    col.points.push(point);
                }
            }
            Ok(())
        })
    }

    fn count(&self, collection: &str) -> BoxFuture<'_, Result<u64, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let cols = self.collections.read().map_err(poisoned)?;
            let col = cols.get(&collection).ok_or_else(|| not_found(&collection))?;
            Ok(col.points.len() as u64)
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
            let cols = self.collections.read().map_err(poisoned)?;
            let col = cols.get(&collection).ok_or_else(|| not_found(&collection))?;
            Ok(col
                .points
                .iter()
                .skip(offset)
                .take(limit)
                .map(|p| StoredRow {
                    id: p.id.clone(),
                    document: include_documents.then(|| p.document.clone()),
                    payload: p.payload.clone(),
                })
                .collect())
        })
    }

    fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<ScoredRow>, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let candidates: Vec<((String, String, Payload), Vec<f32>)> = {
                let cols = self.collections.read().map_err(poisoned)?;
                let col = cols.get(&collection).ok_or_else(|| not_found(&collection))?;
                if let Some(first) = col.points.first()
                    && first.vector.len() != vector.len()
                {
                    return Err(VectorStoreError::Dimension {
                        collection,
                        expected: first.vector.len(),
                        actual: vector.len(),
                    });
                }
                col.points
                    .iter()
                    .map(|p| {
                        (
                            (p.id.clone(), p.document.clone(), p.payload.clone()),
                            p.vector.clone(),
                        )
                    })
                    .collect()
            };
            Ok(rank_nearest(&vector, candidates, limit)
                .into_iter()
                .map(|((id, document, payload), distance)| ScoredRow {
                    id,
                    document: Some(document),
                    distance: Some(distance),
                    payload,
                })
                .collect())
        })
    }
}
