//! The fixed metadata record attached to every chunk.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::vector_store::Payload;

/// Positional metadata for a chunk. Every value is a string; line numbers are
/// 1-based, inclusive and rendered in decimal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_line: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
}

impl ChunkMetadata {
    #[must_use]
    pub fn for_chunk(
        path: &str,
        start_line: usize,
        end_line: usize,
        source_dir: &str,
        collection: &str,
    ) -> Self {
        Self {
            path: Some(path.to_owned()),
            start_line: Some(start_line.to_string()),
            end_line: Some(end_line.to_string()),
            source_dir: Some(source_dir.to_owned()),
            collection: Some(collection.to_owned()),
        }
    }

    /// Present fields as string scalars, the shape handed to a vector store.
    #[must_use]
    pub fn to_payload(&self) -> Payload {
        self.fields()
            .map(|(k, v)| (k.to_owned(), serde_json::Value::String(v.to_owned())))
            .collect()
    }

    /// Pick the known keys out of a cleaned string map; other keys are ignored.
    #[must_use]
    pub fn from_strings(map: &BTreeMap<String, String>) -> Self {
        let take = |key: &str| map.get(key).cloned();
        Self {
            path: take("path"),
            start_line: take("start_line"),
            end_line: take("end_line"),
            source_dir: take("source_dir"),
            collection: take("collection"),
        }
    }

    fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("path", &self.path),
            ("start_line", &self.start_line),
            ("end_line", &self.end_line),
            ("source_dir", &self.source_dir),
            ("collection", &self.collection),
        ]
        .into_iter()
        .filter_map(|(k, v)| v.as_deref().map(|v| (k, v)))
    }
}

/// Coerce payload values to strings and drop nulls.
#[must_use]
pub fn stringify_payload(payload: &Payload) -> BTreeMap<String, String> {
    payload
        .iter()
        .filter_map(|(k, v)| {
            let value = match v {
                serde_json::Value::Null => return None,
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some((k.clone(), value))
        })
        .collect()
}
