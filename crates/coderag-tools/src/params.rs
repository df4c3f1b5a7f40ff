use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Omitted fields fall back to the configured defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
pub struct ListCollectionsParams {
    /// Index directory to inspect
    #[serde(default)]
    pub db_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct QueryCodebaseParams {
    /// Natural-language question about the code
    pub question: String,
    /// Number of chunks to retrieve (must be positive)
    #[serde(default)]
    pub top_k: Option<i64>,
    /// Collection to search
    #[serde(default)]
    pub collection: Option<String>,
    /// Index directory holding the collection
    #[serde(default)]
    pub db_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
pub struct ListRowsParams {
    /// Collection to inspect
    #[serde(default)]
    pub collection: Option<String>,
    /// Index directory holding the collection
    #[serde(default)]
    pub db_dir: Option<String>,
    /// Maximum rows to return (must be positive)
    #[serde(default)]
    pub limit: Option<i64>,
    /// Rows to skip (zero or greater)
    #[serde(default)]
    pub offset: Option<i64>,
    /// Include a document snippet per row
    #[serde(default)]
    pub include_documents: bool,
}
