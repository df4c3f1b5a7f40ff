use std::collections::HashMap;
use std::fmt;

/// A request to run one tool by id with JSON params.
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub tool_id: String,
    pub params: HashMap<String, serde_json::Value>,
}

impl ToolCall {
    /// Build a call from typed params.
    ///
    /// # Errors
    ///
    /// Returns `ToolError::InvalidParams` if `params` does not serialize to a JSON object.
    pub fn new(tool_id: impl Into<String>, params: &impl serde::Serialize) -> Result<Self, ToolError> {
        match serde_json::to_value(params) {
            Ok(serde_json::Value::Object(map)) => Ok(Self {
                tool_id: tool_id.into(),
                params: map.into_iter().collect(),
            }),
            Ok(other) => Err(ToolError::invalid(format!("params must be an object, got {other}"))),
            Err(e) => Err(ToolError::invalid(e.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub tool_name: String,
    pub summary: String,
}

impl fmt::Display for ToolOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary)
    }
}

/// Only input problems are errors; collaborator failures come back as text.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("invalid tool parameters: {message}")]
    InvalidParams { message: String },
}

impl ToolError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidParams {
            message: message.into(),
        }
    }

    /// The message without the error-kind prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidParams { message } => message,
        }
    }
}

/// Deserialize tool call params from a `HashMap<String, Value>` into a typed struct.
///
/// # Errors
///
/// Returns `ToolError::InvalidParams` when deserialization fails.
pub fn deserialize_params<T: serde::de::DeserializeOwned, S: std::hash::BuildHasher>(
    params: &HashMap<String, serde_json::Value, S>,
) -> Result<T, ToolError> {
    let obj =
        serde_json::Value::Object(params.iter().map(|(k, v)| (k.clone(), v.clone())).collect());
    serde_json::from_value(obj).map_err(|e| ToolError::invalid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Sample {
        name: String,
        #[serde(default)]
        count: Option<i64>,
    }

    #[test]
    fn deserialize_params_reads_fields() {
        let params = HashMap::from([
            ("name".to_owned(), serde_json::json!("x")),
            ("count".to_owned(), serde_json::json!(3)),
        ]);
        let sample: Sample = deserialize_params(&params).unwrap();
        assert_eq!(sample.name, "x");
        assert_eq!(sample.count, Some(3));
    }

    #[test]
    fn deserialize_params_reports_missing_field() {
        let err = deserialize_params::<Sample, _>(&HashMap::new()).unwrap_err();
        assert!(err.message().contains("name"));
    }

    #[test]
    fn call_from_typed_params_round_trips() {
        #[derive(serde::Serialize)]
        struct Typed {
            name: &'static str,
            count: Option<i64>,
        }
        let call = ToolCall::new("sample", &Typed { name: "x", count: None }).unwrap();
        assert_eq!(call.tool_id, "sample");
        let sample: Sample = deserialize_params(&call.params).unwrap();
        assert_eq!(sample.name, "x");
        assert_eq!(sample.count, None);

        let err = ToolCall::new("sample", &3).unwrap_err();
        assert!(err.message().starts_with("params must be an object"));
    }

    #[test]
    fn tool_output_displays_summary() {
        let out = ToolOutput {
            tool_name: "list_rows".into(),
            summary: "Total rows: 0".into(),
        };
        assert_eq!(out.to_string(), "Total rows: 0");
    }
}
