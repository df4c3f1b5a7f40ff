use std::fmt::Write;

use crate::params::{ListCollectionsParams, ListRowsParams, QueryCodebaseParams};

pub const LIST_COLLECTIONS: &str = "list_collections";
pub const QUERY_CODEBASE: &str = "query_codebase";
pub const LIST_ROWS: &str = "list_rows";

#[derive(Debug, Clone)]
pub struct ToolDef {
    pub id: &'static str,
    pub description: &'static str,
    pub schema: schemars::Schema,
}

#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDef>,
}

impl ToolRegistry {
    #[must_use]
    pub fn from_definitions(tools: Vec<ToolDef>) -> Self {
        Self { tools }
    }

    /// The three codebase operations with their parameter schemas.
    #[must_use]
    pub fn codebase() -> Self {
        Self::from_definitions(vec![
            ToolDef {
                id: LIST_COLLECTIONS,
                description: "List the collections stored in an index directory with their row counts",
                schema: schemars::schema_for!(ListCollectionsParams),
            },
            ToolDef {
                id: QUERY_CODEBASE,
                description: "Retrieve the code chunks nearest to a question and summarize them",
                schema: schemars::schema_for!(QueryCodebaseParams),
            },
            ToolDef {
                id: LIST_ROWS,
                description: "Page through the raw rows of a collection for inspection",
                schema: schemars::schema_for!(ListRowsParams),
            },
        ])
    }

    #[must_use]
    pub fn tools(&self) -> &[ToolDef] {
        &self.tools
    }

    #[must_use]
    pub fn find(&self, id: &str) -> Option<&ToolDef> {
        self.tools.iter().find(|t| t.id == id)
    }

    /// Plain-text listing of every tool and its parameters.
    #[must_use]
    pub fn format_for_prompt(&self) -> String {
        let mut out = String::from("<tools>\n");
        for tool in &self.tools {
            format_tool(&mut out, tool);
        }
        out.push_str("</tools>");
        out
    }
}

fn format_tool(out: &mut String, tool: &ToolDef) {
    let _ = writeln!(out, "## {}", tool.id);
    let _ = writeln!(out, "{}", tool.description);
    format_schema_params(out, &tool.schema);
    out.push('\n');
}

/// `Option<T>` renders as `"type": ["T", "null"]` or an `anyOf` with a null arm.
fn non_null_type(obj: &serde_json::Map<String, serde_json::Value>) -> Option<&str> {
    if let Some(ty) = obj.get("type") {
        return match ty {
            serde_json::Value::String(s) => Some(s.as_str()),
            serde_json::Value::Array(arr) => {
                arr.iter().filter_map(|v| v.as_str()).find(|t| *t != "null")
            }
            _ => None,
        };
    }
    obj.get("anyOf")?
        .as_array()?
        .iter()
        .filter_map(|v| v.as_object()?.get("type")?.as_str())
        .find(|t| *t != "null")
}

fn format_schema_params(out: &mut String, schema: &schemars::Schema) {
    let Some(obj) = schema.as_object() else {
        return;
    };
    let Some(serde_json::Value::Object(props)) = obj.get("properties") else {
        return;
    };
    if props.is_empty() {
        return;
    }

    let required: Vec<&str> = obj
        .get("required")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();

    let _ = writeln!(out, "Parameters:");
    for (name, prop) in props {
        let prop_obj = prop.as_object();
        let ty = prop_obj.and_then(non_null_type).unwrap_or("string");
        let desc = prop_obj
            .and_then(|o| o.get("description"))
            .and_then(|v| v.as_str())
            .unwrap_or("");
        let req = if required.contains(&name.as_str()) {
            "required"
        } else {
            "optional"
        };
        let _ = writeln!(out, "  - {name}: {desc} ({ty}, {req})");
    }
}
