use std::sync::Arc;

use coderag_llm::any::AnyProvider;
use coderag_tools::registry::{LIST_COLLECTIONS, LIST_ROWS, QUERY_CODEBASE};
use coderag_tools::{
    CodebaseTools, ListCollectionsParams, ListRowsParams, QueryCodebaseParams, ToolCall, ToolError,
};
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo};
use rmcp::{ErrorData as McpError, ServerHandler, ServiceExt, tool, tool_handler, tool_router};

use crate::error::ServeError;

const INSTRUCTIONS: &str = "Answers questions about an ingested codebase. Use 'list_collections' to see \
what has been indexed, 'query_codebase' to retrieve the chunks nearest to a question, and \
'list_rows' to page through stored rows.";

#[derive(Clone)]
pub struct CodeRagServer {
    tools: Arc<CodebaseTools<AnyProvider>>,
    tool_router: ToolRouter<Self>,
}

impl CodeRagServer {
    #[must_use]
    pub fn new(tools: Arc<CodebaseTools<AnyProvider>>) -> Self {
        Self {
            tools,
            tool_router: Self::tool_router(),
        }
    }

    /// Run one tool through the shared dispatch table.
    async fn dispatch(
        &self,
        tool_id: &str,
        params: &impl serde::Serialize,
    ) -> Result<CallToolResult, McpError> {
        let call = ToolCall::new(tool_id, params).map_err(invalid_params)?;
        match self.tools.execute(&call).await.map_err(invalid_params)? {
            Some(output) => Ok(CallToolResult::success(vec![Content::text(output.summary)])),
            None => Err(McpError::internal_error(
                format!("tool '{tool_id}' is not registered"),
                None,
            )),
        }
    }
}

fn invalid_params(err: ToolError) -> McpError {
    McpError::invalid_params(err.message().to_owned(), None)
}

#[tool_router]
impl CodeRagServer {
    #[tool(description = "List the collections stored in an index directory with their row counts.")]
    pub async fn list_collections(
        &self,
        Parameters(params): Parameters<ListCollectionsParams>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch(LIST_COLLECTIONS, &params).await
    }

    #[tool(description = "Retrieve the code chunks nearest to a natural-language question, followed by a short answer.")]
    pub async fn query_codebase(
        &self,
        Parameters(params): Parameters<QueryCodebaseParams>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch(QUERY_CODEBASE, &params).await
    }

    #[tool(description = "Page through the raw rows of a collection, optionally with document snippets.")]
    pub async fn list_rows(
        &self,
        Parameters(params): Parameters<ListRowsParams>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch(LIST_ROWS, &params).await
    }
}

#[tool_handler]
impl ServerHandler for CodeRagServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(format!(
                "{INSTRUCTIONS}\n\n{}",
                self.tools.registry().format_for_prompt()
            )),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            ..Default::default()
        }
    }
}

/// Serve `tools` on stdin/stdout until the client disconnects.
///
/// # Errors
///
/// Returns `ServeError::Handshake` if initialization fails, or
/// `ServeError::Session` if the session task panics.
pub async fn serve_stdio(tools: Arc<CodebaseTools<AnyProvider>>) -> Result<(), ServeError> {
    tracing::info!("MCP server listening on stdio");
    let service = CodeRagServer::new(tools)
        .serve(rmcp::transport::stdio())
        .await
        .map_err(|e| ServeError::Handshake {
            message: e.to_string(),
        })?;
    let reason = service.waiting().await?;
    tracing::info!(?reason, "MCP session closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use coderag_llm::mock::MockProvider;
    use coderag_tools::ToolDefaults;
    use rmcp::model::ErrorCode;

    use super::*;

    fn server(db_dir: &std::path::Path) -> CodeRagServer {
        let provider = Arc::new(AnyProvider::from(MockProvider::default()));
        let defaults = ToolDefaults {
            db_dir: db_dir.to_path_buf(),
            ..ToolDefaults::default()
        };
        CodeRagServer::new(Arc::new(CodebaseTools::new(provider, defaults)))
    }

    fn body(result: &CallToolResult) -> String {
        result.content[0]
            .as_text()
            .map(|t| t.text.clone())
            .unwrap_or_default()
    }

    #[test]
    fn info_advertises_tools() {
        let dir = tempfile::tempdir().unwrap();
        let info = server(dir.path()).get_info();
        assert!(info.capabilities.tools.is_some());
        let instructions = info.instructions.unwrap();
        assert!(instructions.starts_with(INSTRUCTIONS));
        assert!(instructions.contains("## list_rows\nPage through the raw rows"));
        assert!(instructions.contains("  - question: Natural-language question about the code (string, required)"));
    }

    #[test]
    fn router_exposes_three_tools() {
        let dir = tempfile::tempdir().unwrap();
        let mut names: Vec<String> = server(dir.path())
            .tool_router
            .list_all()
            .into_iter()
            .map(|t| t.name.to_string())
            .collect();
        names.sort();
        assert_eq!(names, ["list_collections", "list_rows", "query_codebase"]);
    }

    #[tokio::test]
    async fn empty_index_lists_no_collections() {
        let dir = tempfile::tempdir().unwrap();
        let result = server(dir.path())
            .list_collections(Parameters(ListCollectionsParams::default()))
            .await
            .unwrap();
        assert!(body(&result).starts_with("No collections found in"));
    }

    #[tokio::test]
    async fn validation_maps_to_invalid_params() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(dir.path());
        let err = server
            .query_codebase(Parameters(QueryCodebaseParams {
                question: "q".into(),
                top_k: Some(-1),
                collection: None,
                db_dir: None,
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        assert_eq!(err.message, "top_k must be greater than zero.");

        let err = server
            .list_rows(Parameters(ListRowsParams {
                offset: Some(-3),
                ..ListRowsParams::default()
            }))
            .await
            .unwrap_err();
        assert_eq!(err.message, "offset must be zero or greater.");
    }

    #[tokio::test]
    async fn missing_collection_is_text_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = server(dir.path())
            .list_rows(Parameters(ListRowsParams::default()))
            .await
            .unwrap();
        assert!(body(&result).contains("was not found"));
        assert_ne!(result.is_error, Some(true));
    }
}
