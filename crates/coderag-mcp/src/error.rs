#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("MCP handshake failed: {message}")]
    Handshake { message: String },

    #[error("MCP session task failed: {0}")]
    Session(#[from] tokio::task::JoinError),
}
