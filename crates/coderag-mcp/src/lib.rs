//! Model Context Protocol server over stdio for coderag.

pub mod error;
pub mod server;

pub use error::ServeError;
pub use server::{CodeRagServer, serve_stdio};
