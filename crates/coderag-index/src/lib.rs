//! Line-window code indexing and retrieval.
//!
//! Ingest: [`selector`] picks files, [`chunker`] cuts them into overlapping
//! line windows, [`assembler`] tags and batches them, and [`gateway`] embeds and
//! stores each batch. Query: [`retriever`] finds the nearest chunks and
//! [`presenter`] renders them.

pub mod assembler;
pub mod chunker;
pub mod error;
pub mod gateway;
pub mod in_memory_store;
pub mod indexer;
pub mod metadata;
pub mod presenter;
pub mod retriever;
pub mod selector;
pub mod sqlite_store;
pub mod vector_store;

pub use error::{IndexError, Result};
