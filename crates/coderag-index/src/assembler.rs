//! Turns selected files into addressable chunks and groups them for bulk writes.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::chunker::{ChunkerConfig, chunk_lines};
use crate::metadata::ChunkMetadata;
use crate::selector::FileSelector;

/// A unit of indexed text. `id` is `"<relative_path>::<n>"`, `n` counting the
/// file's non-empty windows from zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    #[must_use]
    pub fn id_for(relative_path: &str, index: usize) -> String {
        format!("{relative_path}::{index}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Per-file result of assembly.
#[derive(Debug)]
pub enum FileOutcome {
    Chunked { path: String, chunks: Vec<Chunk> },
    Skipped(SkippedFile),
}

#[derive(Debug, Clone)]
pub struct ChunkAssembler {
    root: PathBuf,
    source_dir: String,
    collection: String,
    selector: FileSelector,
    chunker: ChunkerConfig,
}

impl ChunkAssembler {
    #[must_use]
    pub fn new(
        root: impl Into<PathBuf>,
        collection: impl Into<String>,
        selector: FileSelector,
        chunker: ChunkerConfig,
    ) -> Self {
        let root = root.into();
        Self {
            source_dir: root.display().to_string(),
            root,
            collection: collection.into(),
            selector,
            chunker,
        }
    }

    /// One outcome per selected file, read lazily.
    pub fn assemble(&self) -> impl Iterator<Item = FileOutcome> + '_ {
        self.selector
            .select(&self.root)
            .map(move |path| self.process(&path))
    }

    /// Read and chunk one file. Invalid UTF-8 is replaced, unreadable files
    /// are skipped with the error as reason.
    #[must_use]
    pub fn process(&self, path: &Path) -> FileOutcome {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable file");
                return FileOutcome::Skipped(SkippedFile {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        };
        let text = String::from_utf8_lossy(&bytes);
        let relative = posix_relative(&self.root, path);
        let chunks = self.chunks_for_text(&relative, &text);
        tracing::debug!(path = %relative, chunks = chunks.len(), "file chunked");
        FileOutcome::Chunked {
            path: relative,
            chunks,
        }
    }

    #[must_use]
    pub fn chunks_for_text(&self, relative_path: &str, text: &str) -> Vec<Chunk> {
        chunk_lines(text, &self.chunker)
            .enumerate()
            .map(|(n, window)| Chunk {
                id: Chunk::id_for(relative_path, n),
                metadata: ChunkMetadata::for_chunk(
                    relative_path,
                    window.start_line,
                    window.end_line,
                    &self.source_dir,
                    &self.collection,
                ),
                text: window.text,
            })
            .collect()
    }
}

/// `path` relative to `root`, joined with `/` on every platform.
#[must_use]
pub fn posix_relative(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Iterator adapter yielding successive `Vec`s of `size` items; the last one
/// may be shorter.
#[derive(Debug)]
pub struct Batched<I> {
    inner: I,
    size: usize,
}

impl<I: Iterator> Iterator for Batched<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let batch: Vec<I::Item> = self.inner.by_ref().take(self.size).collect();
        (!batch.is_empty()).then_some(batch)
    }
}

pub fn batched<I: IntoIterator>(items: I, size: NonZeroUsize) -> Batched<I::IntoIter> {
    Batched {
        inner: items.into_iter(),
        size: size.get(),
    }
}
