//! Human-readable rendering of retrieval results and raw rows.

use std::borrow::Cow;
use std::fmt::Write as _;
use std::path::Path;

use crate::gateway::RowWindow;
use crate::metadata::ChunkMetadata;
use crate::retriever::RetrievedChunk;
use crate::vector_store::CollectionInfo;

pub const EMPTY_SUMMARY: &str =
    "No matching context found; try ingesting more files or broadening your query.";
pub const NO_ROWS: &str = "No rows found for the requested window.";
/// Characters of a document shown by [`format_rows`] before truncation.
pub const SNIPPET_LIMIT: usize = 700;

const MARGIN: &str = "    ";

fn field(value: Option<&String>) -> &str {
    value.map_or("?", String::as_str)
}

/// `path:start-end` for a chunk; missing fields render as `?`.
#[must_use]
pub fn location(metadata: &ChunkMetadata) -> String {
    format!(
        "{}:{}-{}",
        field(metadata.path.as_ref()),
        field(metadata.start_line.as_ref()),
        field(metadata.end_line.as_ref())
    )
}

/// Indent every non-blank line of `text` with `prefix`.
fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| {
            if line.trim().is_empty() {
                line.to_owned()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn truncate(text: &str, limit: usize) -> Cow<'_, str> {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => Cow::Owned(format!("{}...", &text[..cut])),
        None => Cow::Borrowed(text),
    }
}

#[must_use]
pub fn format_context(
    metadata: &ChunkMetadata,
    text: &str,
    distance: f32,
    ordinal: usize,
) -> String {
    format!(
        "[{ordinal}] {} (distance={distance:.4})\n{}",
        location(metadata),
        indent(text.trim(), MARGIN)
    )
}

/// Deterministic answer used when no synthesis model is configured.
#[must_use]
pub fn offline_summary(question: &str, contexts: &[RetrievedChunk]) -> String {
    if contexts.is_empty() {
        return EMPTY_SUMMARY.to_owned();
    }
    let mut out = format!(
        "No external LLM selected, so here are the most relevant chunks to help you answer manually.\n\n\
         Question: {question}\nRanked matches:"
    );
    for (i, ctx) in contexts.iter().enumerate() {
        let meta = &ctx.metadata;
        let _ = write!(
            out,
            "\n{}. {} lines {}-{}",
            i + 1,
            field(meta.path.as_ref()),
            field(meta.start_line.as_ref()),
            field(meta.end_line.as_ref())
        );
    }
    out
}

/// Prompt sent to a synthesis model: numbered contexts, then the question.
#[must_use]
pub fn synthesis_prompt(question: &str, contexts: &[RetrievedChunk]) -> String {
    let blob = contexts
        .iter()
        .enumerate()
        .map(|(i, ctx)| format!("[{}] {}\n{}", i + 1, location(&ctx.metadata), ctx.text))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "You are a concise assistant that answers questions about source code using only the provided context.\n\
         Context:\n{blob}\n\n\
         Question: {question}\n\
         Answer using the context above in a few sentences. If the context does not contain the answer, say so."
    )
}

#[must_use]
pub fn format_rows(
    collection: &str,
    db_location: &Path,
    window: &RowWindow,
    include_documents: bool,
) -> String {
    let mut lines = vec![
        format!("Collection '{collection}' @ {}", db_location.display()),
        format!("Total rows: {}", window.total),
        String::new(),
    ];
    if window.rows.is_empty() {
        lines.push(NO_ROWS.to_owned());
        return lines.join("\n");
    }
    for (i, row) in window.rows.iter().enumerate() {
        lines.push(format!("[{}] id={}", window.offset + i + 1, row.id));
        if row.metadata.is_empty() {
            lines.push(format!("{MARGIN}(no metadata)"));
        } else {
            for (key, value) in &row.metadata {
                lines.push(format!("{MARGIN}{key}: {value}"));
            }
        }
        if include_documents
            && let Some(doc) = row.document.as_deref().filter(|d| !d.is_empty())
        {
            lines.push(format!("{MARGIN}--- document ---"));
            let snippet = truncate(doc.trim(), SNIPPET_LIMIT);
            lines.extend(snippet.lines().map(|l| format!("{MARGIN}{l}")));
        }
        lines.push(String::new());
    }
    lines.join("\n").trim_end().to_owned()
}

#[must_use]
pub fn format_collections(db_dir: &Path, collections: &[CollectionInfo]) -> String {
    if collections.is_empty() {
        return format!(
            "No collections found in {}. Ingest code with `coderag ingest` first.",
            db_dir.display()
        );
    }
    let mut out = format!("Collections in {}:", db_dir.display());
    for info in collections {
        let _ = write!(out, "\n- {} ({} rows)", info.name, info.count);
        if !info.metadata.is_empty() {
            let meta = info
                .metadata
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(", ");
            let _ = write!(out, " [{meta}]");
        }
    }
    out
}
