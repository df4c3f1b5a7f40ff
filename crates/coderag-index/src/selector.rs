//! Walks a source tree and yields the files worth chunking.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use ignore::WalkBuilder;

pub const DEFAULT_EXTENSIONS: &[&str] = &[
    ".py", ".ts", ".tsx", ".js", ".jsx", ".java", ".cs", ".cpp", ".c", ".rs", ".go", ".rb", ".php",
    ".kt", ".swift", ".scala", ".m", ".mm", ".sql", ".json", ".yaml", ".yml", ".toml", ".md",
];

/// Parse a comma-separated extension list into lower-case, dot-prefixed
/// entries. `None` or an all-blank list yields [`DEFAULT_EXTENSIONS`].
#[must_use]
pub fn parse_extensions(raw: Option<&str>) -> Vec<String> {
    let parsed: Vec<String> = raw
        .unwrap_or_default()
        .split(',')
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .map(|e| if e.starts_with('.') { e } else { format!(".{e}") })
        .collect();
    if parsed.is_empty() {
        DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_owned()).collect()
    } else {
        parsed
    }
}

#[derive(Debug, Clone)]
pub struct FileSelector {
    extensions: Vec<String>,
    include_hidden: bool,
    max_bytes: f64,
}

impl FileSelector {
    /// An empty `extensions` list accepts every suffix.
    #[must_use]
    pub fn new(extensions: Vec<String>, include_hidden: bool, max_file_mb: f64) -> Self {
        Self {
            extensions: extensions.into_iter().map(|e| e.to_lowercase()).collect(),
            include_hidden,
            max_bytes: max_file_mb * 1024.0 * 1024.0,
        }
    }

    /// Lazily walk `root`. Each call starts a fresh traversal; order follows
    /// the filesystem.
    pub fn select<'a>(&'a self, root: &'a Path) -> impl Iterator<Item = PathBuf> + 'a {
        let include_hidden = self.include_hidden;
        let root = root.to_path_buf();
        let mut builder = WalkBuilder::new(&root);
        builder
            .standard_filters(false)
            .follow_links(false)
            .filter_entry(move |entry| {
                include_hidden || entry.depth() == 0 || !is_hidden(entry.file_name())
            });
        builder
            .build()
            .filter_map(Result::ok)
            .map(ignore::DirEntry::into_path)
            .filter(move |path| self.accepts(&root, path))
    }

    /// Whether `path` under `root` passes every filter. Paths that cannot be
    /// stat'ed are rejected.
    #[must_use]
    pub fn accepts(&self, root: &Path, path: &Path) -> bool {
        if !path.is_file() {
            return false;
        }
        let relative = path.strip_prefix(root).unwrap_or(path);
        if !self.include_hidden
            && relative.components().any(|c| match c {
                Component::Normal(name) => is_hidden(name),
                _ => false,
            })
        {
            return false;
        }
        if !self.extensions.is_empty() {
            let Some(ext) = path.extension() else {
                return false;
            };
            let suffix = format!(".{}", ext.to_string_lossy().to_lowercase());
            if !self.extensions.contains(&suffix) {
                return false;
            }
        }
        match std::fs::metadata(path) {
            #[allow(clippy::cast_precision_loss)]
            Ok(meta) => meta.len() as f64 <= self.max_bytes,
            Err(_) => false,
        }
    }
}

fn is_hidden(name: &OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}
