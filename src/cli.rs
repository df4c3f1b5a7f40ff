use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use coderag_core::Config;
use coderag_index::selector::parse_extensions;

#[derive(Debug, Parser)]
#[command(name = "coderag", version)]
#[command(about = "Index a source tree and ask questions about it", long_about = None)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a TOML config file")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Location of a collection; unset fields fall back to config.
#[derive(Debug, Default, Args)]
pub struct Target {
    #[arg(long, help = "Index directory")]
    pub db_dir: Option<PathBuf>,

    #[arg(long, help = "Collection name")]
    pub collection: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Chunk and embed a source tree into a collection")]
    Ingest {
        #[arg(help = "Root of the source tree")]
        source: PathBuf,

        #[command(flatten)]
        target: Target,

        #[arg(long, help = "Comma-separated extensions, e.g. \".rs,.py\"")]
        extensions: Option<String>,

        #[arg(long, help = "Descend into hidden files and directories")]
        include_hidden: bool,

        #[arg(long, help = "Skip files larger than this many MiB")]
        max_file_mb: Option<f64>,

        #[arg(long, help = "Lines per chunk")]
        chunk_lines: Option<usize>,

        #[arg(long, help = "Lines shared by consecutive chunks")]
        chunk_overlap: Option<usize>,

        #[arg(long, help = "Chunks embedded per write")]
        batch_size: Option<usize>,

        #[arg(long, help = "Drop the collection before ingesting")]
        reset: bool,
    },

    #[command(about = "Retrieve the chunks nearest to a question")]
    Query {
        #[arg(help = "Question about the code")]
        question: String,

        #[command(flatten)]
        target: Target,

        #[arg(long, help = "Number of chunks to retrieve")]
        top_k: Option<usize>,

        #[arg(long, help = "Ollama model used to write an answer")]
        synthesis_model: Option<String>,
    },

    #[command(about = "Page through the stored rows of a collection")]
    Rows {
        #[command(flatten)]
        target: Target,

        #[arg(long, help = "Rows to show")]
        limit: Option<usize>,

        #[arg(long, default_value_t = 0, help = "Rows to skip")]
        offset: usize,

        #[arg(long, help = "Include document snippets")]
        documents: bool,

        #[arg(long, help = "Print the raw window as JSON")]
        json: bool,
    },

    #[command(about = "List collections in an index directory")]
    Collections {
        #[arg(long, help = "Index directory")]
        db_dir: Option<PathBuf>,
    },

    #[command(about = "Serve the tools over MCP on stdin/stdout")]
    Serve,
}

impl Target {
    fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.db_dir {
            config.index.db_dir.clone_from(dir);
        }
        if let Some(name) = &self.collection {
            config.index.collection.clone_from(name);
        }
    }
}

impl Commands {
    /// Fold command-line flags over the loaded config.
    pub fn apply_overrides(&self, config: &mut Config) {
        match self {
            Self::Ingest {
                target,
                extensions,
                include_hidden,
                max_file_mb,
                chunk_lines,
                chunk_overlap,
                batch_size,
                ..
            } => {
                target.apply(config);
                if let Some(raw) = extensions {
                    config.ingest.extensions = parse_extensions(Some(raw));
                }
                if *include_hidden {
                    config.ingest.include_hidden = true;
                }
                if let Some(mb) = max_file_mb {
                    config.ingest.max_file_mb = *mb;
                }
                if let Some(n) = chunk_lines {
                    config.ingest.chunk_lines = *n;
                }
                if let Some(n) = chunk_overlap {
                    config.ingest.chunk_overlap = *n;
                }
                if let Some(n) = batch_size {
                    config.ingest.batch_size = *n;
                }
            }
            Self::Query {
                target,
                top_k,
                synthesis_model,
                ..
            } => {
                target.apply(config);
                if let Some(k) = top_k {
                    config.query.top_k = *k;
                }
                if let Some(model) = synthesis_model {
                    config.llm.synthesis_model = Some(model.clone());
                }
            }
            Self::Rows { target, limit, .. } => {
                target.apply(config);
                if let Some(n) = limit {
                    config.query.rows_limit = *n;
                }
            }
            Self::Collections { db_dir } => {
                if let Some(dir) = db_dir {
                    config.index.db_dir.clone_from(dir);
                }
            }
            Self::Serve => {}
        }
    }
}
