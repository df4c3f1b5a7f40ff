mod cli;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use coderag_core::Config;
use coderag_core::bootstrap::{create_embedder, create_tools, ingest_options};
use coderag_core::config::resolve_config_path;
use coderag_index::IndexError;
use coderag_index::gateway::IndexGateway;
use coderag_index::indexer::{CodeIndexer, IngestReport};
use coderag_tools::codebase::resolve_db_dir;
use coderag_tools::{ListCollectionsParams, ListRowsParams, QueryCodebaseParams};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_subscriber();

    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config.as_deref());
    let mut config = Config::load(&config_path)?;
    cli.command.apply_overrides(&mut config);
    config.validate()?;
    tracing::debug!(config = %config_path.display(), "configuration loaded");

    match cli.command {
        Commands::Ingest { source, reset, .. } => run_ingest(&config, &source, reset).await,
        Commands::Query { question, .. } => {
            let tools = create_tools(&config)?;
            let out = tools
                .query_codebase(QueryCodebaseParams {
                    question,
                    top_k: Some(to_i64(config.query.top_k)),
                    collection: None,
                    db_dir: None,
                })
                .await
                .map_err(|e| anyhow::anyhow!(e.message().to_owned()))?;
            println!("{out}");
            Ok(())
        }
        Commands::Rows {
            offset,
            documents,
            json,
            ..
        } => run_rows(&config, offset, documents, json).await,
        Commands::Collections { .. } => {
            let tools = create_tools(&config)?;
            println!(
                "{}",
                tools
                    .list_collections(ListCollectionsParams::default())
                    .await
            );
            Ok(())
        }
        Commands::Serve => {
            let tools = Arc::new(create_tools(&config)?);
            tokio::select! {
                result = coderag_mcp::serve_stdio(tools) => result?,
                _ = tokio::signal::ctrl_c() => tracing::info!("interrupted, shutting down"),
            }
            Ok(())
        }
    }
}

/// Logs go to stderr so stdout stays free for results and the MCP transport.
fn init_subscriber() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

async fn run_ingest(config: &Config, source: &Path, reset: bool) -> anyhow::Result<()> {
    let db_dir = resolve_db_dir(&config.index.db_dir);
    let embedder = Arc::new(create_embedder(config)?);
    let gateway = IndexGateway::create(&db_dir, embedder)
        .await
        .with_context(|| format!("failed to open index at {}", db_dir.display()))?;
    let report = CodeIndexer::new(gateway, ingest_options(config, reset)?)
        .ingest(source)
        .await?;
    println!("{}", ingest_summary(&report, source));
    Ok(())
}

fn ingest_summary(report: &IngestReport, source: &Path) -> String {
    let mut out = if report.chunks_written == 0 {
        "No chunks were produced; check your filters.".to_owned()
    } else {
        format!(
            "Ingested {} chunks from {}.",
            report.chunks_written,
            source.display()
        )
    };
    if !report.skipped.is_empty() {
        out.push_str(&format!("\nSkipped {} unreadable files.", report.skipped.len()));
    }
    out
}

async fn run_rows(config: &Config, offset: usize, documents: bool, json: bool) -> anyhow::Result<()> {
    if !json {
        let tools = create_tools(config)?;
        let out = tools
            .list_rows(ListRowsParams {
                collection: None,
                db_dir: None,
                limit: Some(to_i64(config.query.rows_limit)),
                offset: Some(to_i64(offset)),
                include_documents: documents,
            })
            .await
            .map_err(|e| anyhow::anyhow!(e.message().to_owned()))?;
        println!("{out}");
        return Ok(());
    }

    let db_dir = resolve_db_dir(&config.index.db_dir);
    let collection = &config.index.collection;
    let not_found = || IndexError::CollectionNotFound {
        collection: collection.clone(),
        db_dir: db_dir.clone(),
    };
    let embedder = Arc::new(create_embedder(config)?);
    let Some(gateway) = IndexGateway::open_existing(&db_dir, embedder).await? else {
        bail!(not_found());
    };
    let handle = match gateway.open(collection).await {
        Err(IndexError::CollectionNotFound { .. }) => bail!(not_found()),
        other => other?,
    };
    let window = handle.get(config.query.rows_limit, offset, documents).await?;
    println!("{}", serde_json::to_string_pretty(&window)?);
    Ok(())
}
