// ============================================================================
// adam-mem - CLI inspection tool for the Adam memory store
// ============================================================================
// Usage:
//   adam-mem stats                        Show memory statistics
//   adam-mem search <query> [--limit N]   Nearest memories with scores
//   adam-mem add <text>                   Store a manual memory
//   adam-mem list [--limit N]             Most recently stored memories
//   adam-mem import <file>                Bulk-load a conversation export
//   adam-mem ask <query>                  Answer one query through the pipeline
// ============================================================================

use adam_core::memory::{open_memory, MemoryManager};
use adam_core::{
    create_language_model, AdamConfig, ConversationExport, MemorySource, PipelineSettings,
    RagPipeline, StoreBackend,
};
use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Adam memory inspection tool
#[derive(Parser)]
#[command(name = "adam-mem", version, about = "Inspect and manage the Adam vector memory")]
struct Cli {
    /// Vector store backend: qdrant or memory (default: ADAM_STORE)
    #[arg(long, global = true)]
    store: Option<StoreBackend>,

    /// Qdrant URL (default: QDRANT_URL)
    #[arg(long, global = true)]
    qdrant_url: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show memory statistics (count, collection, embedding model)
    Stats,

    /// Search memories nearest to a query
    Search {
        query: String,

        #[arg(long, default_value = "5")]
        limit: u64,
    },

    /// Store a memory by hand
    Add { text: String },

    /// List the most recently stored memories
    List {
        #[arg(long, default_value = "20")]
        limit: u64,
    },

    /// Import a conversation export file
    Import { file: PathBuf },

    /// Answer a query with retrieved context
    Ask { query: String },
}

fn format_timestamp(ts: i64) -> String {
    Utc.timestamp_opt(ts, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| format!("(invalid: {})", ts))
}

fn preview(text: &str, width: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= width {
        return flat;
    }
    let mut cut: String = flat.chars().take(width.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}

fn apply_overrides(config: &mut AdamConfig, cli: &Cli) {
    if let Some(store) = cli.store {
        config.store = store;
    }
    if let Some(url) = &cli.qdrant_url {
        config.qdrant_url = url.clone();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // Logs go to stderr so stdout stays parseable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = AdamConfig::from_env().context("Invalid configuration")?;
    apply_overrides(&mut config, &cli);

    let memory = open_memory(&config)
        .await
        .context("Failed to open memory store")?;

    match cli.command {
        Commands::Stats => cmd_stats(&memory, cli.json).await,
        Commands::Search { ref query, limit } => cmd_search(&memory, query, limit, cli.json).await,
        Commands::Add { ref text } => cmd_add(&memory, text, cli.json).await,
        Commands::List { limit } => cmd_list(&memory, limit, cli.json).await,
        Commands::Import { ref file } => {
            let pipeline = build_pipeline(&config, memory)?;
            cmd_import(&pipeline, file, cli.json).await
        }
        Commands::Ask { ref query } => {
            let pipeline = build_pipeline(&config, memory)?;
            cmd_ask(&pipeline, query, cli.json).await
        }
    }
}

fn build_pipeline(config: &AdamConfig, memory: MemoryManager) -> Result<RagPipeline> {
    let llm = create_language_model(config)?;
    Ok(RagPipeline::new(
        Arc::new(memory),
        llm,
        None,
        PipelineSettings::from(config),
    ))
}

async fn cmd_stats(memory: &MemoryManager, json: bool) -> Result<()> {
    let stats = memory.stats().await?;
    let healthy = memory.health_check().await.unwrap_or(false);

    if json {
        let out = serde_json::json!({ "stats": stats, "healthy": healthy });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("=== Adam Memory Stats ===");
    println!("Collection: {}", stats.collection);
    println!("Embeddings: {}", stats.embedding_model);
    println!("Memories:   {}", stats.points_count);
    println!("Healthy:    {}", if healthy { "yes" } else { "no" });
    Ok(())
}

async fn cmd_search(memory: &MemoryManager, query: &str, limit: u64, json: bool) -> Result<()> {
    let hits = memory.search(query, limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!("No memories found.");
        return Ok(());
    }

    println!("{:<7}  {:<8}  {}", "SCORE", "SOURCE", "DOCUMENT");
    println!("{}", "-".repeat(80));
    for hit in &hits {
        println!(
            "{:<7.4}  {:<8}  {}",
            hit.score,
            hit.entry.source.as_str(),
            preview(&hit.entry.document, 60)
        );
    }
    Ok(())
}

async fn cmd_add(memory: &MemoryManager, text: &str, json: bool) -> Result<()> {
    let text = text.trim();
    if text.is_empty() {
        anyhow::bail!("Refusing to store an empty memory");
    }

    let entry = memory
        .add_memory_with_source(text, MemorySource::Manual)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        println!("Stored memory {}", entry.id);
    }
    Ok(())
}

async fn cmd_list(memory: &MemoryManager, limit: u64, json: bool) -> Result<()> {
    let entries = memory.list(limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No memories found.");
        return Ok(());
    }

    println!(
        "{:<36}  {:<8}  {:<23}  {}",
        "MEMORY ID", "SOURCE", "CREATED AT", "DOCUMENT"
    );
    println!("{}", "-".repeat(110));
    for entry in &entries {
        println!(
            "{:<36}  {:<8}  {:<23}  {}",
            entry.id,
            entry.source.as_str(),
            format_timestamp(entry.created_at),
            preview(&entry.document, 40)
        );
    }

    println!("\nShown: {} memories", entries.len());
    Ok(())
}

async fn cmd_import(pipeline: &RagPipeline, file: &Path, json: bool) -> Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let export = ConversationExport::from_slice(&bytes)
        .with_context(|| format!("{} is not a conversation export", file.display()))?;

    let report = pipeline.load_conversations(&export).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Imported {}/{} fragments ({:.2}%) from {} conversations",
            report.loaded,
            report.total,
            report.percent,
            export.conversations.len()
        );
    }
    Ok(())
}

async fn cmd_ask(pipeline: &RagPipeline, query: &str, json: bool) -> Result<()> {
    let response = pipeline.answer(query).await?;

    if json {
        println!("{}", serde_json::json!({ "response": response }));
    } else {
        println!("{}", response);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_with_global_overrides() {
        let cli = Cli::try_parse_from([
            "adam-mem",
            "search",
            "capital of France",
            "--limit",
            "2",
            "--store",
            "memory",
        ])
        .unwrap();

        assert_eq!(cli.store, Some(StoreBackend::Memory));
        match cli.command {
            Commands::Search { query, limit } => {
                assert_eq!(query, "capital of France");
                assert_eq!(limit, 2);
            }
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn test_unknown_store_is_rejected() {
        assert!(Cli::try_parse_from(["adam-mem", "--store", "redis", "stats"]).is_err());
    }

    #[test]
    fn test_overrides_replace_config() {
        let cli = Cli::try_parse_from([
            "adam-mem",
            "--qdrant-url",
            "http://qdrant:6334",
            "--store",
            "memory",
            "stats",
        ])
        .unwrap();

        let mut config = AdamConfig::default();
        apply_overrides(&mut config, &cli);
        assert_eq!(config.store, StoreBackend::Memory);
        assert_eq!(config.qdrant_url, "http://qdrant:6334");
    }

    #[test]
    fn test_overrides_absent_keep_config() {
        let cli = Cli::try_parse_from(["adam-mem", "list"]).unwrap();
        let mut config = AdamConfig::default();
        let before = config.qdrant_url.clone();
        apply_overrides(&mut config, &cli);
        assert_eq!(config.qdrant_url, before);
        assert_eq!(config.store, StoreBackend::Qdrant);
    }

    #[test]
    fn test_help_names_real_env_keys() {
        use clap::CommandFactory;

        let help = Cli::command().render_long_help().to_string();
        assert!(help.contains("(default: QDRANT_URL)"));
        assert!(help.contains("(default: ADAM_STORE)"));
        assert!(!help.contains("ADAM_QDRANT_URL"));

        let config =
            AdamConfig::from_lookup(|key| (key == "QDRANT_URL").then(|| "http://q:6334".to_string()))
                .unwrap();
        assert_eq!(config.qdrant_url, "http://q:6334");
    }

    #[test]
    fn test_preview_flattens_and_truncates() {
        assert_eq!(preview("short\n text", 20), "short text");
        assert_eq!(preview("abcdefghijkl", 8), "abcde...");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00 UTC");
    }
}
