//! Glossa CLI
//!
//! Annotates a declarative analytics workspace with generated descriptions:
//! - `annotate`: materialize the workspace layout (unless `--offline`) and
//!   run the six-phase annotation pass
//! - `extract`: print the entity references found in a query expression
//! - `cache`: print the persisted description mapping

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;

use glossa_annotate::catalog::{CatalogStore, HttpCatalogStore, LocalCatalogStore};
use glossa_annotate::engine::{AnnotationEngine, EngineConfig};
use glossa_annotate::extract::{extract_expression_references, has_metric_reference};
use glossa_annotate::llm::{
    DescriptionSource, GenerationConfig, LookupSource, OpenAiSource, StaticSource,
};
use glossa_annotate::DescriptionCache;

mod config;

#[derive(Parser)]
#[command(name = "glossa")]
#[command(
    author,
    version,
    about = "Generated descriptions for declarative analytics catalogs"
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full annotation pass over the workspace layout.
    Annotate {
        /// Skip fetching the remote layout and annotate the tree already on
        /// disk.
        #[arg(long)]
        offline: bool,

        /// Answer every generation request with this fixed text instead of
        /// calling the service (dry run).
        #[arg(long)]
        stub: Option<String>,

        /// Serve generation requests from a prompt -> description YAML
        /// mapping instead of calling the service.
        #[arg(long, value_name = "FILE", conflicts_with = "stub")]
        from_file: Option<PathBuf>,

        /// Files per logged batch within a phase.
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Print the entity references found in a query expression (reads
    /// stdin when no expression is given).
    Extract { expression: Option<String> },

    /// Print the persisted description cache.
    Cache,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Annotate {
            offline,
            stub,
            from_file,
            batch_size,
        } => cmd_annotate(&cli.config, offline, stub, from_file, batch_size),
        Commands::Extract { expression } => cmd_extract(expression),
        Commands::Cache => cmd_cache(&cli.config),
    }
}

fn cmd_annotate(
    config_path: &PathBuf,
    offline: bool,
    stub: Option<String>,
    from_file: Option<PathBuf>,
    batch_size: Option<usize>,
) -> Result<()> {
    let settings = config::load(config_path)?;

    let source: Arc<dyn DescriptionSource> = if let Some(text) = stub {
        Arc::new(StaticSource::new(text))
    } else if let Some(path) = from_file {
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read canned descriptions {}", path.display()))?;
        let entries: BTreeMap<String, String> = serde_yaml::from_str(&text)
            .with_context(|| format!("failed to parse canned descriptions {}", path.display()))?;
        Arc::new(LookupSource::new(entries))
    } else {
        Arc::new(OpenAiSource::new(GenerationConfig::openai(
            &settings.llm_api_token,
            &settings.llm_model,
        ))?)
    };

    let catalog: Box<dyn CatalogStore> = if offline {
        Box::new(LocalCatalogStore)
    } else {
        Box::new(HttpCatalogStore::new(&settings.hostname, &settings.api_token)?)
    };

    let mut engine_config = EngineConfig::new(&settings.workspace_id, &settings.root_path);
    if let Some(batch_size) = batch_size.or(settings.batch_size) {
        engine_config.batch_size = batch_size;
    }

    let mut engine = AnnotationEngine::new(engine_config, catalog, source);
    let layout_root = settings.layout_root();

    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(engine.run(&layout_root))?;

    println!("{}", "annotation complete".green().bold());
    println!("  generated: {}", report.generated);
    println!("  reused from cache: {}", report.reused);
    if report.rejected > 0 {
        println!("  {}: {}", "rejected".yellow(), report.rejected);
    }
    if report.skipped_documents > 0 {
        println!(
            "  {}: {}",
            "skipped unreadable documents".yellow(),
            report.skipped_documents
        );
    }
    println!("  cached descriptions: {}", engine.cache().len());
    Ok(())
}

fn cmd_extract(expression: Option<String>) -> Result<()> {
    let expression = match expression {
        Some(expression) => expression,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read expression from stdin")?;
            buffer
        }
    };

    let references = extract_expression_references(&expression);
    if references.is_empty() {
        println!("{}", "no references found".dimmed());
        return Ok(());
    }
    for id in &references {
        println!("{id}");
    }
    if has_metric_reference(&expression) {
        println!("{}", "(contains metric references)".dimmed());
    }
    Ok(())
}

fn cmd_cache(config_path: &PathBuf) -> Result<()> {
    let settings = config::load(config_path)?;
    let cache = DescriptionCache::load(&settings.root_path.join("descriptions.yaml"));
    if cache.is_empty() {
        println!("{}", "description cache is empty".dimmed());
        return Ok(());
    }
    for (id, description) in cache.snapshot() {
        println!("{}: {description}", id.cyan());
    }
    Ok(())
}
