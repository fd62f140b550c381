use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use reposcope_core::Config;
use reposcope_core::bootstrap;
use reposcope_index::format_as_context;

#[derive(Parser, Debug)]
#[command(
    name = "reposcope",
    version,
    about = "Index repositories into a vector store and retrieve review context"
)]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the files that would be indexed
    Discover {
        /// Repository key (`owner/name` for GitHub)
        repo: String,
        /// Subtree or single file to start from
        #[arg(long, default_value = "")]
        path: String,
    },
    /// Discover, fetch, chunk, embed and store a repository
    Index {
        repo: String,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Retrieve the chunks most similar to a query
    Query {
        text: String,
        #[arg(long)]
        top_k: Option<usize>,
        /// Only search chunks of this repository
        #[arg(long)]
        repo: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_subscriber();
    let cli = Cli::parse();
    let config = bootstrap::load_config(cli.config)?;

    match cli.command {
        Command::Discover { repo, path } => discover(&config, &repo, &path).await,
        Command::Index { repo, json } => index(&config, &repo, json).await,
        Command::Query { text, top_k, repo } => {
            query(&config, &text, top_k, repo.as_deref()).await
        }
    }
}

fn init_subscriber() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

async fn discover(config: &Config, repo: &str, path: &str) -> anyhow::Result<()> {
    let host = bootstrap::create_host(config);
    let discoverer = bootstrap::build_discoverer(config, host);
    let paths = discoverer
        .discover(repo, path)
        .await
        .with_context(|| format!("failed to discover files in {repo}"))?;
    for path in paths {
        println!("{path}");
    }
    Ok(())
}

async fn index(config: &Config, repo: &str, json: bool) -> anyhow::Result<()> {
    let provider = Arc::new(bootstrap::create_provider(config));
    let store = bootstrap::create_store(config)?;
    let host = bootstrap::create_host(config);
    let indexer = bootstrap::build_indexer(config, provider, store, host);

    let report = tokio::select! {
        res = indexer.index_repository(repo) => {
            res.with_context(|| format!("failed to index {repo}"))?
        }
        _ = tokio::signal::ctrl_c() => bail!("interrupted"),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }
    if !report.is_clean() {
        tracing::warn!(failures = report.failures.len(), "indexing finished with failures");
    }
    Ok(())
}

async fn query(
    config: &Config,
    text: &str,
    top_k: Option<usize>,
    repo: Option<&str>,
) -> anyhow::Result<()> {
    let top_k = top_k.unwrap_or(config.retrieval.top_k);
    if top_k == 0 {
        bail!("--top-k must be greater than zero");
    }
    let provider = Arc::new(bootstrap::create_provider(config));
    let store = bootstrap::create_store(config)?;
    let retriever = bootstrap::build_retriever(config, provider, store);

    let chunks = match repo {
        Some(repo) => retriever.retrieve_scoped(repo, text, top_k).await,
        None => retriever.retrieve(text, top_k).await,
    }
    .context("context retrieval failed")?;

    if chunks.is_empty() {
        eprintln!("no matching context");
    } else {
        println!("{}", format_as_context(&chunks));
    }
    Ok(())
}
