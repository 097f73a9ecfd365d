use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracelens_embed::{AnyProvider, DEFAULT_HASH_DIMENSION, DEFAULT_LOCAL_MODEL, EmbedConfig};
use tracelens_retriever::retrieval::{Indexer, IndexerConfig, Retriever};
use tracelens_retriever::storage::IndexPaths;

/// Build and query the tracelens semantic code index.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build or incrementally update an index from a repository
    Index {
        /// Path to the repository to index
        #[arg(long)]
        repo: PathBuf,
        /// Index prefix; writes <prefix>, <prefix>.meta and <prefix>.npy
        #[arg(long, default_value = "./index.tlvs")]
        index_path: PathBuf,
        /// Chunk size in characters
        #[arg(long, default_value_t = tracelens_context::DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
        /// Comma-separated extension allow-list (defaults to common source
        /// extensions)
        #[arg(long, value_delimiter = ',')]
        extensions: Option<Vec<String>>,
        /// Skip writing the raw .npy vector backup
        #[arg(long)]
        no_raw_backup: bool,
        #[command(flatten)]
        provider: ProviderArgs,
    },
    /// Search an index for chunks similar to a query
    Search {
        /// Index prefix used at build time
        #[arg(long, default_value = "./index.tlvs")]
        index_path: PathBuf,
        /// Query text, typically a raw stack-frame line
        #[arg(long)]
        query: String,
        /// Maximum number of results
        #[arg(long, default_value_t = 5)]
        top_k: usize,
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
        #[command(flatten)]
        provider: ProviderArgs,
    },
}

/// Embedding backend selection, shared by both subcommands. The same
/// provider family and dimension used at build time must be used to query.
#[derive(clap::Args, Debug)]
struct ProviderArgs {
    /// Embedding backend: hash, local or remote
    #[arg(long, default_value = "local")]
    provider: String,
    /// Model name for the local backend
    #[arg(long, default_value = DEFAULT_LOCAL_MODEL)]
    model: String,
    /// Vector dimension for the hash and remote backends
    #[arg(long)]
    dimension: Option<usize>,
    /// API base URL for the remote backend
    #[arg(long)]
    api_base: Option<String>,
    /// API key for the remote backend
    #[arg(long)]
    api_key: Option<String>,
}

impl ProviderArgs {
    fn to_config(&self) -> anyhow::Result<EmbedConfig> {
        match self.provider.as_str() {
            "hash" => Ok(EmbedConfig::hash(
                self.dimension.unwrap_or(DEFAULT_HASH_DIMENSION),
            )),
            "local" => Ok(EmbedConfig::local(self.model.clone())),
            "remote" => {
                let api_base = self
                    .api_base
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("--api-base is required for --provider remote"))?;
                let api_key = self
                    .api_key
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("--api-key is required for --provider remote"))?;
                let dimension = self
                    .dimension
                    .ok_or_else(|| anyhow::anyhow!("--dimension is required for --provider remote"))?;
                Ok(EmbedConfig::remote(api_base, api_key, self.model.clone(), dimension))
            }
            other => Err(anyhow::anyhow!("unknown provider: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum OutputFormat {
    Summary,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "summary" => Ok(OutputFormat::Summary),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid format: {s}")),
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command {
        Commands::Index {
            repo,
            index_path,
            chunk_size,
            extensions,
            no_raw_backup,
            provider,
        } => {
            let provider = AnyProvider::create(provider.to_config()?).await?;
            let mut config = IndexerConfig::new(repo, index_path)
                .with_chunk_size(chunk_size)
                .with_raw_backup(!no_raw_backup);
            if let Some(extensions) = extensions {
                config = config.with_extensions(extensions);
            }

            let report = Indexer::new(config, provider).build().await?;
            println!(
                "Indexed {} new chunks ({} embeddings computed) from {} files",
                report.chunks_added, report.embeddings_computed, report.files_seen
            );
            Ok(())
        }
        Commands::Search {
            index_path,
            query,
            top_k,
            format,
            provider,
        } => {
            let provider = AnyProvider::create(provider.to_config()?).await?;
            let retriever = Retriever::open(&IndexPaths::new(index_path), provider)?;
            let results = retriever.search(&query, top_k).await?;

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&results)?);
                }
                OutputFormat::Summary => {
                    println!("Found {} similar chunks:", results.len());
                    for result in results {
                        println!(
                            "  distance {:.4} | {}:{} | {}",
                            result.distance,
                            result.record.path,
                            result.record.chunk_index,
                            preview(&result.snippet, 100)
                        );
                    }
                }
            }
            Ok(())
        }
    }
}

fn preview(text: &str, limit: usize) -> String {
    let flattened: String = text.chars().map(|c| if c == '\n' { ' ' } else { c }).collect();
    if flattened.chars().count() > limit {
        let truncated: String = flattened.chars().take(limit).collect();
        format!("{truncated}...")
    } else {
        flattened
    }
}
