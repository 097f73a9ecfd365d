use clap::Parser;
use std::io::Read;
use std::path::PathBuf;
use std::process;
use tracelens_embed::{AnyProvider, DEFAULT_HASH_DIMENSION, DEFAULT_LOCAL_MODEL, EmbedConfig};
use tracelens_frames::{parse_trace, resolve_frames};
use tracelens_retriever::retrieval::Retriever;
use tracelens_retriever::storage::IndexPaths;

/// Verify a stack trace against a local repository and emit a JSON report.
///
/// Frames that name a file and line are resolved directly from the repo;
/// the rest are looked up in the semantic index when one is given.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the repository root
    #[arg(long)]
    repo: PathBuf,

    /// Path to the stack trace file. If not provided, reads from stdin.
    #[arg(long)]
    trace: Option<PathBuf>,

    /// Index prefix for semantic lookup of frames without file/line info
    #[arg(long)]
    index_path: Option<PathBuf>,

    /// Embedding backend for the index: hash or local
    #[arg(long, default_value = "local")]
    provider: String,

    /// Model name for the local backend
    #[arg(long, default_value = DEFAULT_LOCAL_MODEL)]
    model: String,

    /// Vector dimension for the hash backend
    #[arg(long)]
    dimension: Option<usize>,

    /// Similarity results per frame
    #[arg(long, default_value_t = 5)]
    top_k: usize,

    /// Write the report here instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
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

    if !args.repo.exists() {
        anyhow::bail!("repo path not found: {}", args.repo.display());
    }

    let trace_text = match &args.trace {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let frames = parse_trace(&trace_text);

    let retriever = match &args.index_path {
        Some(index_path) => {
            let config = match args.provider.as_str() {
                "hash" => EmbedConfig::hash(args.dimension.unwrap_or(DEFAULT_HASH_DIMENSION)),
                "local" => EmbedConfig::local(args.model.clone()),
                other => anyhow::bail!("unknown provider: {other}"),
            };
            let provider = AnyProvider::create(config).await?;
            Some(Retriever::open(&IndexPaths::new(index_path), provider)?)
        }
        None => None,
    };

    let reports = resolve_frames(&frames, &args.repo, retriever.as_ref(), args.top_k).await;
    let json = serde_json::to_string_pretty(&reports)?;

    match &args.out {
        Some(out) => {
            std::fs::write(out, &json)?;
            println!("Wrote report for {} frames to {}", reports.len(), out.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}
