//! Integration tests for frame resolution against a real repo and index.

use anyhow::Result;
use std::path::Path;
use tempfile::tempdir;
use tracelens_embed::HashEmbedProvider;
use tracelens_frames::{parse_trace, resolve_frames};
use tracelens_retriever::retrieval::{Indexer, IndexerConfig, Retriever};
use tracelens_retriever::storage::IndexPaths;

const DIM: usize = 128;

fn write_repo_file(repo: &Path, name: &str, content: &str) {
    std::fs::write(repo.join(name), content).unwrap();
}

async fn build_index(repo: &Path, prefix: &Path) -> Result<()> {
    let config = IndexerConfig::new(repo, prefix);
    Indexer::new(config, HashEmbedProvider::new(DIM))
        .build()
        .await?;
    Ok(())
}

#[tokio::test]
async fn frame_with_file_and_line_bypasses_the_index() -> Result<()> {
    let dir = tempdir()?;
    let repo = dir.path().join("repo");
    std::fs::create_dir(&repo)?;
    let listing: String = (1..=50).map(|i| format!("// line {i}\n")).collect();
    write_repo_file(&repo, "Service.cs", &listing);

    let frames = parse_trace("   at My.App.Service.Handle(Service.cs:42)");
    assert_eq!(frames.len(), 1);

    let reports =
        resolve_frames::<HashEmbedProvider>(&frames, &repo, None, 3).await;
    assert_eq!(reports.len(), 1);

    let matched = reports[0].matched.as_ref().expect("expected direct match");
    assert!(matched.found);
    assert!(matched.snippet.as_ref().unwrap().contains("// line 42"));
    assert!(reports[0].results.is_empty());
    assert!(reports[0].error.is_none());

    Ok(())
}

#[tokio::test]
async fn symbol_only_frame_falls_back_to_semantic_lookup() -> Result<()> {
    let dir = tempdir()?;
    let repo = dir.path().join("repo");
    std::fs::create_dir(&repo)?;
    write_repo_file(
        &repo,
        "orders.cs",
        "void ProcessOrder() { Validate(); ProcessOrder_Retry(); ProcessOrder(); }\n",
    );
    write_repo_file(
        &repo,
        "billing.cs",
        "void ChargeCard() { Gateway.Charge(); Receipt.Send(); }\n",
    );

    let prefix = dir.path().join("index");
    build_index(&repo, &prefix).await?;
    let retriever = Retriever::open(&IndexPaths::new(&prefix), HashEmbedProvider::new(DIM))?;

    let frames = parse_trace("   at ProcessOrder()");
    let reports = resolve_frames(&frames, &repo, Some(&retriever), 2).await;

    assert_eq!(reports.len(), 1);
    assert!(reports[0].matched.is_none());
    assert_eq!(reports[0].results.len(), 2);
    // The frame's raw text shares the ProcessOrder token with orders.cs.
    assert!(reports[0].results[0].record.path.ends_with("orders.cs"));
    assert!(reports[0].error.is_none());

    Ok(())
}

#[tokio::test]
async fn unresolvable_location_records_miss_and_still_searches() -> Result<()> {
    let dir = tempdir()?;
    let repo = dir.path().join("repo");
    std::fs::create_dir(&repo)?;
    write_repo_file(&repo, "worker.py", "def run_job():\n    return queue_next()\n");

    let prefix = dir.path().join("index");
    build_index(&repo, &prefix).await?;
    let retriever = Retriever::open(&IndexPaths::new(&prefix), HashEmbedProvider::new(DIM))?;

    let frames = parse_trace("  File \"gone/elsewhere.py\", line 7, in run_job");
    let reports = resolve_frames(&frames, &repo, Some(&retriever), 1).await;

    assert_eq!(reports.len(), 1);
    let matched = reports[0].matched.as_ref().expect("miss must be recorded");
    assert!(!matched.found);
    assert_eq!(reports[0].results.len(), 1);

    Ok(())
}

#[tokio::test]
async fn batch_resolution_never_drops_frames() -> Result<()> {
    let dir = tempdir()?;
    let repo = dir.path().join("repo");
    std::fs::create_dir(&repo)?;
    write_repo_file(&repo, "main.py", "def main():\n    start()\n");

    let trace = "\
Traceback (most recent call last):
  File \"main.py\", line 2, in main
  File \"missing.py\", line 9, in helper
   at Legacy.Component.Run()
";
    let frames = parse_trace(trace);
    assert_eq!(frames.len(), 3);

    // No index configured: every frame still gets a report.
    let reports = resolve_frames::<HashEmbedProvider>(&frames, &repo, None, 3).await;
    assert_eq!(reports.len(), 3);
    assert!(reports[0].matched.as_ref().unwrap().found);
    assert!(!reports[1].matched.as_ref().unwrap().found);
    assert!(reports[2].matched.is_none());
    assert!(reports.iter().all(|r| r.error.is_none()));

    Ok(())
}
