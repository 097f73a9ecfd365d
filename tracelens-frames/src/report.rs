//! Per-frame resolution reports.
//!
//! This is the retrieval boundary: every frame produces a [`FrameReport`],
//! and failures are fields on the report rather than errors crossing into
//! the caller. One unresolvable frame never aborts a multi-frame batch.

use crate::parser::StackFrame;
use crate::snippet::{self, DEFAULT_CONTEXT_LINES, SnippetMatch};
use serde::Serialize;
use std::path::Path;
use tracelens_embed::EmbeddingProvider;
use tracelens_retriever::retrieval::{Retriever, SearchResult};
use tracing::warn;

/// Resolution outcome for one frame.
#[derive(Debug, Clone, Serialize)]
pub struct FrameReport {
    /// The frame, echoed back so reports stand alone
    pub frame: StackFrame,
    /// Direct file/line window when the frame named one (hit or recorded
    /// miss)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<SnippetMatch>,
    /// Similarity results for the frame's raw text
    pub results: Vec<SearchResult>,
    /// Semantic-lookup failure, recorded rather than raised
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Resolve one frame against the repository and, when available, the
/// semantic index.
///
/// A frame that names a resolvable file and line bypasses the index
/// entirely. Otherwise (no location, or the location does not exist in
/// this checkout) the frame's raw text is queried against the index, with
/// the direct miss recorded alongside the results.
pub async fn resolve_frame<P: EmbeddingProvider>(
    frame: &StackFrame,
    repo: &Path,
    retriever: Option<&Retriever<P>>,
    top_k: usize,
) -> FrameReport {
    if let (Some(file), Some(line)) = (&frame.file, frame.line) {
        let matched = snippet::read_snippet(repo, file, line, DEFAULT_CONTEXT_LINES);
        if matched.found {
            return FrameReport {
                frame: frame.clone(),
                matched: Some(matched),
                results: Vec::new(),
                error: None,
            };
        }
        return semantic_report(frame, Some(matched), retriever, top_k).await;
    }
    semantic_report(frame, None, retriever, top_k).await
}

/// Resolve every frame independently, in trace order.
pub async fn resolve_frames<P: EmbeddingProvider>(
    frames: &[StackFrame],
    repo: &Path,
    retriever: Option<&Retriever<P>>,
    top_k: usize,
) -> Vec<FrameReport> {
    let mut reports = Vec::with_capacity(frames.len());
    for frame in frames {
        reports.push(resolve_frame(frame, repo, retriever, top_k).await);
    }
    reports
}

async fn semantic_report<P: EmbeddingProvider>(
    frame: &StackFrame,
    matched: Option<SnippetMatch>,
    retriever: Option<&Retriever<P>>,
    top_k: usize,
) -> FrameReport {
    let Some(retriever) = retriever else {
        return FrameReport {
            frame: frame.clone(),
            matched,
            results: Vec::new(),
            error: None,
        };
    };

    match retriever.search(&frame.raw, top_k).await {
        Ok(results) => FrameReport {
            frame: frame.clone(),
            matched,
            results,
            error: None,
        },
        Err(e) => {
            warn!("Semantic lookup failed for frame '{}': {e}", frame.raw);
            FrameReport {
                frame: frame.clone(),
                matched,
                results: Vec::new(),
                error: Some(e.to_string()),
            }
        }
    }
}
