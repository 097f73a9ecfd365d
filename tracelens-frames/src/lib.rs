//! # tracelens-frames
//!
//! Stack-frame parsing and resolution for tracelens.
//!
//! A trace comes in as text; frames come out as structured values; every
//! frame resolves to a report. Frames that name a file and line are read
//! directly from the repository (the vector index is bypassed); frames
//! that don't are used as raw-text queries against the semantic index.
//! Misses and lookup failures are fields on the per-frame report, so a
//! batch of frames always yields a full batch of reports.

pub mod parser;
pub mod report;
pub mod snippet;

pub use parser::{FrameLanguage, StackFrame, parse_trace};
pub use report::{FrameReport, resolve_frame, resolve_frames};
pub use snippet::{DEFAULT_CONTEXT_LINES, SnippetMatch, locate_by_basename, read_snippet};
