//! Error types for chapter extraction.
//!
//! `SourceRead` and `Scratch` abort a run. Every other variant is scoped to a
//! single chapter (or to cleanup) and is reported without stopping the run.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SplitError {
    /// The source PDF could not be opened or parsed
    #[error("Failed to read source PDF {}: {message}", .path.display())]
    SourceRead { path: PathBuf, message: String },

    /// A page unit could not be materialized in the scratch area
    #[error("Scratch area error: {0}")]
    Scratch(String),

    /// The chapter entry is structurally invalid or covers no pages
    #[error("Invalid range for {chapter}: {reason}")]
    ChapterRange { chapter: String, reason: String },

    /// The chapter output could not be named or written
    #[error("Failed to write {chapter} to {}: {message}", .path.display())]
    ChapterWrite {
        chapter: String,
        path: PathBuf,
        message: String,
    },

    /// The scratch area could not be removed after the run
    #[error("Failed to clean up scratch area {}: {source}", .path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A chapter table line that was skipped because it had fewer than four fields.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Line {line}: expected at least 4 fields, found {tokens}")]
pub struct ChapterParseError {
    pub line: usize,
    pub tokens: usize,
}
