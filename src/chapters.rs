use crate::error::{ChapterParseError, SplitError};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use tracing::debug;

/// One line of a chapter table, kept as the raw tokens that were read.
///
/// Numbers are checked lazily by [`ChapterSpec::validate`] so that a single
/// bad entry fails only its own chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChapterSpec {
    pub number: String,
    pub title: String,
    pub start_page: String,
    pub end_page: String,
}

/// The numeric part of a chapter entry after validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChapterRange {
    pub number: u32,
    pub start: u32,
    pub end: u32,
}

#[derive(Debug, Clone, Default)]
pub struct ChapterTable {
    pub chapters: Vec<ChapterSpec>,
    pub skipped: Vec<ChapterParseError>,
}

impl ChapterSpec {
    /// Caller-facing identifier used to correlate progress events
    pub fn label(&self) -> String {
        format!("Chapter {}: {}", self.number, self.title)
    }

    /// Output file name: `Chapter_<number>_<title>.<ext>` with a filesystem-safe title
    pub fn file_name(&self, ext: &str) -> String {
        format!(
            "Chapter_{}_{}.{}",
            self.number,
            sanitize_title(&self.title),
            ext
        )
    }

    pub fn validate(&self) -> Result<ChapterRange, SplitError> {
        let invalid = |reason| self.invalid(reason);
        let number = parse_positive(&self.number, "chapter number").map_err(invalid)?;
        let start = parse_positive(&self.start_page, "start page").map_err(invalid)?;
        let end = parse_positive(&self.end_page, "end page").map_err(invalid)?;

        if end < start {
            return Err(self.invalid(format!(
                "end page {} is before start page {}",
                end, start
            )));
        }

        Ok(ChapterRange { number, start, end })
    }

    fn invalid(&self, reason: String) -> SplitError {
        SplitError::ChapterRange {
            chapter: self.label(),
            reason,
        }
    }
}

fn parse_positive(token: &str, what: &str) -> Result<u32, String> {
    match token.parse::<u32>() {
        Ok(0) => Err(format!("{} must be >= 1", what)),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("invalid {}: {:?}", what, token)),
    }
}

/// Strip commas and semicolons, turn spaces into underscores
pub fn sanitize_title(title: &str) -> String {
    title.replace([',', ';'], "").replace(' ', "_")
}

/// Parse a chapter table: `<number> <title words...> <start> <end>` per line.
///
/// Lines with fewer than four whitespace-separated fields are treated as blank
/// or comment lines and recorded in [`ChapterTable::skipped`].
pub fn parse_chapter_table(text: &str) -> ChapterTable {
    let mut table = ChapterTable::default();

    for (idx, line) in text.lines().enumerate() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 {
            let skipped = ChapterParseError {
                line: idx + 1,
                tokens: parts.len(),
            };
            debug!("skipping chapter table line: {}", skipped);
            table.skipped.push(skipped);
            continue;
        }

        let n = parts.len();
        table.chapters.push(ChapterSpec {
            number: parts[0].to_string(),
            title: parts[1..n - 2].join(" "),
            start_page: parts[n - 2].to_string(),
            end_page: parts[n - 1].to_string(),
        });
    }

    table
}

pub fn load_chapter_table<P: AsRef<Path>>(path: P) -> Result<ChapterTable> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read chapter table: {}", path.display()))?;
    Ok(parse_chapter_table(&text))
}
