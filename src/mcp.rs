use anyhow::Result;
use rmcp::{
    ServerHandler, ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ServerCapabilities, ServerInfo},
    schemars, tool, tool_router,
};
use serde::{Deserialize, Serialize};

use crate::assembler::OUTPUT_EXTENSION;
use crate::chapters::{load_chapter_table, parse_chapter_table, ChapterTable};
use crate::pdf::PdfDocument;
use crate::pipeline::{run_collected, PipelineEvent, ProcessingJob, RunOutcome};

// Request structs for tools

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PathRequest {
    #[schemars(description = "Path to the PDF file")]
    pub path: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ChapterTableRequest {
    #[schemars(description = "Path to a chapter table file")]
    #[serde(default)]
    pub chapters_path: Option<String>,
    #[schemars(description = "Inline chapter table, one '<number> <title...> <start> <end>' per line")]
    #[serde(default)]
    pub chapters: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SplitChaptersRequest {
    #[schemars(description = "Path to the source PDF file")]
    pub path: String,
    #[schemars(description = "Path to a chapter table file")]
    #[serde(default)]
    pub chapters_path: Option<String>,
    #[schemars(description = "Inline chapter table, one '<number> <title...> <start> <end>' per line")]
    #[serde(default)]
    pub chapters: Option<String>,
    #[schemars(description = "Directory for the chapter PDFs (created if missing)")]
    pub output_dir: String,
}

fn resolve_table(path: Option<&str>, inline: Option<&str>) -> Result<ChapterTable> {
    match (path, inline) {
        (Some(path), None) => load_chapter_table(path),
        (None, Some(text)) => Ok(parse_chapter_table(text)),
        _ => anyhow::bail!("Provide exactly one of chapters_path or chapters"),
    }
}

#[derive(Debug, Clone)]
pub struct ChapterServer {
    #[allow(dead_code)]
    tool_router: ToolRouter<Self>,
}

impl ChapterServer {
    pub fn new() -> Self {
        Self {
            tool_router: Self::tool_router(),
        }
    }
}

impl Default for ChapterServer {
    fn default() -> Self {
        Self::new()
    }
}

#[tool_router]
impl ChapterServer {
    #[tool(description = "Get PDF page count and metadata (title, author, creator, producer)")]
    fn pdf_info(&self, Parameters(PathRequest { path }): Parameters<PathRequest>) -> String {
        match PdfDocument::open(&path) {
            Ok(doc) => {
                let info = doc.get_info();
                let result = PdfInfoResult {
                    path,
                    page_count: info.page_count,
                    title: info.title,
                    author: info.author,
                    creator: info.creator,
                    producer: info.producer,
                };
                serde_json::to_string_pretty(&result).unwrap_or_else(|e| format!("Error: {}", e))
            }
            Err(e) => format!("Error: {}", e),
        }
    }

    #[tool(description = "Parse a chapter table and show each chapter's label, page range and output file name without writing anything")]
    fn chapter_table(&self, Parameters(req): Parameters<ChapterTableRequest>) -> String {
        let table = match resolve_table(req.chapters_path.as_deref(), req.chapters.as_deref()) {
            Ok(t) => t,
            Err(e) => return format!("Error: {}", e),
        };

        let result = ChapterTableResult {
            chapters: table
                .chapters
                .iter()
                .map(|spec| {
                    let range = spec.validate();
                    ChapterEntryResult {
                        label: spec.label(),
                        start_page: range.as_ref().ok().map(|r| r.start),
                        end_page: range.as_ref().ok().map(|r| r.end),
                        file_name: spec.file_name(OUTPUT_EXTENSION),
                        problem: range.err().map(|e| e.to_string()),
                    }
                })
                .collect(),
            skipped_lines: table.skipped.iter().map(|s| s.line).collect(),
        };
        serde_json::to_string_pretty(&result).unwrap_or_else(|e| format!("Error: {}", e))
    }

    #[tool(description = "Split a PDF into one file per chapter of a chapter table. Returns the ordered progress events and a per-chapter summary.")]
    async fn split_chapters(&self, Parameters(req): Parameters<SplitChaptersRequest>) -> String {
        let table = match resolve_table(req.chapters_path.as_deref(), req.chapters.as_deref()) {
            Ok(t) => t,
            Err(e) => return format!("Error: {}", e),
        };

        let job = ProcessingJob::new(&req.path, table.chapters, &req.output_dir);
        let (outcome, events) = match run_collected(job).await {
            Ok(collected) => collected,
            Err(e) => return format!("Error: chapter worker failed: {}", e),
        };

        let result = SplitResult {
            output_dir: req.output_dir,
            skipped_lines: table.skipped.iter().map(|s| s.line).collect(),
            events,
            outcome,
        };
        serde_json::to_string_pretty(&result).unwrap_or_else(|e| format!("Error: {}", e))
    }
}

// Result types for MCP tools

#[derive(Debug, Serialize, schemars::JsonSchema)]
pub struct PdfInfoResult {
    pub path: String,
    pub page_count: u32,
    pub title: Option<String>,
    pub author: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
}

#[derive(Debug, Serialize, schemars::JsonSchema)]
pub struct ChapterEntryResult {
    pub label: String,
    pub start_page: Option<u32>,
    pub end_page: Option<u32>,
    pub file_name: String,
    pub problem: Option<String>,
}

#[derive(Debug, Serialize, schemars::JsonSchema)]
pub struct ChapterTableResult {
    pub chapters: Vec<ChapterEntryResult>,
    pub skipped_lines: Vec<usize>,
}

#[derive(Debug, Serialize)]
pub struct SplitResult {
    pub output_dir: String,
    pub skipped_lines: Vec<usize>,
    pub events: Vec<PipelineEvent>,
    pub outcome: RunOutcome,
}

impl ServerHandler for ChapterServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "PDF chapter splitting tools. Use pdf_info to get the page count, \
                 chapter_table to check how a chapter table is read, and split_chapters \
                 to write one PDF per chapter."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

pub async fn run_server() -> Result<()> {
    let server = ChapterServer::new();

    // Serve using stdin/stdout as a tuple
    let service = server.serve((tokio::io::stdin(), tokio::io::stdout())).await?;

    service.waiting().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::write_numbered_pdf;

    #[test]
    fn test_resolve_table_requires_one_source() {
        assert!(resolve_table(None, None).is_err());
        assert!(resolve_table(Some("ch.txt"), Some("1 A 1 2")).is_err());
        let table = resolve_table(None, Some("1 A 1 2\nnote")).unwrap();
        assert_eq!(table.chapters.len(), 1);
        assert_eq!(table.skipped.len(), 1);
    }

    #[test]
    fn test_chapter_table_tool() {
        let server = ChapterServer::new();
        let out = server.chapter_table(Parameters(ChapterTableRequest {
            chapters_path: None,
            chapters: Some("1 Intro 1 3\n2 Bad x 4".to_string()),
        }));
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["chapters"][0]["file_name"], "Chapter_1_Intro.pdf");
        assert_eq!(json["chapters"][0]["end_page"], 3);
        assert!(json["chapters"][1]["problem"].is_string());
    }

    #[tokio::test]
    async fn test_split_chapters_tool() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("book.pdf");
        write_numbered_pdf(&source, 4);
        let out_dir = dir.path().join("out");

        let server = ChapterServer::new();
        let out = server.split_chapters(Parameters(SplitChaptersRequest {
            path: source.display().to_string(),
            chapters_path: None,
            chapters: Some("1 Intro 1 2\n2 Rest 3 4".to_string()),
            output_dir: out_dir.display().to_string(),
        }))
        .await;
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["outcome"]["outcome"], "done");
        assert_eq!(json["outcome"]["completed"], 2);
        assert_eq!(json["events"][0]["event"], "extracted");
        assert!(out_dir.join("Chapter_2_Rest.pdf").is_file());
    }
}
