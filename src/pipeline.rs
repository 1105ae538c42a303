//! Orchestration of one chapter-extraction run.
//!
//! A run moves through `Idle → Extracting → AssemblingChapter* → CleaningUp →
//! Done`, or stops at `Aborted` when the source cannot be split. Chapters are
//! assembled strictly one after another in table order, so the event stream
//! is totally ordered and `Started`/`Completed` pairs can be matched by label.

use crate::assembler::assemble_chapter;
use crate::chapters::ChapterSpec;
use crate::extractor::extract_pages;
use crate::scratch::ScratchArea;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

/// Everything one run needs; read-only once the run starts.
#[derive(Debug, Clone)]
pub struct ProcessingJob {
    pub source: PathBuf,
    pub chapters: Vec<ChapterSpec>,
    pub output_dir: PathBuf,
    /// Parent directory for the scratch area; the system temp dir if unset
    pub scratch_parent: Option<PathBuf>,
}

impl ProcessingJob {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(
        source: P,
        chapters: Vec<ChapterSpec>,
        output_dir: Q,
    ) -> Self {
        ProcessingJob {
            source: source.into(),
            chapters,
            output_dir: output_dir.into(),
            scratch_parent: None,
        }
    }

    pub fn with_scratch_parent<P: Into<PathBuf>>(mut self, parent: P) -> Self {
        self.scratch_parent = Some(parent.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Started,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub label: String,
    pub phase: Phase,
    /// 1-based position of the chapter in the table
    pub position: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChapterStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl std::fmt::Display for ChapterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ChapterStatus::Pending => "Pending",
            ChapterStatus::Processing => "Processing...",
            ChapterStatus::Completed => "Completed",
            ChapterStatus::Failed => "Failed",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChapterReport {
    pub label: String,
    pub status: ChapterStatus,
    pub output: Option<PathBuf>,
    pub pages: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub chapters: Vec<ChapterReport>,
    pub completed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// The source was split into this many page units
    Extracted { pages: usize },
    Progress(ProgressEvent),
    /// A non-fatal failure: one chapter, or cleanup
    Error { message: String },
    Done(RunSummary),
    Aborted { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Done(RunSummary),
    Aborted { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Extracting,
    AssemblingChapter(usize),
    CleaningUp,
    Done,
    Aborted,
}

pub struct Pipeline {
    job: ProcessingJob,
    state: PipelineState,
    reports: Vec<ChapterReport>,
    outcome: Option<RunOutcome>,
}

impl Pipeline {
    pub fn new(job: ProcessingJob) -> Self {
        let reports = job
            .chapters
            .iter()
            .map(|spec| ChapterReport {
                label: spec.label(),
                status: ChapterStatus::Pending,
                output: None,
                pages: Vec::new(),
            })
            .collect();
        Pipeline {
            job,
            state: PipelineState::Idle,
            reports,
            outcome: None,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    fn transition(&mut self, next: PipelineState) {
        debug!("pipeline state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Execute the run on the current thread, reporting through `emit`.
    ///
    /// A pipeline runs once; later calls emit nothing and return the first outcome.
    pub fn run<F: FnMut(PipelineEvent)>(&mut self, emit: F) -> RunOutcome {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }
        let outcome = self.execute(emit);
        self.outcome = Some(outcome.clone());
        outcome
    }

    fn execute<F: FnMut(PipelineEvent)>(&mut self, mut emit: F) -> RunOutcome {
        self.transition(PipelineState::Extracting);
        let extracted = ScratchArea::create(self.job.scratch_parent.as_deref()).and_then(
            |scratch| extract_pages(&self.job.source, &scratch).map(|pages| (scratch, pages)),
        );
        let (scratch, pages) = match extracted {
            Ok(extracted) => extracted,
            Err(e) => {
                // Any partially filled scratch area was dropped with the error
                error!("{}", e);
                self.transition(PipelineState::Aborted);
                let reason = e.to_string();
                emit(PipelineEvent::Aborted {
                    reason: reason.clone(),
                });
                return RunOutcome::Aborted { reason };
            }
        };
        debug!("page units ready in {}", scratch.path().display());
        emit(PipelineEvent::Extracted { pages: pages.len() });

        let total = self.job.chapters.len();
        let mut written: HashSet<PathBuf> = HashSet::new();
        for idx in 0..total {
            self.transition(PipelineState::AssemblingChapter(idx));
            let spec = &self.job.chapters[idx];
            let label = spec.label();

            self.reports[idx].status = ChapterStatus::Processing;
            emit(PipelineEvent::Progress(ProgressEvent {
                label: label.clone(),
                phase: Phase::Started,
                position: idx + 1,
                total,
            }));

            match assemble_chapter(spec, &pages, &self.job.output_dir) {
                Ok(output) => {
                    if !written.insert(output.path.clone()) {
                        warn!(
                            "{} overwrote an earlier chapter at {}",
                            label,
                            output.path.display()
                        );
                    }
                    let report = &mut self.reports[idx];
                    report.status = ChapterStatus::Completed;
                    report.output = Some(output.path);
                    report.pages = output.pages;
                    emit(PipelineEvent::Progress(ProgressEvent {
                        label,
                        phase: Phase::Completed,
                        position: idx + 1,
                        total,
                    }));
                }
                Err(e) => {
                    warn!("{}", e);
                    self.reports[idx].status = ChapterStatus::Failed;
                    emit(PipelineEvent::Error {
                        message: e.to_string(),
                    });
                }
            }
        }

        self.transition(PipelineState::CleaningUp);
        drop(pages);
        if let Err(e) = scratch.close() {
            warn!("{}", e);
            emit(PipelineEvent::Error {
                message: e.to_string(),
            });
        }

        self.transition(PipelineState::Done);
        let summary = self.summary();
        info!(
            "finished: {} completed, {} failed, output in {}",
            summary.completed,
            summary.failed,
            self.job.output_dir.display()
        );
        emit(PipelineEvent::Done(summary.clone()));
        RunOutcome::Done(summary)
    }

    fn summary(&self) -> RunSummary {
        let count = |status: ChapterStatus| {
            self.reports.iter().filter(|r| r.status == status).count()
        };
        RunSummary {
            chapters: self.reports.clone(),
            completed: count(ChapterStatus::Completed),
            failed: count(ChapterStatus::Failed),
        }
    }
}

/// Start `job` on a blocking worker so the caller is never held up by PDF I/O.
///
/// Events arrive on the returned channel in the order they were emitted; the
/// channel closes after the terminal `Done` or `Aborted` event.
pub fn spawn(job: ProcessingJob) -> (JoinHandle<RunOutcome>, UnboundedReceiver<PipelineEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::task::spawn_blocking(move || {
        let mut pipeline = Pipeline::new(job);
        pipeline.run(move |event| {
            // A dropped receiver only means nobody is watching
            let _ = tx.send(event);
        })
    });
    (handle, rx)
}

/// Run `job` on a blocking worker and wait for it, collecting every event
pub async fn run_collected(
    job: ProcessingJob,
) -> Result<(RunOutcome, Vec<PipelineEvent>), JoinError> {
    let (handle, mut rx) = spawn(job);
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    let outcome = handle.await?;
    Ok((outcome, events))
}

/// One-line description of a job for logs and terminal output
pub fn describe(job: &ProcessingJob) -> String {
    format!(
        "{} chapter(s) from {} into {}",
        job.chapters.len(),
        job.source.display(),
        display_dir(&job.output_dir)
    )
}

fn display_dir(path: &Path) -> String {
    if path.as_os_str().is_empty() {
        ".".to_string()
    } else {
        path.display().to_string()
    }
}
