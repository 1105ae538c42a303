use crate::chapters::load_chapter_table;
use crate::pipeline::{self, Phase, PipelineEvent, ProcessingJob, RunOutcome, RunSummary};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub async fn run<P: AsRef<Path>, Q: AsRef<Path>, R: AsRef<Path>>(
    input: P,
    chapters: Q,
    output_dir: R,
    scratch_dir: Option<PathBuf>,
) -> Result<()> {
    let table = load_chapter_table(&chapters)?;
    if !table.skipped.is_empty() {
        println!("Skipped {} short line(s) in chapter table", table.skipped.len());
    }
    if table.chapters.is_empty() {
        anyhow::bail!(
            "No chapters found in {}",
            chapters.as_ref().display()
        );
    }

    let mut job = ProcessingJob::new(input.as_ref(), table.chapters, output_dir.as_ref());
    if let Some(dir) = scratch_dir {
        job = job.with_scratch_parent(dir);
    }
    println!("Splitting {}", pipeline::describe(&job));

    let (handle, mut events) = pipeline::spawn(job);
    let mut done = 0;
    while let Some(event) = events.recv().await {
        match event {
            PipelineEvent::Extracted { pages } => println!("Extracted {} page(s)", pages),
            PipelineEvent::Progress(progress) => {
                if progress.phase == Phase::Completed {
                    done += 1;
                }
                let status = match progress.phase {
                    Phase::Started => "Processing...",
                    Phase::Completed => "Completed",
                };
                println!(
                    "[{}/{}] {}: {}",
                    done, progress.total, progress.label, status
                );
            }
            PipelineEvent::Error { message } => eprintln!("Error: {}", message),
            PipelineEvent::Done(_) | PipelineEvent::Aborted { .. } => {}
        }
    }

    let outcome = handle.await.context("Chapter worker panicked")?;
    match outcome {
        RunOutcome::Done(summary) => {
            print_summary(&summary, output_dir.as_ref());
            Ok(())
        }
        RunOutcome::Aborted { reason } => anyhow::bail!("Processing aborted: {}", reason),
    }
}

/// One line per chapter with the status column aligned
fn status_lines(summary: &RunSummary) -> Vec<String> {
    // Padding in format strings counts chars, so measure labels the same way
    let width = summary
        .chapters
        .iter()
        .map(|c| c.label.chars().count())
        .max()
        .unwrap_or(0);
    summary
        .chapters
        .iter()
        .map(|chapter| format!("{:<width$}  {}", chapter.label, chapter.status, width = width))
        .collect()
}

fn print_summary(summary: &RunSummary, output_dir: &Path) {
    println!();
    for line in status_lines(summary) {
        println!("{}", line);
    }
    println!(
        "\n{} of {} chapter(s) written to {} ({} failed)",
        summary.completed,
        summary.chapters.len(),
        output_dir.display(),
        summary.failed
    );
}
