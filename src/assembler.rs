use crate::chapters::ChapterSpec;
use crate::error::SplitError;
use crate::extractor::PageSet;
use crate::pdf::{concat_documents, PdfDocument};
use anyhow::Context;
use lopdf::Document;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Extension of every chapter file
pub const OUTPUT_EXTENSION: &str = "pdf";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterOutput {
    pub path: PathBuf,
    /// Source page numbers in the order they were appended
    pub pages: Vec<u32>,
}

/// Where the output for `spec` will be written
pub fn output_path(spec: &ChapterSpec, output_dir: &Path) -> PathBuf {
    output_dir.join(spec.file_name(OUTPUT_EXTENSION))
}

/// Build one chapter file from the page units in `[start_page, end_page]`.
///
/// Pages the source does not have are skipped. A range that yields no page at
/// all fails with [`SplitError::ChapterRange`] and writes nothing.
pub fn assemble_chapter(
    spec: &ChapterSpec,
    pages: &PageSet,
    output_dir: &Path,
) -> Result<ChapterOutput, SplitError> {
    let range = spec.validate()?;
    debug!(
        "assembling chapter {} from pages {}-{}",
        range.number, range.start, range.end
    );

    let units = pages.in_range(range.start, range.end);
    let requested = u64::from(range.end - range.start) + 1;
    if (units.len() as u64) < requested {
        debug!(
            "{}: {} requested page(s) not in source, skipping",
            spec.label(),
            requested - units.len() as u64
        );
    }

    if units.is_empty() {
        return Err(SplitError::ChapterRange {
            chapter: spec.label(),
            reason: format!(
                "pages {}-{} are outside the document (1-{})",
                range.start,
                range.end,
                pages.len()
            ),
        });
    }

    let path = output_path(spec, output_dir);
    let write_error = |e: anyhow::Error| SplitError::ChapterWrite {
        chapter: spec.label(),
        path: path.clone(),
        message: format!("{:#}", e),
    };

    let documents = units
        .iter()
        .map(|unit| {
            Document::load(&unit.path)
                .with_context(|| format!("Failed to load page unit: {}", unit.path.display()))
        })
        .collect::<anyhow::Result<Vec<_>>>()
        .map_err(write_error)?;

    let mut chapter = concat_documents(documents).map_err(write_error)?;

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create directory: {}", output_dir.display()))
        .map_err(write_error)?;
    PdfDocument::save(&mut chapter, &path).map_err(write_error)?;

    let page_numbers: Vec<u32> = units.iter().map(|unit| unit.number).collect();
    info!(
        "wrote {} ({} page(s)) to {}",
        spec.label(),
        page_numbers.len(),
        path.display()
    );

    Ok(ChapterOutput {
        path,
        pages: page_numbers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chapters::parse_chapter_table;
    use crate::extractor::extract_pages;
    use crate::pdf::fixtures::{page_widths, write_numbered_pdf};
    use crate::scratch::ScratchArea;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        scratch: ScratchArea,
        pages: PageSet,
    }

    fn fixture(page_count: u32) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("book.pdf");
        write_numbered_pdf(&source, page_count);
        let scratch = ScratchArea::create(Some(dir.path())).unwrap();
        let pages = extract_pages(&source, &scratch).unwrap();
        Fixture {
            dir,
            scratch,
            pages,
        }
    }

    fn spec(line: &str) -> ChapterSpec {
        parse_chapter_table(line).chapters.remove(0)
    }

    #[test]
    fn test_in_range_chapter() {
        let f = fixture(10);
        let out_dir = f.dir.path().join("out");

        let output = assemble_chapter(&spec("2 Body Text 4 9"), &f.pages, &out_dir).unwrap();
        assert_eq!(output.path, out_dir.join("Chapter_2_Body_Text.pdf"));
        assert_eq!(output.pages, vec![4, 5, 6, 7, 8, 9]);
        assert_eq!(
            page_widths(&output.path),
            vec![104, 105, 106, 107, 108, 109]
        );
    }

    #[test]
    fn test_single_page_chapter() {
        let f = fixture(10);
        let out_dir = f.dir.path().join("out");
        let output = assemble_chapter(&spec("3 Outro 10 10"), &f.pages, &out_dir).unwrap();
        assert_eq!(page_widths(&output.path), vec![110]);
    }

    #[test]
    fn test_range_past_end_keeps_existing_pages() {
        let f = fixture(5);
        let out_dir = f.dir.path().join("out");
        let output = assemble_chapter(&spec("9 Tail 4 12"), &f.pages, &out_dir).unwrap();
        assert_eq!(output.pages, vec![4, 5]);
        assert_eq!(page_widths(&output.path), vec![104, 105]);
    }

    #[test]
    fn test_huge_end_page_only_visits_existing_pages() {
        let f = fixture(3);
        let out_dir = f.dir.path().join("out");
        let output = assemble_chapter(&spec("1 Big 2 4294967295"), &f.pages, &out_dir).unwrap();
        assert_eq!(output.pages, vec![2, 3]);
        assert_eq!(page_widths(&output.path), vec![102, 103]);

        let s = spec("2 Beyond 4 4294967295");
        let err = assemble_chapter(&s, &f.pages, &out_dir).unwrap_err();
        assert!(matches!(err, SplitError::ChapterRange { .. }));
        assert!(!output_path(&s, &out_dir).exists());
    }

    #[test]
    fn test_range_entirely_outside_fails_without_file() {
        let f = fixture(5);
        let out_dir = f.dir.path().join("out");
        let s = spec("9 Ghost 6 8");
        let err = assemble_chapter(&s, &f.pages, &out_dir).unwrap_err();
        assert!(matches!(err, SplitError::ChapterRange { .. }));
        assert!(!output_path(&s, &out_dir).exists());
    }

    #[test]
    fn test_invalid_spec_fails_without_file() {
        let f = fixture(5);
        let out_dir = f.dir.path().join("out");
        for line in ["1 Intro one 3", "2 Back 4 2"] {
            let s = spec(line);
            let err = assemble_chapter(&s, &f.pages, &out_dir).unwrap_err();
            assert!(matches!(err, SplitError::ChapterRange { .. }), "{}", line);
            assert!(!output_path(&s, &out_dir).exists());
        }
    }

    #[test]
    fn test_creates_nested_output_directory() {
        let f = fixture(3);
        let out_dir = f.dir.path().join("a").join("b");
        assemble_chapter(&spec("1 Intro 1 2"), &f.pages, &out_dir).unwrap();
        assert!(out_dir.join("Chapter_1_Intro.pdf").is_file());
    }

    #[test]
    fn test_unwritable_destination_is_write_error() {
        let f = fixture(3);
        // A regular file where the output directory should be
        let out_dir = f.dir.path().join("taken");
        std::fs::write(&out_dir, b"").unwrap();
        let err = assemble_chapter(&spec("1 Intro 1 2"), &f.pages, &out_dir).unwrap_err();
        assert!(matches!(err, SplitError::ChapterWrite { .. }));
    }

    #[test]
    fn test_scratch_is_read_only_during_assembly() {
        let f = fixture(4);
        let out_dir = f.dir.path().join("out");
        assemble_chapter(&spec("1 Intro 1 4"), &f.pages, &out_dir).unwrap();
        assert_eq!(std::fs::read_dir(f.scratch.path()).unwrap().count(), 4);
    }
}
