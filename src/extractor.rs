use crate::error::SplitError;
use crate::pdf::PdfDocument;
use crate::scratch::ScratchArea;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A single extracted page, addressed by its 1-based position in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageUnit {
    pub number: u32,
    pub path: PathBuf,
}

/// Every page unit materialized for one run
#[derive(Debug, Clone, Default)]
pub struct PageSet {
    units: BTreeMap<u32, PathBuf>,
}

impl PageSet {
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn get(&self, page: u32) -> Option<PageUnit> {
        self.units.get(&page).map(|path| PageUnit {
            number: page,
            path: path.clone(),
        })
    }

    /// Units whose page number lies in `[start, end]`, ascending.
    ///
    /// Only existing units are visited, so the cost does not depend on how far
    /// `end` reaches past the last page.
    pub fn in_range(&self, start: u32, end: u32) -> Vec<PageUnit> {
        if start > end {
            return Vec::new();
        }
        self.units
            .range(start..=end)
            .map(|(&number, path)| PageUnit {
                number,
                path: path.clone(),
            })
            .collect()
    }
}

/// Split `source` into one single-page PDF per page inside `scratch`.
///
/// Pages are written in source order and never skipped. Failure to open the
/// source is [`SplitError::SourceRead`]; failure to write a unit is
/// [`SplitError::Scratch`].
pub fn extract_pages<P: AsRef<Path>>(
    source: P,
    scratch: &ScratchArea,
) -> Result<PageSet, SplitError> {
    let source = source.as_ref();
    let doc = PdfDocument::open(source).map_err(|e| SplitError::SourceRead {
        path: source.to_path_buf(),
        message: format!("{:#}", e),
    })?;

    let total_pages = doc.page_count();
    if total_pages == 0 {
        return Err(SplitError::SourceRead {
            path: source.to_path_buf(),
            message: "document has no pages".to_string(),
        });
    }
    info!("extracting {} pages from {}", total_pages, doc.path);

    let mut set = PageSet::default();
    for page_num in 1..=total_pages {
        let output_path = scratch.page_path(page_num);

        let mut page = doc
            .extract_pages(&[page_num])
            .map_err(|e| SplitError::Scratch(format!("page {}: {:#}", page_num, e)))?;
        PdfDocument::save(&mut page, &output_path)
            .map_err(|e| SplitError::Scratch(format!("page {}: {:#}", page_num, e)))?;

        debug!("wrote page unit {}", output_path.display());
        set.units.insert(page_num, output_path);
    }

    Ok(set)
}
