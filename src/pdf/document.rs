use anyhow::{Context, Result};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use std::path::Path;

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guards against cyclic `Parent` chains in malformed files
const MAX_TREE_DEPTH: usize = 64;

pub struct PdfDocument {
    pub doc: Document,
    pub path: String,
}

impl PdfDocument {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().display().to_string();
        let doc =
            Document::load(&path).with_context(|| format!("Failed to open PDF: {}", path_str))?;
        Ok(PdfDocument {
            doc,
            path: path_str,
        })
    }

    pub fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    /// Get 1-indexed page object IDs
    pub fn page_ids(&self) -> Vec<(u32, ObjectId)> {
        let mut pages: Vec<_> = self.doc.get_pages().into_iter().collect();
        pages.sort_by_key(|(num, _)| *num);
        pages
    }

    /// Get metadata from the document info dictionary
    pub fn get_info(&self) -> PdfInfo {
        let mut info = PdfInfo::default();

        if let Ok(Object::Reference(info_ref)) = self.doc.trailer.get(b"Info") {
            if let Ok(Object::Dictionary(dict)) = self.doc.get_object(*info_ref) {
                info.title = get_string_from_dict(dict, b"Title");
                info.author = get_string_from_dict(dict, b"Author");
                info.creator = get_string_from_dict(dict, b"Creator");
                info.producer = get_string_from_dict(dict, b"Producer");
                info.subject = get_string_from_dict(dict, b"Subject");
            }
        }

        info.page_count = self.page_count();
        info
    }

    /// Extract specific pages to a new, self-contained document
    pub fn extract_pages(&self, pages: &[u32]) -> Result<Document> {
        let mut new_doc = self.doc.clone();
        let all_pages = self.page_ids();
        let total = all_pages.len() as u32;

        for &page in pages {
            if page == 0 || page > total {
                anyhow::bail!("Page {} is out of range (1-{})", page, total);
            }
        }

        let pages_to_delete: Vec<u32> = all_pages
            .iter()
            .filter(|(num, _)| !pages.contains(num))
            .map(|(num, _)| *num)
            .collect();

        if !pages_to_delete.is_empty() {
            new_doc.delete_pages(&pages_to_delete);
            // Drop fonts, images and content streams only the deleted pages used
            new_doc.prune_objects();
        }

        Ok(new_doc)
    }

    /// Save to a file
    pub fn save<P: AsRef<Path>>(doc: &mut Document, path: P) -> Result<()> {
        doc.save(&path)
            .with_context(|| format!("Failed to save PDF: {}", path.as_ref().display()))?;
        Ok(())
    }
}

/// Concatenate documents into one, keeping every page in argument order.
///
/// Each input is renumbered into its own object id range, its pages are
/// re-parented under a fresh page tree, and catalogs, page tree nodes and
/// outlines of the inputs are dropped.
pub fn concat_documents(documents: Vec<Document>) -> Result<Document> {
    if documents.is_empty() {
        anyhow::bail!("No pages to concatenate");
    }

    let mut next_id = 1;
    let mut pages: Vec<(ObjectId, Dictionary)> = Vec::new();
    let mut merged = Document::with_version("1.5");

    for mut doc in documents {
        doc.renumber_objects_with(next_id);
        next_id = doc.max_id + 1;

        let mut page_ids: Vec<_> = doc.get_pages().into_iter().collect();
        page_ids.sort_by_key(|(num, _)| *num);
        for (_, page_id) in page_ids {
            pages.push((page_id, flatten_page(&doc, page_id)?));
        }

        for (id, object) in doc.objects {
            match object.type_name().unwrap_or(b"") {
                b"Catalog" | b"Pages" | b"Page" | b"Outlines" | b"Outline" => {}
                _ => {
                    merged.objects.insert(id, object);
                }
            }
        }
    }

    merged.max_id = next_id;
    let pages_id = merged.new_object_id();

    let mut kids = Vec::with_capacity(pages.len());
    for (page_id, mut page) in pages {
        page.set("Parent", pages_id);
        merged.objects.insert(page_id, Object::Dictionary(page));
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    merged.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = merged.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    merged.trailer.set("Root", catalog_id);

    merged.prune_objects();
    merged.renumber_objects();

    Ok(merged)
}

/// Copy a page dictionary, resolving attributes inherited from its page tree
fn flatten_page(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let mut page = doc
        .get_dictionary(page_id)
        .with_context(|| format!("Page object {:?} is not a dictionary", page_id))?
        .clone();

    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;
    while let Some(node_id) = parent {
        depth += 1;
        if depth > MAX_TREE_DEPTH {
            break;
        }
        let node = match doc.get_dictionary(node_id) {
            Ok(node) => node,
            Err(_) => break,
        };
        for key in INHERITABLE_KEYS {
            if !page.has(key) {
                if let Ok(value) = node.get(key) {
                    page.set(key.to_vec(), value.clone());
                }
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    Ok(page)
}

#[derive(Debug, Default, Clone)]
pub struct PdfInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub subject: Option<String>,
    pub page_count: u32,
}

fn get_string_from_dict(dict: &lopdf::Dictionary, key: &[u8]) -> Option<String> {
    dict.get(key).ok().and_then(|obj| match obj {
        Object::String(bytes, _) => decode_pdf_string(bytes),
        _ => None,
    })
}

fn decode_pdf_string(bytes: &[u8]) -> Option<String> {
    // UTF-16 BE with BOM
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let u16_chars: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
            .collect();
        String::from_utf16(&u16_chars).ok()
    } else {
        // Latin-1 / PDFDocEncoding (simplified)
        Some(bytes.iter().map(|&b| b as char).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::{numbered_document, page_widths, write_numbered_pdf};

    #[test]
    fn test_open_and_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.pdf");
        write_numbered_pdf(&path, 7);

        let doc = PdfDocument::open(&path).unwrap();
        assert_eq!(doc.page_count(), 7);
        assert_eq!(doc.get_info().page_count, 7);
        let numbers: Vec<u32> = doc.page_ids().into_iter().map(|(n, _)| n).collect();
        assert_eq!(numbers, (1..=7).collect::<Vec<_>>());
    }

    #[test]
    fn test_open_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"this is not a pdf").unwrap();
        assert!(PdfDocument::open(&path).is_err());
        assert!(PdfDocument::open(dir.path().join("missing.pdf")).is_err());
    }

    #[test]
    fn test_extract_single_page() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("book.pdf");
        write_numbered_pdf(&source, 5);
        let doc = PdfDocument::open(&source).unwrap();

        let out = dir.path().join("page.pdf");
        let mut page = doc.extract_pages(&[4]).unwrap();
        PdfDocument::save(&mut page, &out).unwrap();

        assert_eq!(page_widths(&out), vec![104]);
        assert!(doc.extract_pages(&[6]).is_err());
        assert!(doc.extract_pages(&[0]).is_err());
    }

    #[test]
    fn test_concat_keeps_argument_order() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("book.pdf");
        write_numbered_pdf(&source, 6);
        let doc = PdfDocument::open(&source).unwrap();

        let parts = vec![
            doc.extract_pages(&[2]).unwrap(),
            doc.extract_pages(&[3]).unwrap(),
            doc.extract_pages(&[5]).unwrap(),
        ];
        let mut merged = concat_documents(parts).unwrap();
        let out = dir.path().join("merged.pdf");
        PdfDocument::save(&mut merged, &out).unwrap();

        assert_eq!(page_widths(&out), vec![102, 103, 105]);
    }

    #[test]
    fn test_concat_resolves_inherited_media_box() {
        let mut doc = numbered_document(1);
        let page_id = doc.page_iter().next().unwrap();
        let pages_id = doc
            .get_dictionary(page_id)
            .unwrap()
            .get(b"Parent")
            .unwrap()
            .as_reference()
            .unwrap();
        let media_box = doc
            .get_dictionary_mut(page_id)
            .unwrap()
            .remove(b"MediaBox")
            .unwrap();
        doc.get_dictionary_mut(pages_id)
            .unwrap()
            .set("MediaBox", media_box);

        let merged = concat_documents(vec![doc]).unwrap();
        let (_, id) = merged.get_pages().into_iter().next().unwrap();
        let page = merged.get_dictionary(id).unwrap();
        assert!(page.has(b"MediaBox"));
    }

    #[test]
    fn test_concat_nothing() {
        assert!(concat_documents(Vec::new()).is_err());
    }
}
