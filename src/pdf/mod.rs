pub mod document;

pub use document::{concat_documents, PdfDocument};
