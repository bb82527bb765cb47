pub mod document_index;
pub mod stored_document;

pub use document_index::DocumentIndex;
pub use stored_document::{
    DocumentId, DocumentSummary, SaveMode, SaveRequest, StoredDocument, migrate_block,
};
