//! Persistence collaborator contract.
//!
//! The editor never owns persistence. It checks a document out through
//! [`DocumentStore::load_document`] and pushes snapshots back through
//! [`DocumentStore::save_document`], distinguishing draft writes from
//! committing writes only by [`SaveMode`].

pub mod memory;

use std::future::Future;
use std::sync::Arc;

use crate::io::IoError;
use crate::models::{DocumentId, SaveMode, SaveRequest, StoredDocument};

pub use memory::{MemoryDocumentStore, SaveRecord};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(DocumentId),
    #[error("IO error: {0}")]
    Io(#[from] IoError),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Save rejected: {0}")]
    Rejected(String),
}

pub trait DocumentStore: Send + Sync + 'static {
    fn load_document(
        &self,
        id: &DocumentId,
    ) -> impl Future<Output = Result<StoredDocument, StoreError>> + Send;

    /// Persist `request`. Stores may answer with their canonical copy of the
    /// document, which the caller reconciles against its local state.
    fn save_document(
        &self,
        id: &DocumentId,
        request: SaveRequest,
        mode: SaveMode,
    ) -> impl Future<Output = Result<Option<StoredDocument>, StoreError>> + Send;
}

impl<T: DocumentStore> DocumentStore for Arc<T> {
    fn load_document(
        &self,
        id: &DocumentId,
    ) -> impl Future<Output = Result<StoredDocument, StoreError>> + Send {
        (**self).load_document(id)
    }

    fn save_document(
        &self,
        id: &DocumentId,
        request: SaveRequest,
        mode: SaveMode,
    ) -> impl Future<Output = Result<Option<StoredDocument>, StoreError>> + Send {
        (**self).save_document(id, request, mode)
    }
}
