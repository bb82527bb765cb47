use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::models::{DocumentId, DocumentSummary, SaveMode, SaveRequest, StoredDocument};
use crate::store::{DocumentStore, StoreError};

/// One save request as received by [`MemoryDocumentStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRecord {
    pub id: DocumentId,
    pub mode: SaveMode,
    pub request: SaveRequest,
}

#[derive(Debug, Default)]
struct Inner {
    documents: HashMap<DocumentId, StoredDocument>,
    history: HashMap<DocumentId, Vec<StoredDocument>>,
    saves: Vec<SaveRecord>,
    fail_saves: bool,
    clock: u64,
}

/// Store kept entirely in memory, recording every save it receives.
///
/// Timestamps come from a logical clock that ticks once per successful save.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    inner: Mutex<Inner>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, document: StoredDocument) -> Self {
        self.insert(document);
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert(&self, document: StoredDocument) {
        self.lock().documents.insert(document.id.clone(), document);
    }

    pub fn document(&self, id: &DocumentId) -> Option<StoredDocument> {
        self.lock().documents.get(id).cloned()
    }

    pub fn list(&self) -> Vec<DocumentSummary> {
        self.lock()
            .documents
            .values()
            .map(StoredDocument::summary)
            .collect()
    }

    /// Every save request received, in arrival order, including failed ones.
    pub fn saves(&self) -> Vec<SaveRecord> {
        self.lock().saves.clone()
    }

    pub fn commits(&self) -> Vec<SaveRecord> {
        self.saves()
            .into_iter()
            .filter(|record| record.mode.is_commit())
            .collect()
    }

    /// Snapshots taken on each committing save.
    pub fn history(&self, id: &DocumentId) -> Vec<StoredDocument> {
        self.lock().history.get(id).cloned().unwrap_or_default()
    }

    /// Make subsequent saves fail until switched back.
    pub fn set_fail_saves(&self, fail: bool) {
        self.lock().fail_saves = fail;
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn load_document(
        &self,
        id: &DocumentId,
    ) -> impl Future<Output = Result<StoredDocument, StoreError>> + Send {
        let result = self
            .document(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()));
        async move { result }
    }

    fn save_document(
        &self,
        id: &DocumentId,
        request: SaveRequest,
        mode: SaveMode,
    ) -> impl Future<Output = Result<Option<StoredDocument>, StoreError>> + Send {
        let result = self.apply_save(id, request, mode);
        async move { result }
    }
}

impl MemoryDocumentStore {
    fn apply_save(
        &self,
        id: &DocumentId,
        request: SaveRequest,
        mode: SaveMode,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let mut inner = self.lock();
        inner.saves.push(SaveRecord {
            id: id.clone(),
            mode,
            request: request.clone(),
        });
        if inner.fail_saves {
            return Err(StoreError::Rejected("store unavailable".to_string()));
        }

        inner.clock += 1;
        let clock = inner.clock;
        let Some(document) = inner.documents.get_mut(id) else {
            return Err(StoreError::NotFound(id.clone()));
        };
        document.content = request.content;
        document.category = request.category;
        document.last_modified = clock;
        if mode.is_commit() {
            document.revision += 1;
        }
        let saved = document.clone();
        if mode.is_commit() {
            inner.history.entry(id.clone()).or_default().push(saved.clone());
        }
        Ok(Some(saved))
    }
}
