#![allow(dead_code)]

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use blockdoc_engine::editing::{IdStrategy, UploadKind};
use blockdoc_engine::io::human_size;
use blockdoc_engine::{
    DocumentBlock, DocumentId, DocumentStore, EditorSession, LocalFile, LogNotifier,
    MemoryDocumentStore, NotificationQueue, SaveMode, SaveRequest, SessionConfig, StoreError,
    StoredDocument, UploadError, UploadTransport, UploadedAsset,
};
use tokio::sync::Semaphore;

pub const DOC: &str = "doc";

/// Upload transport that succeeds unless the file name was marked failing.
/// Optionally holds every upload until a permit is released.
#[derive(Default)]
pub struct FakeUploads {
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<(UploadKind, String)>>,
    gate: Option<Arc<Semaphore>>,
}

impl FakeUploads {
    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn fail(&self, name: &str) {
        self.failing.lock().unwrap().insert(name.to_string());
    }

    pub fn calls(&self) -> Vec<(UploadKind, String)> {
        self.calls.lock().unwrap().clone()
    }

    async fn upload(&self, kind: UploadKind, file: LocalFile) -> Result<UploadedAsset, UploadError> {
        self.calls.lock().unwrap().push((kind, file.name.clone()));
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if self.failing.lock().unwrap().contains(&file.name) {
            return Err(UploadError::PayloadTooLarge { limit_bytes: None });
        }
        Ok(UploadedAsset {
            url: format!("/uploads/{}", file.name),
            file_name: file.name.clone(),
            file_size: human_size(file.size()),
        })
    }
}

impl UploadTransport for FakeUploads {
    fn upload_image(
        &self,
        file: LocalFile,
    ) -> impl Future<Output = Result<UploadedAsset, UploadError>> + Send {
        self.upload(UploadKind::Image, file)
    }

    fn upload_file(
        &self,
        file: LocalFile,
    ) -> impl Future<Output = Result<UploadedAsset, UploadError>> + Send {
        self.upload(UploadKind::File, file)
    }
}

/// Store that answers saves with a normalized copy (trailing whitespace
/// trimmed from every block) and can hold saves of one mode until released.
pub struct NormalizingStore {
    pub inner: MemoryDocumentStore,
    gate: Option<Arc<Semaphore>>,
    held: SaveMode,
}

impl NormalizingStore {
    /// Optionally hold drafts on `gate`.
    pub fn new(inner: MemoryDocumentStore, gate: Option<Arc<Semaphore>>) -> Self {
        Self {
            inner,
            gate,
            held: SaveMode::Draft,
        }
    }

    pub fn holding_commits(inner: MemoryDocumentStore, gate: Arc<Semaphore>) -> Self {
        Self {
            inner,
            gate: Some(gate),
            held: SaveMode::Commit,
        }
    }
}

impl DocumentStore for NormalizingStore {
    fn load_document(
        &self,
        id: &DocumentId,
    ) -> impl Future<Output = Result<StoredDocument, StoreError>> + Send {
        self.inner.load_document(id)
    }

    fn save_document(
        &self,
        id: &DocumentId,
        request: SaveRequest,
        mode: SaveMode,
    ) -> impl Future<Output = Result<Option<StoredDocument>, StoreError>> + Send {
        async move {
            if mode == self.held
                && let Some(gate) = &self.gate
            {
                gate.acquire().await.unwrap().forget();
            }
            let mut saved = self.inner.save_document(id, request, mode).await?;
            if let Some(document) = &mut saved {
                for block in &mut document.content {
                    block.content = block.content.trim_end().to_string();
                }
            }
            Ok(saved)
        }
    }
}

pub fn document(blocks: Vec<DocumentBlock>) -> StoredDocument {
    let mut document = StoredDocument::new(DOC, "Test document");
    document.content = blocks;
    document
}

pub fn config() -> SessionConfig {
    SessionConfig {
        ids: IdStrategy::sequential("b"),
        ..SessionConfig::default()
    }
}

pub type TestSession = EditorSession<Arc<MemoryDocumentStore>, Arc<FakeUploads>>;
pub type NormalizingSession = EditorSession<Arc<NormalizingStore>, Arc<FakeUploads>>;

pub async fn open_normalizing(store: NormalizingStore) -> (NormalizingSession, Arc<NormalizingStore>) {
    let store = Arc::new(store);
    let session = EditorSession::open(
        Arc::clone(&store),
        Arc::new(FakeUploads::default()),
        Arc::new(LogNotifier),
        DocumentId::new(DOC),
        config(),
    )
    .await
    .unwrap();
    (session, store)
}

pub struct Harness {
    pub session: TestSession,
    pub store: Arc<MemoryDocumentStore>,
    pub uploads: Arc<FakeUploads>,
    pub notifications: Arc<NotificationQueue>,
}

pub async fn open(blocks: Vec<DocumentBlock>) -> Harness {
    open_with(blocks, FakeUploads::default()).await
}

pub async fn open_with(blocks: Vec<DocumentBlock>, uploads: FakeUploads) -> Harness {
    let store = Arc::new(MemoryDocumentStore::new().with_document(document(blocks)));
    let uploads = Arc::new(uploads);
    let notifications = Arc::new(NotificationQueue::new());
    let session = EditorSession::open(
        Arc::clone(&store),
        Arc::clone(&uploads),
        notifications.clone(),
        DocumentId::new(DOC),
        config(),
    )
    .await
    .unwrap();
    Harness {
        session,
        store,
        uploads,
        notifications,
    }
}

/// Let spawned saves and uploads run without reaching the idle window.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

pub fn png(name: &str) -> LocalFile {
    LocalFile::new(name, "image/png", vec![1u8, 2, 3])
}

pub fn pdf(name: &str) -> LocalFile {
    LocalFile::new(name, "application/pdf", vec![1u8; 2048])
}
