use relative_path::RelativePathBuf;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::editing::DocumentBlock;
use crate::io::{self, IoError};
use crate::models::{DocumentId, DocumentSummary, SaveMode, SaveRequest, StoredDocument};
use crate::store::{DocumentStore, StoreError};

/// Documents stored as JSON files in a directory.
///
/// Layout:
/// - `<root>/<id>.json` holds the current state of each document
/// - `<root>/history/<id>/<revision>.json` holds one snapshot per commit
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, IoError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        io::validate_documents_dir(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Summaries of every readable document, sorted by name.
    ///
    /// Files that fail to parse are skipped with a warning.
    pub fn list_documents(&self) -> Result<Vec<DocumentSummary>, StoreError> {
        let mut summaries = Vec::new();
        for path in io::scan_json_files(&self.root)? {
            let parsed = std::fs::read_to_string(&path)
                .map_err(StoreError::from_io)
                .and_then(|text| Ok(serde_json::from_str::<StoredDocument>(&text)?));
            match parsed {
                Ok(document) => summaries.push(document.summary()),
                Err(e) => log::warn!("skipping unreadable document {}: {e}", path.display()),
            }
        }
        summaries.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(summaries)
    }

    /// Create and persist a new document holding a single empty paragraph.
    pub fn create_document(&self, name: &str) -> Result<StoredDocument, StoreError> {
        let mut document = StoredDocument::new(uuid::Uuid::new_v4().to_string(), name);
        document.content = vec![DocumentBlock::paragraph(
            uuid::Uuid::new_v4().to_string(),
            "",
        )];
        document.last_modified = now_millis();
        self.write(&document_path(&document.id)?, &document)?;
        log::info!("created document {} ({name})", document.id);
        Ok(document)
    }

    pub fn read_document(&self, id: &DocumentId) -> Result<StoredDocument, StoreError> {
        let path = document_path(id)?;
        let text = io::read_file(&path, &self.root).map_err(|e| match e {
            IoError::NotFound(_) => StoreError::NotFound(id.clone()),
            other => StoreError::Io(other),
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Apply a save to the stored copy and return the result.
    ///
    /// Commits bump the revision and write a history snapshot.
    pub fn write_document(
        &self,
        id: &DocumentId,
        request: SaveRequest,
        mode: SaveMode,
    ) -> Result<StoredDocument, StoreError> {
        let mut document = self.read_document(id)?;
        document.category = request.category;
        document.content = request.content;
        document.last_modified = now_millis();
        if mode.is_commit() {
            document.revision += 1;
            let snapshot = RelativePathBuf::from(format!(
                "history/{}/{}.json",
                document.id, document.revision
            ));
            self.write(&snapshot, &document)?;
        }
        self.write(&document_path(id)?, &document)?;
        log::debug!("saved {id} ({mode:?}, revision {})", document.revision);
        Ok(document)
    }

    fn write(&self, path: &RelativePathBuf, document: &StoredDocument) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(document)?;
        io::write_file(path, &self.root, &json)?;
        Ok(())
    }
}

impl StoreError {
    fn from_io(error: std::io::Error) -> Self {
        StoreError::Io(IoError::Io(error))
    }
}

fn document_path(id: &DocumentId) -> Result<RelativePathBuf, StoreError> {
    let valid = !id.as_str().is_empty()
        && id
            .as_str()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(StoreError::Rejected(format!("invalid document id {id:?}")));
    }
    Ok(RelativePathBuf::from(format!("{id}.json")))
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

async fn blocking<T, F>(task: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| StoreError::from_io(std::io::Error::other(e)))?
}

impl DocumentStore for FsDocumentStore {
    fn load_document(
        &self,
        id: &DocumentId,
    ) -> impl Future<Output = Result<StoredDocument, StoreError>> + Send {
        let store = self.clone();
        let id = id.clone();
        blocking(move || store.read_document(&id))
    }

    fn save_document(
        &self,
        id: &DocumentId,
        request: SaveRequest,
        mode: SaveMode,
    ) -> impl Future<Output = Result<Option<StoredDocument>, StoreError>> + Send {
        let store = self.clone();
        let id = id.clone();
        blocking(move || store.write_document(&id, request, mode).map(Some))
    }
}
