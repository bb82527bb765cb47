pub mod autosave;
pub mod drag;
pub mod editing;
pub mod io;
pub mod models;
pub mod notify;
pub mod session;
pub mod store;
pub mod upload;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use editing::{block::*, commands::*, document::*, patch::*, table::*};
pub use io::{FsDocumentStore, FsUploadTransport, IoError};
pub use models::{DocumentId, DocumentIndex, DocumentSummary, SaveMode, SaveRequest, StoredDocument};
pub use notify::{LogNotifier, Notification, NotificationQueue, Notifier};
pub use session::{
    DocumentMeta, DropOutcome, EditorSession, Paste, PasteOutcome, PendingUploads, SessionConfig,
    UploadOutcome,
};
pub use store::{DocumentStore, MemoryDocumentStore, StoreError};
pub use upload::{LocalFile, UploadError, UploadTransport, UploadedAsset};
