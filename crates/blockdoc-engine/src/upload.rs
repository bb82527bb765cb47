/*!
# Uploads

Types shared between the editor session and the upload transport.

A [`LocalFile`] is handed to an [`UploadTransport`], which answers with an
[`UploadedAsset`] or an [`UploadError`]. While a transfer is running its
block id sits in the [`UploadTracker`]; the id leaves the tracker once the
transfer has resolved, whichever way it resolved.
*/

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use crate::editing::{BlockId, BlockType, UploadKind};
use crate::io::IoError;

/// A file picked, dropped or pasted by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Arc<[u8]>,
}

impl LocalFile {
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn kind(&self) -> UploadKind {
        UploadKind::from_mime(&self.mime_type)
    }
}

/// Where an upload landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    pub url: String,
    pub file_name: String,
    pub file_size: String,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("payload too large")]
    PayloadTooLarge { limit_bytes: Option<u64> },
    #[error("upload rejected with status {status}")]
    Rejected { status: u16, detail: Option<String> },
    #[error("IO error: {0}")]
    Io(#[from] IoError),
}

impl UploadError {
    /// Message shown to the user; `max_upload_mb` fills in the size limit
    /// when the transport did not report one.
    pub fn user_message(&self, max_upload_mb: u64) -> String {
        match self {
            UploadError::PayloadTooLarge { limit_bytes } => {
                let mb = limit_bytes
                    .map(|bytes| bytes.div_ceil(1024 * 1024))
                    .unwrap_or(max_upload_mb);
                format!("File is too large. Maximum allowed size is {mb} MB.")
            }
            UploadError::Rejected {
                detail: Some(detail),
                ..
            } if !detail.trim().is_empty() => detail.clone(),
            _ => "Failed to upload file".to_string(),
        }
    }
}

pub trait UploadTransport: Send + Sync + 'static {
    fn upload_image(
        &self,
        file: LocalFile,
    ) -> impl Future<Output = Result<UploadedAsset, UploadError>> + Send;

    fn upload_file(
        &self,
        file: LocalFile,
    ) -> impl Future<Output = Result<UploadedAsset, UploadError>> + Send;
}

impl<T: UploadTransport> UploadTransport for Arc<T> {
    fn upload_image(
        &self,
        file: LocalFile,
    ) -> impl Future<Output = Result<UploadedAsset, UploadError>> + Send {
        (**self).upload_image(file)
    }

    fn upload_file(
        &self,
        file: LocalFile,
    ) -> impl Future<Output = Result<UploadedAsset, UploadError>> + Send {
        (**self).upload_file(file)
    }
}

/// Block ids with an upload in flight.
#[derive(Debug, Default)]
pub struct UploadTracker {
    uploading: HashSet<BlockId>,
}

impl UploadTracker {
    /// Returns false when the block already had an upload running.
    pub fn begin(&mut self, block: &BlockId) -> bool {
        self.uploading.insert(block.clone())
    }

    pub fn finish(&mut self, block: &BlockId) {
        self.uploading.remove(block);
    }

    pub fn is_uploading(&self, block: &str) -> bool {
        self.uploading.contains(block)
    }

    pub fn ids(&self) -> impl Iterator<Item = &BlockId> {
        self.uploading.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.uploading.is_empty()
    }
}

/// Pick the upload kind: an explicit image/file preference first, then the
/// type of the existing block, then the file's MIME type.
pub fn resolve_kind(
    preferred: Option<BlockType>,
    existing: Option<BlockType>,
    file: &LocalFile,
) -> UploadKind {
    preferred
        .and_then(BlockType::upload_kind)
        .or_else(|| existing.and_then(BlockType::upload_kind))
        .unwrap_or_else(|| file.kind())
}
