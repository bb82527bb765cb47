use humansize::{FormatSizeOptions, WINDOWS, format_size};
use relative_path::RelativePathBuf;
use std::future::Future;
use std::path::PathBuf;

use crate::editing::UploadKind;
use crate::io::{self, IoError};
use crate::upload::{LocalFile, UploadError, UploadTransport, UploadedAsset};

/// Upload transport that copies files under `<root>/uploads/`.
#[derive(Debug, Clone)]
pub struct FsUploadTransport {
    root: PathBuf,
    max_bytes: u64,
    public_base_url: Option<String>,
}

impl FsUploadTransport {
    pub fn new(root: impl Into<PathBuf>, max_upload_mb: u64) -> Self {
        Self {
            root: root.into(),
            max_bytes: max_upload_mb.saturating_mul(1024 * 1024),
            public_base_url: None,
        }
    }

    pub fn with_public_base_url(mut self, base: Option<String>) -> Self {
        self.public_base_url = base.filter(|b| !b.trim().is_empty());
        self
    }

    /// Store `file` and describe where it went.
    pub fn store(&self, kind: UploadKind, file: &LocalFile) -> Result<UploadedAsset, UploadError> {
        if file.size() > self.max_bytes {
            return Err(UploadError::PayloadTooLarge {
                limit_bytes: Some(self.max_bytes),
            });
        }

        let folder = match kind {
            UploadKind::Image => "images",
            UploadKind::File => "files",
        };
        let stored_name = format!("{}-{}", uuid::Uuid::new_v4(), sanitize(&file.name));
        let path = RelativePathBuf::from(format!("uploads/{folder}/{stored_name}"));
        io::write_bytes(&path, &self.root, &file.bytes)?;
        log::info!("stored upload {} ({} bytes)", path, file.size());

        Ok(UploadedAsset {
            url: resolve_asset_url(self.public_base_url.as_deref(), path.as_str()),
            file_name: file.name.clone(),
            file_size: human_size(file.size()),
        })
    }

    fn upload(
        &self,
        kind: UploadKind,
        file: LocalFile,
    ) -> impl Future<Output = Result<UploadedAsset, UploadError>> + Send {
        let transport = self.clone();
        async move {
            tokio::task::spawn_blocking(move || transport.store(kind, &file))
                .await
                .map_err(|e| UploadError::Io(IoError::Io(std::io::Error::other(e))))?
        }
    }
}

impl UploadTransport for FsUploadTransport {
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

/// Join a stored relative path onto an optional public base URL.
pub fn resolve_asset_url(base: Option<&str>, path: &str) -> String {
    let path = path.trim_start_matches('/');
    match base {
        Some(base) if !base.trim().is_empty() => {
            format!("{}/{}", base.trim().trim_end_matches('/'), path)
        }
        _ => format!("/{path}"),
    }
}

/// Byte count rendered as B, KB or MB with one decimal, 1024-based.
pub fn human_size(bytes: u64) -> String {
    let options = FormatSizeOptions::from(WINDOWS).decimal_places(1);
    // stored labels are upper-case ("KB", "MB")
    format_size(bytes, options).to_uppercase()
}

fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::create_test_documents_dir;
    use rstest::rstest;

    #[rstest]
    #[case(0, "0 B")]
    #[case(1023, "1023 B")]
    #[case(1536, "1.5 KB")]
    #[case(5 * 1024 * 1024, "5 MB")]
    #[case(1024 * 1024 + 300 * 1024, "1.3 MB")]
    fn test_human_size(#[case] bytes: u64, #[case] expected: &str) {
        assert_eq!(human_size(bytes), expected);
    }

    #[rstest]
    #[case(None, "uploads/a.png", "/uploads/a.png")]
    #[case(Some("https://cdn.example/"), "uploads/a.png", "https://cdn.example/uploads/a.png")]
    #[case(Some("  "), "/uploads/a.png", "/uploads/a.png")]
    fn test_resolve_asset_url(#[case] base: Option<&str>, #[case] path: &str, #[case] expected: &str) {
        assert_eq!(resolve_asset_url(base, path), expected);
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("my photo (1).png"), "my_photo__1_.png");
        assert_eq!(sanitize("../../etc"), "_.._etc");
        assert_eq!(sanitize(""), "upload");
    }

    #[test]
    fn test_store_writes_bytes() {
        // Given a transport over an empty directory
        let dir = create_test_documents_dir();
        let transport = FsUploadTransport::new(dir.path(), 1);
        let file = LocalFile::new("a.txt", "text/plain", b"hello".to_vec());

        // When storing a file
        let asset = transport.store(UploadKind::File, &file).unwrap();

        // Then the bytes land under uploads/files
        assert!(asset.url.starts_with("/uploads/files/"));
        assert!(asset.url.ends_with("-a.txt"));
        assert_eq!(asset.file_name, "a.txt");
        assert_eq!(asset.file_size, "5 B");
        let on_disk = dir.path().join(asset.url.trim_start_matches('/'));
        assert_eq!(std::fs::read(on_disk).unwrap(), b"hello");
    }

    #[test]
    fn test_oversized_payload_is_refused() {
        let dir = create_test_documents_dir();
        let transport = FsUploadTransport::new(dir.path(), 1);
        let file = LocalFile::new("big.bin", "application/octet-stream", vec![0u8; 1024 * 1024 + 1]);
        let result = transport.store(UploadKind::File, &file);
        assert!(matches!(
            result,
            Err(UploadError::PayloadTooLarge { limit_bytes: Some(1048576) })
        ));
        assert!(!dir.path().join("uploads").exists());
    }

    #[tokio::test]
    async fn test_upload_image_uses_images_folder() {
        let dir = create_test_documents_dir();
        let transport = FsUploadTransport::new(dir.path(), 1)
            .with_public_base_url(Some("https://cdn.example".into()));
        let file = LocalFile::new("p.png", "image/png", vec![1u8, 2]);
        let asset = transport.upload_image(file).await.unwrap();
        assert!(asset.url.starts_with("https://cdn.example/uploads/images/"));
    }
}
