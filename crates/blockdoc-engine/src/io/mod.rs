pub mod fs_store;
pub mod fs_uploads;

use relative_path::RelativePath;
use std::fs;
use std::path::{Path, PathBuf};

pub use fs_store::FsDocumentStore;
pub use fs_uploads::{FsUploadTransport, human_size, resolve_asset_url};

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid documents directory: {0}")]
    InvalidDocumentsDir(String),
}

/// Read a file below the documents root and return its content
pub fn read_file(relative_path: &RelativePath, root: &Path) -> Result<String, IoError> {
    let absolute_path = relative_path.to_path(root);
    if !absolute_path.exists() {
        return Err(IoError::NotFound(absolute_path));
    }
    fs::read_to_string(&absolute_path).map_err(IoError::Io)
}

/// Write text to a file below the documents root
pub fn write_file(relative_path: &RelativePath, root: &Path, content: &str) -> Result<(), IoError> {
    write_bytes(relative_path, root, content.as_bytes())
}

pub fn write_bytes(relative_path: &RelativePath, root: &Path, bytes: &[u8]) -> Result<(), IoError> {
    let absolute_path = relative_path.to_path(root);

    // Create parent directories if they don't exist
    if let Some(parent) = absolute_path.parent() {
        fs::create_dir_all(parent).map_err(IoError::Io)?;
    }

    fs::write(&absolute_path, bytes).map_err(IoError::Io)
}

/// List the `.json` files directly inside the documents root, sorted by path.
///
/// Subdirectories (history, uploads) are not descended into.
pub fn scan_json_files(root: &Path) -> Result<Vec<PathBuf>, IoError> {
    validate_documents_dir(root)?;

    let mut files = Vec::new();
    for entry in fs::read_dir(root).map_err(IoError::Io)? {
        let path = entry.map_err(IoError::Io)?.path();
        if path.is_file()
            && let Some(ext) = path.extension()
            && ext == "json"
        {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub fn validate_documents_dir(path: &Path) -> Result<(), IoError> {
    if !path.exists() || !path.is_dir() {
        return Err(IoError::InvalidDocumentsDir(
            "Directory does not exist".to_string(),
        ));
    }

    Ok(())
}
