use crate::models::UploadedFile;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Writes uploaded parts into the upload directory under generated names.
/// The client-supplied filename never reaches the filesystem.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

/// A stored upload. The file is removed when this is dropped.
#[derive(Debug)]
pub struct StoredUpload {
    file: NamedTempFile,
}

impl StoredUpload {
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stores `upload` with the given extension (e.g. `".pdf"`).
    pub fn persist(&self, upload: &UploadedFile, extension: &str) -> io::Result<StoredUpload> {
        fs::create_dir_all(&self.dir)?;

        let mut file = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(extension)
            .tempfile_in(&self.dir)?;
        file.write_all(&upload.bytes)?;
        file.flush()?;

        log::debug!(
            "Stored '{}' ({} bytes) as {}",
            upload.filename,
            upload.bytes.len(),
            file.path().display()
        );
        Ok(StoredUpload { file })
    }
}
