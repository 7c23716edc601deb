use crate::error::{StorageError, StorageResult};
use bytes::Bytes;
use futures::Stream;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

/// Local filesystem storage rooted at a single directory.
#[derive(Clone, Debug)]
pub struct LocalStorage {
    root: PathBuf,
}

/// An opened stored file ready to be streamed back to a client.
#[derive(Debug)]
pub struct StoredFile {
    pub file: fs::File,
    pub len: u64,
    pub content_type: String,
    pub file_name: String,
}

impl StoredFile {
    /// Stream the file contents in chunks.
    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send {
        ReaderStream::new(self.file)
    }
}

impl LocalStorage {
    /// Create the storage root if needed and bind to its canonical path.
    ///
    /// This is the only place the root directory is ever created.
    pub async fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();

        fs::create_dir_all(&root).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                root.display(),
                e
            ))
        })?;

        let root = fs::canonicalize(&root).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to canonicalize storage directory {}: {}",
                root.display(),
                e
            ))
        })?;

        Ok(LocalStorage { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative path against the root.
    ///
    /// Lexical `..` may not climb above the root, absolute paths are refused,
    /// and the nearest existing ancestor of the result must canonicalize to a
    /// location inside the root so symlinks cannot be used to escape it.
    pub async fn resolve(&self, relative: &str) -> StorageResult<PathBuf> {
        if relative.contains('\0') {
            return Err(StorageError::Forbidden("path contains a NUL byte".to_string()));
        }
        if relative.starts_with('/') || relative.starts_with('\\') || has_drive_prefix(relative) {
            return Err(StorageError::Forbidden(format!(
                "absolute path not allowed: {}",
                relative
            )));
        }

        let mut segments: Vec<&str> = Vec::new();
        for segment in relative.split(['/', '\\']) {
            match segment {
                "" | "." => continue,
                ".." => {
                    if segments.pop().is_none() {
                        return Err(StorageError::Forbidden(relative.to_string()));
                    }
                }
                s => segments.push(s),
            }
        }

        let mut path = self.root.clone();
        for segment in &segments {
            path.push(segment);
        }

        let mut ancestor = path.as_path();
        loop {
            if let Ok(canonical) = fs::canonicalize(ancestor).await {
                if !canonical.starts_with(&self.root) {
                    return Err(StorageError::Forbidden(relative.to_string()));
                }
                break;
            }
            match ancestor.parent() {
                Some(parent) if parent.starts_with(&self.root) => ancestor = parent,
                _ => break,
            }
        }

        Ok(path)
    }

    /// Durably write `data` at `relative`, creating parent directories.
    ///
    /// Either the whole file is written and synced, or the partial file is
    /// removed and `WriteFailed` is returned.
    pub async fn write(&self, relative: &str, data: &[u8]) -> StorageResult<PathBuf> {
        let path = self.resolve(relative).await?;
        let start = std::time::Instant::now();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::WriteFailed(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        if let Err(e) = write_synced(&path, data).await {
            if let Err(cleanup) = fs::remove_file(&path).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(
                        path = %path.display(),
                        error = %cleanup,
                        "Failed to remove partially written file"
                    );
                }
            }
            return Err(StorageError::WriteFailed(format!(
                "Failed to write file {}: {}",
                path.display(),
                e
            )));
        }

        tracing::info!(
            path = %path.display(),
            key = %relative,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage write successful"
        );

        Ok(path)
    }

    /// Open a stored file for streaming.
    pub async fn open(&self, relative: &str) -> StorageResult<StoredFile> {
        let path = self.resolve(relative).await?;

        let metadata = match fs::metadata(&path).await {
            Ok(m) if m.is_file() => m,
            _ => return Err(StorageError::NotFound(relative.to_string())),
        };

        let file = fs::File::open(&path).await.map_err(|e| {
            StorageError::ReadFailed(format!("Failed to open file {}: {}", path.display(), e))
        })?;

        let content_type = mime_guess::from_path(&path)
            .first_or_octet_stream()
            .to_string();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        tracing::debug!(
            path = %path.display(),
            key = %relative,
            size_bytes = metadata.len(),
            content_type = %content_type,
            "Local storage open"
        );

        Ok(StoredFile {
            file,
            len: metadata.len(),
            content_type,
            file_name,
        })
    }

    /// Read a stored file fully into memory.
    pub async fn read(&self, relative: &str) -> StorageResult<Vec<u8>> {
        let path = self.resolve(relative).await?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(relative.to_string()));
        }

        let data = fs::read(&path).await.map_err(|e| {
            StorageError::ReadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        tracing::debug!(
            path = %path.display(),
            key = %relative,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage read successful"
        );

        Ok(data)
    }

    pub async fn exists(&self, relative: &str) -> StorageResult<bool> {
        let path = self.resolve(relative).await?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    /// Delete a stored file. A file that is already gone is not an error.
    pub async fn delete(&self, relative: &str) -> StorageResult<()> {
        let path = self.resolve(relative).await?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(
                    path = %path.display(),
                    key = %relative,
                    "Local storage delete successful"
                );
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to delete file {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

async fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(data).await?;
    file.sync_all().await
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn storage() -> (tempfile::TempDir, LocalStorage) {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("images")).await.unwrap();
        (dir, storage)
    }

    #[tokio::test]
    async fn test_write_read_round_trip() {
        let (_dir, storage) = storage().await;
        let data = b"not really a png".to_vec();

        let path = storage.write("user_1/abc_cat.png", &data).await.unwrap();
        assert_eq!(path, storage.root().join("user_1").join("abc_cat.png"));

        let read = storage.read("user_1/abc_cat.png").await.unwrap();
        assert_eq!(read, data);
        assert!(storage.exists("user_1/abc_cat.png").await.unwrap());
    }

    #[tokio::test]
    async fn test_open_reports_content_type_and_length() {
        let (_dir, storage) = storage().await;
        storage.write("abc_cat.webp", b"12345").await.unwrap();

        let stored = storage.open("abc_cat.webp").await.unwrap();
        assert_eq!(stored.len, 5);
        assert_eq!(stored.content_type, "image/webp");
        assert_eq!(stored.file_name, "abc_cat.webp");
    }

    #[tokio::test]
    async fn test_resolve_normalizes_under_root() {
        let (_dir, storage) = storage().await;
        storage.write("a/cat.png", b"cat").await.unwrap();

        let resolved = storage.resolve("a/./b/../cat.png").await.unwrap();
        assert_eq!(resolved, storage.root().join("a").join("cat.png"));

        let missing = storage.resolve("new/dir/dog.png").await.unwrap();
        assert_eq!(missing, storage.root().join("new/dir/dog.png"));

        assert!(matches!(
            storage.resolve("a/../../x.png").await,
            Err(StorageError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let (dir, storage) = storage().await;
        std::fs::write(dir.path().join("secret.txt"), b"secret").unwrap();

        let result = storage.open("../secret.txt").await;
        assert!(matches!(result, Err(StorageError::Forbidden(_))));

        let result = storage.open("a/../../secret.txt").await;
        assert!(matches!(result, Err(StorageError::Forbidden(_))));

        let result = storage.open("../does-not-exist.txt").await;
        assert!(matches!(result, Err(StorageError::Forbidden(_))));

        let result = storage.read("/etc/passwd").await;
        assert!(matches!(result, Err(StorageError::Forbidden(_))));

        let result = storage.delete("..\\secret.txt").await;
        assert!(matches!(result, Err(StorageError::Forbidden(_))));

        let result = storage.write("../escape.png", b"x").await;
        assert!(matches!(result, Err(StorageError::Forbidden(_))));
        assert!(!dir.path().join("escape.png").exists());
    }

    #[tokio::test]
    async fn test_inner_parent_segments_allowed() {
        let (_dir, storage) = storage().await;
        storage.write("a/cat.png", b"cat").await.unwrap();
        let read = storage.read("a/b/../cat.png").await.unwrap();
        assert_eq!(read, b"cat");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_escape_rejected() {
        let (dir, storage) = storage().await;
        let outside = dir.path().join("outside");
        std::fs::create_dir_all(&outside).unwrap();
        std::fs::write(outside.join("secret.txt"), b"secret").unwrap();
        std::os::unix::fs::symlink(&outside, storage.root().join("link")).unwrap();

        let result = storage.open("link/secret.txt").await;
        assert!(matches!(result, Err(StorageError::Forbidden(_))));

        let result = storage.write("link/new.png", b"x").await;
        assert!(matches!(result, Err(StorageError::Forbidden(_))));
        assert!(!outside.join("new.png").exists());
    }

    #[tokio::test]
    async fn test_missing_file_not_found() {
        let (_dir, storage) = storage().await;

        let result = storage.open("nope.png").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));

        let result = storage.open("").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));

        assert!(!storage.exists("nope.png").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_nonexistent_is_ok() {
        let (_dir, storage) = storage().await;
        assert!(storage.delete("nonexistent/file.png").await.is_ok());

        storage.write("gone.png", b"x").await.unwrap();
        storage.delete("gone.png").await.unwrap();
        assert!(!storage.exists("gone.png").await.unwrap());
    }
}
