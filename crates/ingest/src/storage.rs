use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

const MAX_NAME_ATTEMPTS: usize = 1000;

/// Stores uploaded files under a single directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `bytes` to a new file and return its path.
    ///
    /// The stored name is `<content hash prefix>_<file name>`. When that name is
    /// taken, as with a repeated upload of the same file, a counter is added to
    /// the prefix (`<hash>-1_<file name>`), so every upload gets its own file.
    pub async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.root)
            .await
            .context(format!("Failed to create upload directory: {:?}", self.root))?;

        let hash = content_hash(bytes);
        let name = sanitize_file_name(file_name);

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let path = self.root.join(match attempt {
                0 => format!("{hash}_{name}"),
                n => format!("{hash}-{n}_{name}"),
            });

            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e).context(format!("Failed to create upload: {:?}", path)),
            };
            file.write_all(bytes)
                .await
                .context(format!("Failed to write upload: {:?}", path))?;
            file.flush()
                .await
                .context(format!("Failed to write upload: {:?}", path))?;

            debug!(path = %path.display(), size = bytes.len(), "Stored upload");
            return Ok(path);
        }

        anyhow::bail!("No free file name for upload {name:?} in {:?}", self.root)
    }

    /// Remove a stored file. A file that is already gone is not an error.
    pub async fn remove(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context(format!("Failed to remove upload: {:?}", path)),
        }
    }
}

/// Keep only the final path component of a client supplied name.
pub fn sanitize_file_name(file_name: &str) -> String {
    let name = file_name
        .rsplit(['/', '\\'])
        .find(|part| !part.trim().is_empty() && *part != "." && *part != "..")
        .unwrap_or("")
        .trim();

    if name.is_empty() {
        "upload.txt".to_string()
    } else {
        name.to_string()
    }
}

fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let result = hasher.finalize();
    hex::encode(&result[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("notes.txt"), "notes.txt");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\docs\\report.md"), "report.md");
        assert_eq!(sanitize_file_name("dir/.."), "dir");
        assert_eq!(sanitize_file_name(""), "upload.txt");
    }

    #[tokio::test]
    async fn test_save_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("uploads"));

        let first = store.save("doc.txt", b"one").await.unwrap();
        let second = store.save("doc.txt", b"two").await.unwrap();

        assert_ne!(first, second);
        assert!(first.starts_with(store.root()));
        assert_eq!(std::fs::read(&first).unwrap(), b"one");
        assert!(first.file_name().unwrap().to_string_lossy().ends_with("_doc.txt"));

        store.remove(&first).await.unwrap();
        assert!(!first.exists());
        // Removing twice is fine
        store.remove(&first).await.unwrap();
    }

    #[tokio::test]
    async fn test_identical_uploads_get_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let first = store.save("guide.txt", b"same bytes").await.unwrap();
        let second = store.save("guide.txt", b"same bytes").await.unwrap();
        let third = store.save("guide.txt", b"same bytes").await.unwrap();

        assert_ne!(first, second);
        assert_ne!(second, third);
        assert!(second.file_name().unwrap().to_string_lossy().contains("-1_guide.txt"));

        store.remove(&first).await.unwrap();
        assert_eq!(std::fs::read(&second).unwrap(), b"same bytes");
        assert_eq!(std::fs::read(&third).unwrap(), b"same bytes");
    }
}
