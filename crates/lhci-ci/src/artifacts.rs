//! Durable copies of the results directory.

use crate::error::{CiError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

/// Stores a directory under a user-chosen artifact name.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn upload(&self, name: &str, dir: &Path) -> Result<()>;
}

/// Artifact store backed by a local directory: `<root>/<name>/...`.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn artifact_err(path: &Path, e: std::io::Error) -> CiError {
    CiError::Artifact(format!("{}: {}", path.display(), e))
}

/// Recursively copy `src` into `dest`. Returns the number of files copied.
async fn copy_tree(src: &Path, dest: &Path) -> Result<usize> {
    let mut pending = vec![(src.to_path_buf(), dest.to_path_buf())];
    let mut copied = 0;

    while let Some((from_dir, to_dir)) = pending.pop() {
        tokio::fs::create_dir_all(&to_dir)
            .await
            .map_err(|e| artifact_err(&to_dir, e))?;

        let mut entries = tokio::fs::read_dir(&from_dir)
            .await
            .map_err(|e| artifact_err(&from_dir, e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| artifact_err(&from_dir, e))?
        {
            let from = entry.path();
            let to = to_dir.join(entry.file_name());
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| artifact_err(&from, e))?;

            if file_type.is_dir() {
                pending.push((from, to));
            } else {
                tokio::fs::copy(&from, &to)
                    .await
                    .map_err(|e| artifact_err(&from, e))?;
                copied += 1;
            }
        }
    }

    Ok(copied)
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn upload(&self, name: &str, dir: &Path) -> Result<()> {
        if name.is_empty() || name.contains(['/', '\\']) || name == ".." {
            return Err(CiError::Artifact(format!("invalid artifact name {name:?}")));
        }

        let dest = self.root.join(name);
        let files = copy_tree(dir, &dest).await?;
        info!(artifact = name, files, dest = %dest.display(), "Artifact stored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_copies_nested_results() {
        let results = tempfile::tempdir().unwrap();
        std::fs::write(results.path().join("manifest.json"), "[]").unwrap();
        std::fs::create_dir(results.path().join("reports")).unwrap();
        std::fs::write(results.path().join("reports").join("lhr-1.json"), "{}").unwrap();

        let root = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(root.path());
        store
            .upload("lighthouse-results", results.path())
            .await
            .expect("upload");

        let stored = root.path().join("lighthouse-results");
        assert_eq!(
            std::fs::read_to_string(stored.join("manifest.json")).unwrap(),
            "[]"
        );
        assert!(stored.join("reports").join("lhr-1.json").is_file());
    }

    #[tokio::test]
    async fn test_upload_rejects_path_like_names() {
        let results = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(root.path());

        for name in ["", "..", "a/b"] {
            let err = store.upload(name, results.path()).await.unwrap_err();
            assert!(matches!(err, CiError::Artifact(_)));
        }
    }

    #[tokio::test]
    async fn test_upload_missing_source_fails() {
        let root = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(root.path());
        let err = store
            .upload("results", &root.path().join("does-not-exist"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("does-not-exist"));
    }
}
