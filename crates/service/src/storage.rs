//! Per-version file storage layout.
//!
//! Each import version owns an exclusive subdirectory under the storage
//! root holding the original upload, the canonical GeoJSON, and the
//! cached validation result. Snapshots live in a sibling directory, one
//! immutable file per publish event. Exclusive directories mean file
//! operations never need cross-version locking.

use std::path::{Path, PathBuf};

use roadgrid_core::types::DbId;
use uuid::Uuid;

/// File name of the canonical GeoJSON inside a version directory.
const CANONICAL_FILE: &str = "canonical.geojson";

/// File name of the cached validation result inside a version directory.
const VALIDATION_FILE: &str = "validation.json";

/// Resolves and manages the on-disk layout for import versions.
#[derive(Debug, Clone)]
pub struct ImportStorage {
    root: PathBuf,
}

impl ImportStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The exclusive directory for one version.
    pub fn version_dir(&self, version_id: DbId) -> PathBuf {
        self.root.join("versions").join(version_id.to_string())
    }

    /// The directory holding one immutable snapshot file per publish.
    pub fn snapshot_dir(&self) -> PathBuf {
        self.root.join("snapshots")
    }

    /// Path of the canonical GeoJSON for a version.
    pub fn canonical_path(&self, version_id: DbId) -> PathBuf {
        self.version_dir(version_id).join(CANONICAL_FILE)
    }

    /// Path of the cached validation result for a version.
    pub fn validation_path(&self, version_id: DbId) -> PathBuf {
        self.version_dir(version_id).join(VALIDATION_FILE)
    }

    /// Path of the original upload for a version, derived from the
    /// version's recorded file name. Stable across configuration, which
    /// repoints the version's `file_path` at the canonical GeoJSON.
    pub fn original_path(&self, version_id: DbId, file_name: &str) -> PathBuf {
        self.version_dir(version_id).join(flattened_name(file_name))
    }

    /// Write the original upload into the version's directory, creating
    /// it. Returns the stored path. The file name is flattened to its
    /// base name so an upload can never escape the version directory.
    pub async fn write_original(
        &self,
        version_id: DbId,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, std::io::Error> {
        let dir = self.version_dir(version_id);
        tokio::fs::create_dir_all(&dir).await?;
        let dest = dir.join(flattened_name(file_name));
        tokio::fs::write(&dest, bytes).await?;
        Ok(dest)
    }

    /// Remove a version's directory and everything in it. Missing
    /// directories are fine: nothing was ever written for the version.
    pub async fn remove_version_dir(&self, version_id: DbId) -> Result<(), std::io::Error> {
        match tokio::fs::remove_dir_all(self.version_dir(version_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Allocate a fresh snapshot path, creating the snapshot directory.
    pub async fn allocate_snapshot_path(&self) -> Result<PathBuf, std::io::Error> {
        let dir = self.snapshot_dir();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir.join(format!("{}.geojson", Uuid::new_v4())))
    }
}

/// Flatten an upload file name to its base name so it can never escape
/// the version directory.
fn flattened_name(file_name: &str) -> String {
    Path::new(file_name)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "upload.bin".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn version_directories_are_exclusive_per_version() {
        let storage = ImportStorage::new("/data/imports");
        assert_ne!(storage.version_dir(1), storage.version_dir(2));
        assert_eq!(
            storage.canonical_path(7),
            PathBuf::from("/data/imports/versions/7/canonical.geojson")
        );
    }

    #[tokio::test]
    async fn write_original_flattens_path_traversal() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = ImportStorage::new(tmp.path());

        let dest = storage
            .write_original(3, "../../etc/passwd", b"not really")
            .await
            .unwrap();
        assert!(dest.starts_with(storage.version_dir(3)));
        assert_eq!(dest.file_name().unwrap(), "passwd");
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"not really");
    }

    #[tokio::test]
    async fn original_path_matches_write_original_destination() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = ImportStorage::new(tmp.path());

        let dest = storage
            .write_original(9, "exports/roads.gpkg", b"gpkg bytes")
            .await
            .unwrap();
        assert_eq!(dest, storage.original_path(9, "exports/roads.gpkg"));
        assert_ne!(dest, storage.canonical_path(9));
    }

    #[tokio::test]
    async fn remove_version_dir_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = ImportStorage::new(tmp.path());

        storage.write_original(5, "roads.geojson", b"{}").await.unwrap();
        storage.remove_version_dir(5).await.unwrap();
        assert!(!storage.version_dir(5).exists());
        // Second removal of a missing directory is not an error.
        storage.remove_version_dir(5).await.unwrap();
    }

    #[tokio::test]
    async fn snapshot_paths_are_unique() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = ImportStorage::new(tmp.path());

        let a = storage.allocate_snapshot_path().await.unwrap();
        let b = storage.allocate_snapshot_path().await.unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with(storage.snapshot_dir()));
        assert_eq!(a.extension().unwrap(), "geojson");
    }
}
