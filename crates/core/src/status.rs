//! Lifecycle enums for import versions and import jobs.
//!
//! String representations match the database `status` / `job_type`
//! columns exactly, so every enum carries `as_str` plus a fallible
//! parser used when loading rows.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ── Import version lifecycle ─────────────────────────────────────────

/// Lifecycle state of an import version record.
///
/// - `Draft`     -- uploaded, configurable, not yet applied.
/// - `Published` -- applied to the authoritative dataset. At most one
///   version is published system-wide at any time.
/// - `Archived`  -- superseded by a later publish or a rollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionStatus {
    Draft,
    Published,
    Archived,
}

impl VersionStatus {
    /// String representation for display, logging, and database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }

    /// Parse from the database `status` column.
    pub fn parse(name: &str) -> Result<Self, CoreError> {
        match name {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            "archived" => Ok(Self::Archived),
            other => Err(CoreError::Validation(format!(
                "Unknown version status '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Upload file type ─────────────────────────────────────────────────

/// Source format of an uploaded file.
///
/// `PackagedVector` covers everything the external conversion tool can
/// open (zipped shapefiles, GeoPackage, FileGDB, ...); `GeoJson` is
/// already in the canonical encoding, though possibly not in the
/// canonical CRS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileType {
    PackagedVector,
    GeoJson,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PackagedVector => "packaged-vector",
            Self::GeoJson => "geojson",
        }
    }

    pub fn parse(name: &str) -> Result<Self, CoreError> {
        match name {
            "packaged-vector" => Ok(Self::PackagedVector),
            "geojson" => Ok(Self::GeoJson),
            other => Err(CoreError::Validation(format!(
                "Unknown file type '{other}'"
            ))),
        }
    }

    /// Derive the file type from an upload's file name.
    pub fn from_file_name(file_name: &str) -> Self {
        let ext = file_name
            .rsplit('.')
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "geojson" | "json" => Self::GeoJson,
            _ => Self::PackagedVector,
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Import job lifecycle ─────────────────────────────────────────────

/// Kind of long-running operation an import job tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Validation,
    Publish,
    Rollback,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Publish => "publish",
            Self::Rollback => "rollback",
        }
    }

    pub fn parse(name: &str) -> Result<Self, CoreError> {
        match name {
            "validation" => Ok(Self::Validation),
            "publish" => Ok(Self::Publish),
            "rollback" => Ok(Self::Rollback),
            other => Err(CoreError::Validation(format!("Unknown job type '{other}'"))),
        }
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of an import job: pending → running → {completed | failed}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(name: &str) -> Result<Self, CoreError> {
        match name {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(CoreError::Validation(format!(
                "Unknown job status '{other}'"
            ))),
        }
    }

    /// Whether the status is terminal (no further transitions allowed).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_status_roundtrip() {
        for status in [
            VersionStatus::Draft,
            VersionStatus::Published,
            VersionStatus::Archived,
        ] {
            assert_eq!(VersionStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(VersionStatus::parse("deleted").is_err());
    }

    #[test]
    fn file_type_from_file_name() {
        assert_eq!(FileType::from_file_name("roads.geojson"), FileType::GeoJson);
        assert_eq!(FileType::from_file_name("roads.JSON"), FileType::GeoJson);
        assert_eq!(
            FileType::from_file_name("export.zip"),
            FileType::PackagedVector
        );
        assert_eq!(
            FileType::from_file_name("roads.gpkg"),
            FileType::PackagedVector
        );
    }

    #[test]
    fn job_status_terminal_states() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn serde_uses_snake_case() {
        assert_eq!(
            serde_json::to_string(&VersionStatus::Published).unwrap(),
            "\"published\""
        );
        assert_eq!(
            serde_json::to_string(&FileType::PackagedVector).unwrap(),
            "\"packaged-vector\""
        );
        assert_eq!(
            serde_json::to_string(&JobType::Rollback).unwrap(),
            "\"rollback\""
        );
    }
}
