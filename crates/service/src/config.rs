//! Service configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use roadgrid_convert::DEFAULT_TIMEOUT_SECS;

/// Configuration for the import version service.
///
/// All fields have defaults suitable for local development; override
/// via environment variables in production.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Root directory for per-version storage and snapshots
    /// (default: `data/imports`).
    pub storage_root: PathBuf,
    /// `ogr2ogr` binary name or path (default: `ogr2ogr`).
    pub ogr2ogr_bin: String,
    /// `ogrinfo` binary name or path (default: `ogrinfo`).
    pub ogrinfo_bin: String,
    /// Wall-clock limit for one converter invocation in seconds
    /// (default: `300`).
    pub convert_timeout_secs: u64,
}

impl ServiceConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default        |
    /// |------------------------|----------------|
    /// | `IMPORT_STORAGE_ROOT`  | `data/imports` |
    /// | `OGR2OGR_BIN`          | `ogr2ogr`      |
    /// | `OGRINFO_BIN`          | `ogrinfo`      |
    /// | `CONVERT_TIMEOUT_SECS` | `300`          |
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let storage_root =
            PathBuf::from(std::env::var("IMPORT_STORAGE_ROOT").unwrap_or_else(|_| "data/imports".into()));

        let ogr2ogr_bin = std::env::var("OGR2OGR_BIN").unwrap_or_else(|_| "ogr2ogr".into());
        let ogrinfo_bin = std::env::var("OGRINFO_BIN").unwrap_or_else(|_| "ogrinfo".into());

        let convert_timeout_secs = match std::env::var("CONVERT_TIMEOUT_SECS") {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "CONVERT_TIMEOUT_SECS is not a valid u64, using default");
                DEFAULT_TIMEOUT_SECS
            }),
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        Self {
            storage_root,
            ogr2ogr_bin,
            ogrinfo_bin,
            convert_timeout_secs,
        }
    }

    /// Converter invocation timeout as a [`Duration`].
    pub fn convert_timeout(&self) -> Duration {
        Duration::from_secs(self.convert_timeout_secs)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("data/imports"),
            ogr2ogr_bin: "ogr2ogr".into(),
            ogrinfo_bin: "ogrinfo".into(),
            convert_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}
