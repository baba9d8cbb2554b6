//! The import version service: versioning, validation, diffing,
//! publish, and rollback for bulk road-network imports.
//!
//! Consumed by an HTTP layer or CLI (out of scope here); every
//! operation works on plain data shapes and returns [`ServiceError`]
//! for infrastructure and state failures. No cross-version
//! serialization is provided: concurrent publishes over overlapping
//! scopes are the caller's responsibility to prevent.

pub mod config;
pub mod diff;
pub mod error;
pub mod ingest;
pub mod jobs;
pub mod publish;
pub mod rollback;
pub mod snapshot;
pub mod storage;
pub mod telemetry;
pub mod validate;
pub mod versions;

use roadgrid_convert::VectorConverter;
use roadgrid_db::DbPool;

pub use config::ServiceConfig;
pub use error::{ServiceError, ServiceResult};
pub use storage::ImportStorage;

/// Facade over the whole import pipeline. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ImportService {
    pool: DbPool,
    storage: ImportStorage,
    converter: VectorConverter,
}

impl ImportService {
    pub fn new(pool: DbPool, config: &ServiceConfig) -> Self {
        Self {
            pool,
            storage: ImportStorage::new(config.storage_root.clone()),
            converter: VectorConverter::new(
                config.ogr2ogr_bin.clone(),
                config.ogrinfo_bin.clone(),
                config.convert_timeout(),
            ),
        }
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// The file storage layout in use.
    pub fn storage(&self) -> &ImportStorage {
        &self.storage
    }
}
