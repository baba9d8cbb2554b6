//! Database repositories.

pub mod import_job_repo;
pub mod import_version_repo;
pub mod road_asset_repo;

pub use import_job_repo::ImportJobRepo;
pub use import_version_repo::ImportVersionRepo;
pub use road_asset_repo::RoadAssetRepo;
