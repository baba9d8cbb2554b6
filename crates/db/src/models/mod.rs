//! Database entity models and DTOs.

pub mod import_job;
pub mod import_version;
pub mod road_asset;
