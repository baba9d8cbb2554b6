//! Core domain logic for the road network import version service.
//!
//! This crate has no I/O: no database, no filesystem, no subprocesses.
//! It holds the shared types, the error taxonomy, the GeoJSON geometry
//! model with tolerant equality, the import scope selector, the road
//! feature schema, the validation rules, and the diff classification
//! used by the service layer.

pub mod compare;
pub mod error;
pub mod geometry;
pub mod roads;
pub mod scope;
pub mod status;
pub mod types;
pub mod validation;
