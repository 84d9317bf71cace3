//! Shared utilities: topology validation and artifact collection.

pub mod artifacts;
pub mod validation;

pub use artifacts::collect_artifacts;
pub use validation::{validate_positions, validate_topology_types};
