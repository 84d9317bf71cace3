//! Network topology module.
//!
//! This module contains the arena-backed topology tree, the loader that
//! builds it from a resolved description, and the numbering passes that
//! assign node numbers and bridge/TAP names.

pub mod loader;
pub mod numbering;
pub mod types;

// Re-export key types and functions for easier access
pub use loader::{load_topology, parse_topology, TopologyError};
pub use numbering::{assign_bridges_taps, number_nodes, number_topology, Numbering};
pub use types::{Arena, Iface, IfaceId, Link, Node, NodeId, Position, Topology, TopologyTree};
