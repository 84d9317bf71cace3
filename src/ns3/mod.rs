//! # ns-3 Program Synthesis
//!
//! Turns a numbered topology tree into a C++ program for the ns-3
//! discrete-event simulator. The program mirrors the live fabric: every
//! interface that owns a TAP device is bound to its simulated net device
//! by name, so the generated wiring and the host bridges agree as long as
//! both read the same numbered tree.
//!
//! ## Program Layout
//!
//! 1. Standard and ns-3 includes, plus one include per link type in use
//! 2. `printTime()`, a wall-clock/simulation-clock progress printer
//! 3. `main`: realtime simulator with checksums, stop time, node count,
//!    TAP bridge helper and per-link-type helpers
//! 4. Link wiring, child topologies before their parent's own links,
//!    followed by each used link type's closing statements
//! 5. Node placement: constant positions and waypoint trajectories
//! 6. NetAnim descriptions, progress scheduling, run and destroy
//!
//! [`launch`] installs the program into an ns-3 tree's `scratch/`
//! directory and runs it through `./waf`, optionally under gdb.
//!
//! ## Errors
//!
//! Formatting itself cannot fail. Unknown link types, nodes with two
//! trajectories and waypoint lists that cannot be put in time order are
//! reported as [`ScriptError`].

pub mod launch;
pub mod mobility;
pub mod writer;

pub use launch::{waf_args, LaunchError, RecordingSimulator, Simulator, WafSimulator};
pub use mobility::{chronological, Placement};
pub use writer::ScriptWriter;

use crate::registry::RegistryError;

/// Script generation errors
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("Position error while writing waypoints of node {node}")]
    Positioning { node: String },

    #[error("Node {node} has {absolute} absolute and {relative} relative positions; only one list may hold a trajectory")]
    ConflictingPositions {
        node: String,
        absolute: usize,
        relative: usize,
    },

    #[error("Node {node} has no node number; run numbering first")]
    Unnumbered { node: String },

    #[error("Failed to write ns-3 script {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
