//! Node and bridge/TAP numbering.
//!
//! Two independent depth-first passes over the tree. Their orders are part
//! of the external contract: node numbers appear in the generated ns-3
//! program and bridge/TAP names appear on the host, so both must come out
//! identical for the same description on every run.
//!
//! - Node numbers: pre-order, a topology's own nodes before its children.
//! - Bridge/TAP numbers: a topology's own links (and each link's interfaces
//!   in order) before recursing into its children.
//!
//! Counters are threaded through the recursion and returned; nothing is
//! kept in global state, so numbering the same tree twice yields the same
//! assignment.

use super::types::{Arena, Topology, TopologyTree};
use crate::registry::{RegistryError, TypeRegistry};
use log::debug;

/// Result of a full numbering pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Numbering {
    /// Number of nodes in the whole tree; node numbers are `0..node_count`
    pub node_count: u32,
    /// Number of bridge/TAP pairs assigned
    pub device_count: u32,
}

pub fn bridge_name(n: u32) -> String {
    format!("{}_b", n)
}

pub fn tap_name(n: u32) -> String {
    format!("{}_t", n)
}

/// Run both numbering passes.
pub fn number_topology(
    tree: &mut TopologyTree,
    registry: &TypeRegistry,
) -> Result<Numbering, RegistryError> {
    let node_count = number_nodes(tree);
    let device_count = assign_bridges_taps(tree, registry)?;
    debug!(
        "Numbered topology {}: {} nodes, {} bridge/tap pairs",
        tree.root.name, node_count, device_count
    );
    Ok(Numbering {
        node_count,
        device_count,
    })
}

/// Assign every node a number in pre-order and return the node count.
pub fn number_nodes(tree: &mut TopologyTree) -> u32 {
    let TopologyTree { root, arena } = tree;
    number_nodes_from(root, arena, 0)
}

fn number_nodes_from(top: &Topology, arena: &mut Arena, mut next: u32) -> u32 {
    for &id in &top.nodes {
        arena.node_mut(id).node_num = Some(next);
        next += 1;
    }
    for sub in &top.subtopologies {
        next = number_nodes_from(sub, arena, next);
    }
    next
}

/// Give every eligible link interface a `<n>_b` / `<n>_t` pair and return
/// the number of pairs assigned.
///
/// Previous assignments are cleared first. An interface that sits on more
/// than one link keeps the name from its first link.
pub fn assign_bridges_taps(
    tree: &mut TopologyTree,
    registry: &TypeRegistry,
) -> Result<u32, RegistryError> {
    let TopologyTree { root, arena } = tree;
    for iface in arena.ifaces_mut() {
        iface.bridge_name = None;
        iface.tap_name = None;
    }
    assign_bridges_taps_from(root, arena, registry, 0)
}

fn assign_bridges_taps_from(
    top: &Topology,
    arena: &mut Arena,
    registry: &TypeRegistry,
    mut next: u32,
) -> Result<u32, RegistryError> {
    for link in &top.links {
        for &id in &link.ifaces {
            let iface = arena.iface(id);
            if iface.bridge_name.is_some() || !registry.is_eligible(arena, iface)? {
                continue;
            }
            let iface = arena.iface_mut(id);
            iface.bridge_name = Some(bridge_name(next));
            iface.tap_name = Some(tap_name(next));
            next += 1;
        }
    }
    for sub in &top.subtopologies {
        next = assign_bridges_taps_from(sub, arena, registry, next)?;
    }
    Ok(next)
}
