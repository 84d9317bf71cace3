//! Topology validation utilities.
//!
//! Checks a loaded tree against the type registry before any device is
//! created or any script is written, so configuration faults surface
//! before the host is touched.

use crate::ns3::{Placement, ScriptError};
use crate::registry::{RegistryError, TypeRegistry};
use crate::topology::{Topology, TopologyTree};

/// Validate node types, link types and link endpoint counts
///
/// Checks for:
/// - Node types missing from the registry
/// - Link types missing from the registry
/// - Links whose interface count the link type does not accept
///
/// # Arguments
/// * `tree` - The topology tree to validate
/// * `registry` - The node and link types known to this build
///
/// # Returns
/// * `Ok(())` if validation succeeds
/// * `Err(RegistryError)` naming the first offending node or link
pub fn validate_topology_types(
    tree: &TopologyTree,
    registry: &TypeRegistry,
) -> Result<(), RegistryError> {
    for id in tree.nodes_preorder() {
        let node = tree.arena.node(id);
        registry.node_type(&node.node_type, &node.name)?;
    }
    validate_links(&tree.root, registry)
}

fn validate_links(top: &Topology, registry: &TypeRegistry) -> Result<(), RegistryError> {
    for link in &top.links {
        let limits = registry.link_type(&link.link_type)?.endpoint_limits();
        if !limits.accepts(link.ifaces.len()) {
            return Err(RegistryError::EndpointCount {
                link_type: link.link_type.clone(),
                topology: top.name.clone(),
                expected: limits,
                actual: link.ifaces.len(),
            });
        }
    }
    for sub in &top.subtopologies {
        validate_links(sub, registry)?;
    }
    Ok(())
}

/// Reject nodes whose absolute and relative position lists both describe
/// a trajectory
pub fn validate_positions(tree: &TopologyTree) -> Result<(), ScriptError> {
    for id in tree.nodes_preorder() {
        Placement::of(tree.arena.node(id))?;
    }
    Ok(())
}
