//! # Type Dispatch Registry
//!
//! Maps the node and link type strings of a topology description to the
//! behavior attached to them:
//!
//! - **Node types** decide whether a node's interfaces get a host
//!   bridge/TAP pair (`lxc`, `docker`) or live only inside the simulator
//!   (`ns3`).
//! - **Link types** (`csma`, `wifi`, `p2p`) emit the ns-3 statements that
//!   declare, instantiate and close out links of that type.
//!
//! Looking up a type that was never registered is a configuration fault.
//! Validation is expected to catch it before any device is touched, so
//! callers propagate [`RegistryError`] rather than recover from it.

pub mod link_types;
pub mod node_types;

pub use link_types::{
    CsmaLink, EndpointLimits, LinkEndpoint, LinkInstance, LinkType, PointToPointLink, WifiLink,
};
pub use node_types::{ContainerNode, NodeType, SimulatedNode};

use crate::topology::{Arena, Iface, Topology};
use std::collections::BTreeMap;

/// Type lookup errors
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Unknown node type '{node_type}' for node {node}")]
    UnknownNodeType { node_type: String, node: String },

    #[error("Unknown link type '{0}'")]
    UnknownLinkType(String),

    #[error("Link of type '{link_type}' in topology {topology} has {actual} interfaces, expected {expected}")]
    EndpointCount {
        link_type: String,
        topology: String,
        expected: EndpointLimits,
        actual: usize,
    },
}

/// Node and link behavior tables.
pub struct TypeRegistry {
    node_types: BTreeMap<String, Box<dyn NodeType>>,
    link_types: BTreeMap<String, Box<dyn LinkType>>,
}

impl TypeRegistry {
    /// A registry with no types at all.
    pub fn empty() -> Self {
        Self {
            node_types: BTreeMap::new(),
            link_types: BTreeMap::new(),
        }
    }

    pub fn register_node_type(&mut self, node_type: Box<dyn NodeType>) {
        self.node_types.insert(node_type.name().to_string(), node_type);
    }

    pub fn register_link_type(&mut self, link_type: Box<dyn LinkType>) {
        self.link_types.insert(link_type.name().to_string(), link_type);
    }

    /// Look up the behavior of `node_type`; `node` only names the culprit in
    /// the error.
    pub fn node_type(&self, node_type: &str, node: &str) -> Result<&dyn NodeType, RegistryError> {
        self.node_types
            .get(node_type)
            .map(|t| t.as_ref())
            .ok_or_else(|| RegistryError::UnknownNodeType {
                node_type: node_type.to_string(),
                node: node.to_string(),
            })
    }

    pub fn link_type(&self, link_type: &str) -> Result<&dyn LinkType, RegistryError> {
        self.link_types
            .get(link_type)
            .map(|t| t.as_ref())
            .ok_or_else(|| RegistryError::UnknownLinkType(link_type.to_string()))
    }

    /// An interface is eligible for a bridge/TAP pair iff its node type asks
    /// for one and it carries both an address and a mask.
    pub fn is_eligible(&self, arena: &Arena, iface: &Iface) -> Result<bool, RegistryError> {
        let node = arena.node(iface.node);
        let node_type = self.node_type(&node.node_type, &node.name)?;
        Ok(node_type.creates_bridges_taps() && iface.is_addressed())
    }

    pub fn node_type_names(&self) -> impl Iterator<Item = &str> {
        self.node_types.keys().map(String::as_str)
    }

    pub fn link_type_names(&self) -> impl Iterator<Item = &str> {
        self.link_types.keys().map(String::as_str)
    }
}

impl Default for TypeRegistry {
    /// The built-in node and link types.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register_node_type(Box::new(ContainerNode::LXC));
        registry.register_node_type(Box::new(ContainerNode::DOCKER));
        registry.register_node_type(Box::new(SimulatedNode));
        registry.register_link_type(Box::new(CsmaLink));
        registry.register_link_type(Box::new(WifiLink));
        registry.register_link_type(Box::new(PointToPointLink));
        registry
    }
}

/// The link types used anywhere in a tree, in first-encounter order.
///
/// Encounter order follows the wiring pass: children before a topology's
/// own links.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkUsage {
    used: Vec<String>,
}

impl LinkUsage {
    pub fn scan(top: &Topology, registry: &TypeRegistry) -> Result<Self, RegistryError> {
        let mut usage = Self::default();
        usage.scan_topology(top, registry)?;
        Ok(usage)
    }

    fn scan_topology(&mut self, top: &Topology, registry: &TypeRegistry) -> Result<(), RegistryError> {
        for sub in &top.subtopologies {
            self.scan_topology(sub, registry)?;
        }
        for link in &top.links {
            registry.link_type(&link.link_type)?;
            self.mark_used(&link.link_type);
        }
        Ok(())
    }

    pub fn mark_used(&mut self, link_type: &str) {
        if !self.is_used(link_type) {
            self.used.push(link_type.to_string());
        }
    }

    pub fn is_used(&self, link_type: &str) -> bool {
        self.used.iter().any(|t| t == link_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.used.iter().map(String::as_str)
    }
}
