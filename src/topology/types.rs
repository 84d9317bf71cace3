//! Topology type definitions.
//!
//! The tree of topologies owns only indices; every node and interface lives
//! in a flat [`Arena`] so that interfaces can point back at their node and
//! links can point at interfaces without shared ownership.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

/// Index of a [`Node`] inside the [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

/// Index of an [`Iface`] inside the [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IfaceId(pub usize);

/// A point in the simulated space, optionally stamped with the simulation
/// time at which a node reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default)]
    pub time: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z, time: 0.0 }
    }

    pub fn at(time: f64, x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z, time }
    }

    /// Render as an ns-3 `Vector (x,y,z)` argument list.
    pub fn ns3_vector(&self) -> String {
        format!("Vector ({:.6},{:.6},{:.6})", self.x, self.y, self.z)
    }

    /// Render as the arguments of an ns-3 `Waypoint`.
    pub fn ns3_waypoint(&self) -> String {
        format!("Seconds ({:.6}), {}", self.time, self.ns3_vector())
    }
}

/// A named network interface belonging to exactly one node.
#[derive(Debug, Clone, PartialEq)]
pub struct Iface {
    pub name: String,
    pub node: NodeId,
    pub ip: Option<Ipv4Addr>,
    pub subnet_mask: Option<Ipv4Addr>,
    /// `<n>_b`, assigned by the numbering pass
    pub bridge_name: Option<String>,
    /// `<n>_t`, assigned by the numbering pass
    pub tap_name: Option<String>,
}

impl Iface {
    pub fn new(name: impl Into<String>, node: NodeId) -> Self {
        Self {
            name: name.into(),
            node,
            ip: None,
            subnet_mask: None,
            bridge_name: None,
            tap_name: None,
        }
    }

    /// Both an address and a mask are present.
    pub fn is_addressed(&self) -> bool {
        self.ip.is_some() && self.subnet_mask.is_some()
    }

    /// The assigned bridge and TAP names, if numbering gave this interface
    /// a device pair.
    pub fn device_names(&self) -> Option<(&str, &str)> {
        match (&self.bridge_name, &self.tap_name) {
            (Some(bridge), Some(tap)) => Some((bridge.as_str(), tap.as_str())),
            _ => None,
        }
    }
}

/// A simulated host.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub node_type: String,
    /// Unique across the whole tree once numbering has run
    pub node_num: Option<u32>,
    pub ifaces: BTreeMap<String, IfaceId>,
    pub abs_positions: Vec<Position>,
    /// Positions relative to the enclosing topology
    pub positions: Vec<Position>,
}

impl Node {
    pub fn new(name: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            node_type: node_type.into(),
            node_num: None,
            ifaces: BTreeMap::new(),
            abs_positions: Vec::new(),
            positions: Vec::new(),
        }
    }
}

/// A link of a given type joining one or more interfaces.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub link_type: String,
    pub ifaces: Vec<IfaceId>,
    /// ns-3 `DataRate` literal, e.g. `100Mbps`
    pub bandwidth: Option<String>,
    /// ns-3 `Time` literal, e.g. `2ms`
    pub latency: Option<String>,
}

impl Link {
    pub fn new(link_type: impl Into<String>, ifaces: Vec<IfaceId>) -> Self {
        Self {
            link_type: link_type.into(),
            ifaces,
            bandwidth: None,
            latency: None,
        }
    }
}

/// One level of the topology hierarchy.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Topology {
    pub name: String,
    pub subtopologies: Vec<Topology>,
    pub nodes: Vec<NodeId>,
    pub links: Vec<Link>,
    pub tags: BTreeMap<String, serde_yaml::Value>,
}

impl Topology {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Flat storage for every node and interface of a tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Arena {
    nodes: Vec<Node>,
    ifaces: Vec<Iface>,
}

impl Arena {
    pub fn add_node(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Add an interface to `node`, replacing any interface of the same name
    /// in the node's map.
    pub fn add_iface(&mut self, node: NodeId, name: &str) -> IfaceId {
        let id = IfaceId(self.ifaces.len());
        self.ifaces.push(Iface::new(name, node));
        self.nodes[node.0].ifaces.insert(name.to_string(), id);
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn iface(&self, id: IfaceId) -> &Iface {
        &self.ifaces[id.0]
    }

    pub fn iface_mut(&mut self, id: IfaceId) -> &mut Iface {
        &mut self.ifaces[id.0]
    }

    /// The node that owns an interface.
    pub fn owner(&self, id: IfaceId) -> &Node {
        self.node(self.iface(id).node)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn ifaces(&self) -> impl Iterator<Item = &Iface> {
        self.ifaces.iter()
    }

    pub fn ifaces_mut(&mut self) -> impl Iterator<Item = &mut Iface> {
        self.ifaces.iter_mut()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// A topology hierarchy together with the arena its indices point into.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TopologyTree {
    pub root: Topology,
    pub arena: Arena,
}

impl TopologyTree {
    pub fn new(root: Topology, arena: Arena) -> Self {
        Self { root, arena }
    }

    /// Nodes in pre-order: a topology's own nodes, then each child's.
    pub fn nodes_preorder(&self) -> Vec<NodeId> {
        fn walk(top: &Topology, out: &mut Vec<NodeId>) {
            out.extend(top.nodes.iter().copied());
            for sub in &top.subtopologies {
                walk(sub, out);
            }
        }
        let mut out = Vec::with_capacity(self.arena.node_count());
        walk(&self.root, &mut out);
        out
    }

    /// Give every node without a type the settings' default type.
    pub fn apply_default_node_type(&mut self, default_type: &str) {
        for id in self.nodes_preorder() {
            let node = self.arena.node_mut(id);
            if node.node_type.is_empty() {
                node.node_type = default_type.to_string();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iface_addressed_requires_ip_and_mask() {
        let mut iface = Iface::new("eth0", NodeId(0));
        assert!(!iface.is_addressed());
        iface.ip = Some(Ipv4Addr::new(10, 0, 0, 1));
        assert!(!iface.is_addressed());
        iface.subnet_mask = Some(Ipv4Addr::new(255, 255, 255, 0));
        assert!(iface.is_addressed());
    }

    #[test]
    fn test_preorder_and_default_type() {
        let mut arena = Arena::default();
        let a = arena.add_node(Node::new("a", ""));
        let b = arena.add_node(Node::new("b", "ns3"));
        let c = arena.add_node(Node::new("c", ""));

        let mut child = Topology::new("child");
        child.nodes.push(c);
        let mut root = Topology::new("root");
        root.nodes.extend([a, b]);
        root.subtopologies.push(child);

        let mut tree = TopologyTree::new(root, arena);
        assert_eq!(tree.nodes_preorder(), vec![a, b, c]);

        tree.apply_default_node_type("lxc");
        assert_eq!(tree.arena.node(a).node_type, "lxc");
        assert_eq!(tree.arena.node(b).node_type, "ns3");
        assert_eq!(tree.arena.node(c).node_type, "lxc");
    }

    #[test]
    fn test_position_formatting() {
        let pos = Position::at(1.5, 1.0, 2.0, 0.0);
        assert_eq!(pos.ns3_vector(), "Vector (1.000000,2.000000,0.000000)");
        assert_eq!(
            pos.ns3_waypoint(),
            "Seconds (1.500000), Vector (1.000000,2.000000,0.000000)"
        );
    }
}
