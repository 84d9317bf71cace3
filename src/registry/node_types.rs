//! Built-in node types.

/// Behavior attached to a node type string.
pub trait NodeType {
    /// Key used in topology descriptions.
    fn name(&self) -> &str;

    /// Whether the interfaces of nodes of this type need a host bridge/TAP
    /// pair to reach the simulation.
    fn creates_bridges_taps(&self) -> bool;
}

/// A node backed by a real container that attaches through a TAP device.
#[derive(Debug, Clone)]
pub struct ContainerNode {
    name: &'static str,
}

impl ContainerNode {
    pub const LXC: Self = Self { name: "lxc" };
    pub const DOCKER: Self = Self { name: "docker" };
}

impl NodeType for ContainerNode {
    fn name(&self) -> &str {
        self.name
    }

    fn creates_bridges_taps(&self) -> bool {
        true
    }
}

/// A node that exists only inside the simulator.
#[derive(Debug, Clone, Default)]
pub struct SimulatedNode;

impl NodeType for SimulatedNode {
    fn name(&self) -> &str {
        "ns3"
    }

    fn creates_bridges_taps(&self) -> bool {
        false
    }
}
