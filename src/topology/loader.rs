//! Resolved topology loading.
//!
//! Reads a YAML description of an already-resolved topology tree (includes,
//! templates and acceptors expanded) and builds the arena-backed
//! [`TopologyTree`]. Link endpoints are written as `node.iface`, optionally
//! prefixed by the names of child topologies: `branch.router.eth0` refers
//! to interface `eth0` of node `router` inside child topology `branch`.
//!
//! ```yaml
//! name: demo
//! time: 30
//! nodes:
//!   - name: a
//!     type: lxc
//!     ifaces:
//!       eth0: { ip: 10.0.0.1, netmask: 255.255.255.0 }
//! links:
//!   - type: csma
//!     ifaces: [a.eth0, branch.b.eth0]
//! topologies:
//!   - name: branch
//!     nodes:
//!       - name: b
//!         ifaces:
//!           eth0: { ip: 10.0.0.2, netmask: 255.255.255.0 }
//! ```

use super::types::{Arena, IfaceId, Link, Node, Position, Topology, TopologyTree};
use log::info;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::path::Path;

/// Errors building a tree from a description
#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error("Failed to read topology file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid topology description: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Duplicate node '{node}' in topology {topology}")]
    DuplicateNode { topology: String, node: String },

    #[error("Duplicate sub-topology '{child}' in topology {topology}")]
    DuplicateSubtopology { topology: String, child: String },

    #[error("Link in topology {topology} references unknown interface '{reference}'")]
    UnknownIface { topology: String, reference: String },
}

#[derive(Debug, Deserialize)]
pub struct TopologyDescription {
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<NodeDescription>,
    #[serde(default)]
    pub links: Vec<LinkDescription>,
    #[serde(default)]
    pub topologies: Vec<TopologyDescription>,
    /// Any other key, e.g. `time`
    #[serde(flatten)]
    pub tags: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Deserialize)]
pub struct NodeDescription {
    pub name: String,
    /// Empty means the settings' default node type
    #[serde(rename = "type", default)]
    pub node_type: String,
    #[serde(default)]
    pub ifaces: BTreeMap<String, Option<IfaceDescription>>,
    #[serde(default)]
    pub positions: Vec<Position>,
    #[serde(default)]
    pub abs_positions: Vec<Position>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IfaceDescription {
    pub ip: Option<Ipv4Addr>,
    #[serde(alias = "netmask")]
    pub subnet_mask: Option<Ipv4Addr>,
}

#[derive(Debug, Deserialize)]
pub struct LinkDescription {
    #[serde(rename = "type")]
    pub link_type: String,
    pub ifaces: Vec<String>,
    pub bandwidth: Option<String>,
    pub latency: Option<String>,
}

/// Load and build a topology tree from a YAML file.
pub fn load_topology(path: &Path) -> Result<TopologyTree, TopologyError> {
    info!("Loading topology from: {:?}", path);
    let content = std::fs::read_to_string(path).map_err(|source| TopologyError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_topology(&content)
}

/// Build a topology tree from YAML text.
pub fn parse_topology(yaml: &str) -> Result<TopologyTree, TopologyError> {
    let description: TopologyDescription = serde_yaml::from_str(yaml)?;
    build_tree(&description)
}

pub fn build_tree(description: &TopologyDescription) -> Result<TopologyTree, TopologyError> {
    let mut arena = Arena::default();
    let (root, _) = build_topology(description, &mut arena)?;
    Ok(TopologyTree::new(root, arena))
}

/// Build one level and return it with every interface reachable from it,
/// keyed by its dotted path relative to this level.
fn build_topology(
    description: &TopologyDescription,
    arena: &mut Arena,
) -> Result<(Topology, BTreeMap<String, IfaceId>), TopologyError> {
    let mut top = Topology::new(&description.name);
    top.tags = description.tags.clone();
    let mut scope = BTreeMap::new();
    let mut node_names = BTreeMap::new();

    for node_desc in &description.nodes {
        if node_names.insert(node_desc.name.as_str(), ()).is_some() {
            return Err(TopologyError::DuplicateNode {
                topology: description.name.clone(),
                node: node_desc.name.clone(),
            });
        }

        let mut node = Node::new(&node_desc.name, &node_desc.node_type);
        node.positions = node_desc.positions.clone();
        node.abs_positions = node_desc.abs_positions.clone();
        let node_id = arena.add_node(node);

        for (iface_name, iface_desc) in &node_desc.ifaces {
            let iface_id = arena.add_iface(node_id, iface_name);
            if let Some(iface_desc) = iface_desc {
                let iface = arena.iface_mut(iface_id);
                iface.ip = iface_desc.ip;
                iface.subnet_mask = iface_desc.subnet_mask;
            }
            scope.insert(format!("{}.{}", node_desc.name, iface_name), iface_id);
        }
        top.nodes.push(node_id);
    }

    let mut child_names = BTreeMap::new();
    for child_desc in &description.topologies {
        if child_names.insert(child_desc.name.as_str(), ()).is_some() {
            return Err(TopologyError::DuplicateSubtopology {
                topology: description.name.clone(),
                child: child_desc.name.clone(),
            });
        }
        let (child, child_scope) = build_topology(child_desc, arena)?;
        for (path, id) in child_scope {
            scope.insert(format!("{}.{}", child_desc.name, path), id);
        }
        top.subtopologies.push(child);
    }

    for link_desc in &description.links {
        let ifaces = link_desc
            .ifaces
            .iter()
            .map(|reference| {
                scope
                    .get(reference)
                    .copied()
                    .ok_or_else(|| TopologyError::UnknownIface {
                        topology: description.name.clone(),
                        reference: reference.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let mut link = Link::new(&link_desc.link_type, ifaces);
        link.bandwidth = link_desc.bandwidth.clone();
        link.latency = link_desc.latency.clone();
        top.links.push(link);
    }

    Ok((top, scope))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const NESTED: &str = r#"
name: demo
time: 42.5
nodes:
  - name: a
    type: lxc
    ifaces:
      eth0: { ip: 10.0.0.1, netmask: 255.255.255.0 }
    abs_positions:
      - { x: 1, y: 2, z: 3 }
  - name: sim
    type: ns3
    ifaces:
      eth0:
links:
  - type: csma
    bandwidth: 1Gbps
    ifaces: [a.eth0, sim.eth0, branch.b.eth0]
topologies:
  - name: branch
    nodes:
      - name: b
        ifaces:
          eth0: { ip: 10.0.1.1, subnet_mask: 255.255.255.0 }
"#;

    #[test]
    fn test_parse_nested_topology() {
        let tree = parse_topology(NESTED).unwrap();
        assert_eq!(tree.root.name, "demo");
        assert_eq!(tree.root.tags.get("time"), Some(&serde_yaml::Value::from(42.5)));
        assert_eq!(tree.root.nodes.len(), 2);
        assert_eq!(tree.root.subtopologies[0].name, "branch");

        let link = &tree.root.links[0];
        assert_eq!(link.link_type, "csma");
        assert_eq!(link.bandwidth.as_deref(), Some("1Gbps"));
        let endpoints: Vec<_> = link
            .ifaces
            .iter()
            .map(|&id| (tree.arena.owner(id).name.as_str(), tree.arena.iface(id).name.as_str()))
            .collect();
        assert_eq!(endpoints, vec![("a", "eth0"), ("sim", "eth0"), ("b", "eth0")]);

        let b_eth0 = tree.arena.iface(link.ifaces[2]);
        assert_eq!(b_eth0.ip, Some(Ipv4Addr::new(10, 0, 1, 1)));
        assert!(b_eth0.is_addressed());
        assert!(!tree.arena.iface(link.ifaces[1]).is_addressed());

        let a = tree.arena.node(tree.root.nodes[0]);
        assert_eq!(a.abs_positions, vec![Position::new(1.0, 2.0, 3.0)]);
        assert_eq!(tree.arena.node(tree.root.subtopologies[0].nodes[0]).node_type, "");
    }

    #[test]
    fn test_unknown_iface_reference() {
        let yaml = r#"
name: broken
nodes:
  - name: a
    ifaces:
      eth0: {}
links:
  - type: p2p
    ifaces: [a.eth0, a.eth1]
"#;
        let err = parse_topology(yaml).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Link in topology broken references unknown interface 'a.eth1'"
        );
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let yaml = r#"
name: dup
nodes:
  - name: a
  - name: a
"#;
        assert!(matches!(
            parse_topology(yaml),
            Err(TopologyError::DuplicateNode { .. })
        ));
    }

    #[test]
    fn test_load_topology_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", NESTED).unwrap();
        let tree = load_topology(temp_file.path()).unwrap();
        assert_eq!(tree.arena.node_count(), 3);
    }
}
