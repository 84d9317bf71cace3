//! ns-3 program generation.

use super::mobility::{chronological, Placement};
use super::ScriptError;
use crate::registry::{LinkEndpoint, LinkInstance, LinkUsage, TypeRegistry};
use crate::topology::{Link, NodeId, Topology, TopologyTree};
use log::info;
use std::path::Path;

const STANDARD_INCLUDES: &str = r#"#include <iostream>
#include <chrono>
#include <iomanip>
#include <fstream>
#include <fcntl.h>
#include <unistd.h>
#include <iosfwd>
#include <sstream>
#include <math.h>
#include "ns3/core-module.h"
#include "ns3/network-module.h"
#include "ns3/internet-module.h"
#include "ns3/tap-bridge-module.h"
#include "ns3/netanim-module.h"
#include "ns3/mobility-module.h"
#include "ns3/ipv4-global-routing-helper.h"
#include "ns3/flow-monitor-module.h"
#include "sys/ioctl.h"
"#;

const NAMESPACE_PRELUDE: &str = r#"
typedef std::chrono::duration<int, std::ratio_multiply<std::chrono::hours::period, std::ratio<24>>::type> TimestampDays;
using namespace ns3;
"#;

const TIMING_FUNCTION: &str = r#"
void printTime(){
    std::chrono::time_point<std::chrono::system_clock> now = std::chrono::system_clock::now();
    auto duration = now.time_since_epoch();
    TimestampDays days = std::chrono::duration_cast<TimestampDays>(duration);
    duration -= days;
    auto hours = std::chrono::duration_cast<std::chrono::hours>(duration);
    duration -= hours;
    auto minutes = std::chrono::duration_cast<std::chrono::minutes>(duration);
    duration -= minutes;
    auto seconds = std::chrono::duration_cast<std::chrono::seconds>(duration);
    duration -= seconds;
    auto microseconds = std::chrono::duration_cast<std::chrono::microseconds>(duration);
    std::cout << "\r" << "Simulation Time: " << Simulator::Now().GetSeconds() << "\tReal Time [" << hours.count() << ":" << minutes.count() << ":" << seconds.count() << "." << microseconds.count() << " UTC] ";
    std::cout.flush();
}
"#;

const MAIN_PROLOGUE: &str = r#"
int main (int argc, char *argv[]){
CommandLine cmd;
cmd.Parse (argc, argv);
NodeContainer nodes;
ns3::Packet::EnablePrinting ();
GlobalValue::Bind ("SimulatorImplementationType", StringValue ("ns3::RealtimeSimulatorImpl"));
GlobalValue::Bind ("ChecksumEnabled", BooleanValue (true));
"#;

const TAP_BRIDGE_INIT: &str = r#"TapBridgeHelper tapBridge;
tapBridge.SetAttribute ("Mode", StringValue ("UseBridge"));
"#;

const MOBILITY_PROLOGUE: &str = r#"MobilityHelper mobility;
MobilityHelper waymobility;
Ptr<WaypointMobilityModel> mob;
waymobility.SetMobilityModel ("ns3::WaypointMobilityModel");
Ptr<ListPositionAllocator> positionAlloc = CreateObject<ListPositionAllocator> ();
"#;

/// Seconds between two progress prints of the generated program.
const TIMING_INTERVAL_SECS: u32 = 10;

/// Escape a node name for use inside a C++ string literal.
fn cpp_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Writes the ns-3 program for a numbered topology tree.
///
/// Reads the tree only; the output depends on nothing but the tree, the
/// registry and the run time, so the same inputs always give the same text.
pub struct ScriptWriter<'a> {
    tree: &'a TopologyTree,
    registry: &'a TypeRegistry,
    run_time: f64,
}

impl<'a> ScriptWriter<'a> {
    pub fn new(tree: &'a TopologyTree, registry: &'a TypeRegistry, run_time: f64) -> Self {
        Self {
            tree,
            registry,
            run_time,
        }
    }

    /// Render the program and write it to `path`.
    pub fn write_script(&self, path: &Path) -> Result<(), ScriptError> {
        let script = self.render()?;
        info!("Saving ns-3 file @ {}", path.display());
        std::fs::write(path, script).map_err(|source| ScriptError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Render the whole program.
    pub fn render(&self) -> Result<String, ScriptError> {
        let usage = LinkUsage::scan(&self.tree.root, self.registry)?;
        let nodes = self.numbered_nodes()?;
        let mut out = String::new();

        self.write_includes(&mut out, &usage)?;
        out.push_str(TIMING_FUNCTION);
        out.push_str(MAIN_PROLOGUE);
        self.write_init(&mut out, &usage, nodes.len())?;

        let tree: &'a TopologyTree = self.tree;
        self.write_links_for_topology(&mut out, &tree.root, 0)?;
        for link_type in usage.iter() {
            self.registry.link_type(link_type)?.write_closing_remarks(&mut out);
        }

        self.write_positions(&mut out, &nodes)?;

        out.push_str("AnimationInterface anim (\"animation.xml\");\n");
        out.push_str("anim.EnablePacketMetadata ();\n");
        for &(num, id) in &nodes {
            out.push_str(&format!(
                "anim.UpdateNodeDescription ({}, \"{}\");\n",
                num,
                cpp_escape(&self.tree.arena.node(id).name)
            ));
        }

        out.push_str(&format!(
            "for (uint64_t i = 0; i <= {:.6}; i += {}){{Simulator::Schedule (Seconds (i), &printTime);}}\n",
            self.run_time, TIMING_INTERVAL_SECS
        ));
        out.push_str("Simulator::Run ();\n");
        out.push_str("Simulator::Destroy ();\n");
        out.push_str("}\n");
        Ok(out)
    }

    /// Every node in pre-order with its number; fails if numbering was
    /// skipped.
    fn numbered_nodes(&self) -> Result<Vec<(u32, NodeId)>, ScriptError> {
        self.tree
            .nodes_preorder()
            .into_iter()
            .map(|id| {
                let node = self.tree.arena.node(id);
                node.node_num
                    .map(|num| (num, id))
                    .ok_or_else(|| ScriptError::Unnumbered {
                        node: node.name.clone(),
                    })
            })
            .collect()
    }

    fn write_includes(&self, out: &mut String, usage: &LinkUsage) -> Result<(), ScriptError> {
        out.push_str(STANDARD_INCLUDES);
        for link_type in usage.iter() {
            self.registry.link_type(link_type)?.write_includes(out);
        }
        out.push_str(NAMESPACE_PRELUDE);
        Ok(())
    }

    fn write_init(&self, out: &mut String, usage: &LinkUsage, node_count: usize) -> Result<(), ScriptError> {
        out.push_str(&format!("Simulator::Stop (Seconds ({:.6}));\n", self.run_time));
        out.push_str(&format!("nodes.Create ({});\n", node_count));
        out.push_str(TAP_BRIDGE_INIT);
        for link_type in usage.iter() {
            self.registry.link_type(link_type)?.write_type_init(out);
        }
        Ok(())
    }

    /// Children's links first, then this topology's own. Returns the next
    /// free link index.
    fn write_links_for_topology(
        &self,
        out: &mut String,
        top: &'a Topology,
        mut next_index: usize,
    ) -> Result<usize, ScriptError> {
        for sub in &top.subtopologies {
            next_index = self.write_links_for_topology(out, sub, next_index)?;
        }
        for link in &top.links {
            let link_type = self.registry.link_type(&link.link_type)?;
            let instance = self.link_instance(next_index, link)?;
            link_type.write_link(out, &instance);
            next_index += 1;
        }
        Ok(next_index)
    }

    fn link_instance(&self, index: usize, link: &'a Link) -> Result<LinkInstance<'a>, ScriptError> {
        let tree: &'a TopologyTree = self.tree;
        let arena = &tree.arena;
        let endpoints = link
            .ifaces
            .iter()
            .map(|&id| {
                let iface = arena.iface(id);
                let node = arena.owner(id);
                let node_num = node.node_num.ok_or_else(|| ScriptError::Unnumbered {
                    node: node.name.clone(),
                })?;
                Ok(LinkEndpoint {
                    node_num,
                    tap_name: iface.tap_name.as_deref(),
                })
            })
            .collect::<Result<Vec<_>, ScriptError>>()?;
        Ok(LinkInstance {
            index,
            link,
            endpoints,
        })
    }

    fn write_positions(&self, out: &mut String, nodes: &[(u32, NodeId)]) -> Result<(), ScriptError> {
        let placements = nodes
            .iter()
            .map(|&(num, id)| Ok((num, id, Placement::of(self.tree.arena.node(id))?)))
            .collect::<Result<Vec<_>, ScriptError>>()?;

        out.push('\n');
        out.push_str(MOBILITY_PROLOGUE);

        // The allocator hands positions out in the order mobility.Install
        // is called, so only static nodes get an entry, in the same order.
        for (_, _, placement) in &placements {
            if let Placement::Static(position) = placement {
                out.push_str(&format!("positionAlloc->Add ({});\n", position.ns3_vector()));
            }
        }
        out.push_str("mobility.SetPositionAllocator (positionAlloc);\n");
        out.push_str("mobility.SetMobilityModel (\"ns3::ConstantPositionMobilityModel\");\n");

        for (num, id, placement) in &placements {
            match placement {
                Placement::Static(_) => {
                    out.push_str(&format!("mobility.Install (nodes.Get ({}));\n", num));
                }
                Placement::Trajectory(positions) => {
                    let waypoints =
                        chronological(positions).ok_or_else(|| ScriptError::Positioning {
                            node: self.tree.arena.node(*id).name.clone(),
                        })?;
                    out.push_str(&format!("waymobility.Install (nodes.Get ({}));\n", num));
                    out.push_str(&format!(
                        "mob = nodes.Get ({})->GetObject<WaypointMobilityModel> ();\n",
                        num
                    ));
                    for waypoint in waypoints {
                        out.push_str(&format!(
                            "mob->AddWaypoint (Waypoint ({}));\n",
                            waypoint.ns3_waypoint()
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{number_topology, parse_topology};

    const TOPOLOGY: &str = r#"
name: demo
nodes:
  - name: a
    type: lxc
    ifaces:
      eth0: { ip: 10.0.0.1, netmask: 255.255.255.0 }
    abs_positions:
      - { x: 1, y: 2, z: 3 }
  - name: mover
    type: ns3
    ifaces:
      eth0: {}
    positions:
      - { time: 5, x: 50 }
      - { time: 1, x: 10 }
      - { time: 3, x: 30 }
links:
  - type: csma
    ifaces: [a.eth0, mover.eth0]
topologies:
  - name: branch
    nodes:
      - name: b
        type: lxc
        ifaces:
          eth0: { ip: 10.0.1.1, netmask: 255.255.255.0 }
          eth1: { ip: 10.0.2.1, netmask: 255.255.255.0 }
    links:
      - type: wifi
        ifaces: [b.eth0]
      - type: csma
        ifaces: [b.eth1, b.eth0]
"#;

    fn numbered(yaml: &str) -> (TopologyTree, TypeRegistry) {
        let registry = TypeRegistry::default();
        let mut tree = parse_topology(yaml).unwrap();
        number_topology(&mut tree, &registry).unwrap();
        (tree, registry)
    }

    fn position_of(script: &str, needle: &str) -> usize {
        script
            .find(needle)
            .unwrap_or_else(|| panic!("{:?} not in script", needle))
    }

    #[test]
    fn test_render_sections_in_order() {
        let (tree, registry) = numbered(TOPOLOGY);
        let script = ScriptWriter::new(&tree, &registry, 30.0).render().unwrap();

        let order = [
            "#include \"ns3/core-module.h\"",
            "#include \"ns3/wifi-module.h\"",
            "#include \"ns3/csma-module.h\"",
            "using namespace ns3;",
            "void printTime(){",
            "GlobalValue::Bind (\"ChecksumEnabled\", BooleanValue (true));",
            "Simulator::Stop (Seconds (30.000000));",
            "nodes.Create (3);",
            "WifiHelper wifi;",
            "CsmaHelper csma;",
            "NetDeviceContainer link0Devices = wifi.Install",
            "NetDeviceContainer link1Devices = csma.Install",
            "NetDeviceContainer link2Devices = csma.Install",
            "wifiPhy.EnablePcapAll (\"wifi\");",
            "csma.EnablePcapAll (\"csma\", true);",
            "Ptr<ListPositionAllocator> positionAlloc",
            "AnimationInterface anim (\"animation.xml\");",
            "anim.UpdateNodeDescription (2, \"b\");",
            "Simulator::Run ();",
            "Simulator::Destroy ();",
        ];
        let mut last = 0;
        for needle in order {
            let at = position_of(&script, needle);
            assert!(at >= last, "{:?} out of order", needle);
            last = at;
        }
        assert!(!script.contains("p2p"));
    }

    #[test]
    fn test_tap_names_match_numbering() {
        let (tree, registry) = numbered(TOPOLOGY);
        let script = ScriptWriter::new(&tree, &registry, 30.0).render().unwrap();

        // root link first: a.eth0 -> 0; branch: b.eth0 -> 1, b.eth1 -> 2
        assert!(script.contains("StringValue (\"0_t\")"));
        assert!(script.contains("StringValue (\"1_t\")"));
        assert!(script.contains("StringValue (\"2_t\")"));
        assert!(!script.contains("3_t"));
        assert!(script.contains("tapBridge.Install (nodes.Get (0), link2Devices.Get (0));"));
    }

    #[test]
    fn test_waypoints_emitted_chronologically() {
        let (tree, registry) = numbered(TOPOLOGY);
        let script = ScriptWriter::new(&tree, &registry, 30.0).render().unwrap();

        let first = position_of(&script, "Waypoint (Seconds (1.000000), Vector (10.000000");
        let second = position_of(&script, "Waypoint (Seconds (3.000000), Vector (30.000000");
        let third = position_of(&script, "Waypoint (Seconds (5.000000), Vector (50.000000");
        assert!(first < second && second < third);

        assert!(script.contains("waymobility.Install (nodes.Get (1));"));
        assert!(script.contains("mobility.Install (nodes.Get (0));"));
        assert!(script.contains("mobility.Install (nodes.Get (2));"));
        // two static nodes, two allocator entries
        assert_eq!(script.matches("positionAlloc->Add").count(), 2);
        assert!(script.contains("positionAlloc->Add (Vector (1.000000,2.000000,3.000000));"));
        assert!(script.contains("positionAlloc->Add (Vector (0.000000,0.000000,0.000000));"));
    }

    #[test]
    fn test_render_is_reproducible() {
        let (tree, registry) = numbered(TOPOLOGY);
        let writer = ScriptWriter::new(&tree, &registry, 12.5);
        assert_eq!(writer.render().unwrap(), writer.render().unwrap());
    }

    #[test]
    fn test_duplicate_waypoint_times_are_fatal() {
        let yaml = r#"
name: bad
nodes:
  - name: n
    type: ns3
    positions:
      - { time: 2 }
      - { time: 2, x: 1 }
"#;
        let (tree, registry) = numbered(yaml);
        let err = ScriptWriter::new(&tree, &registry, 1.0).render().unwrap_err();
        assert!(matches!(err, ScriptError::Positioning { ref node } if node == "n"));
    }

    #[test]
    fn test_unnumbered_tree_is_rejected() {
        let registry = TypeRegistry::default();
        let tree = parse_topology(TOPOLOGY).unwrap();
        assert!(matches!(
            ScriptWriter::new(&tree, &registry, 1.0).render(),
            Err(ScriptError::Unnumbered { .. })
        ));
    }

    #[test]
    fn test_node_names_are_escaped() {
        assert_eq!(cpp_escape("a\"b\\c"), "a\\\"b\\\\c");
    }
}
