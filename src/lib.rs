//! # ns3lxc - Topology-driven bridge/TAP fabric and ns-3 program generator
//!
//! This library turns a hierarchical network topology into two artifacts
//! that agree with each other: live Linux bridge/TAP pairs that containers
//! attach to, and a C++ program for the ns-3 simulator that wires the same
//! TAP devices into simulated links.
//!
//! ## Overview
//!
//! A topology is a tree: each level owns nodes, links between node
//! interfaces, and child topologies. Every node gets a number, in pre-order
//! over the tree. Every interface that can carry a TAP device gets a
//! bridge/TAP pair `<N>_b`/`<N>_t`, in the order links are walked. Both
//! numberings are recomputed from zero on each run, so the devices on the
//! host and the names in the generated program always match.
//!
//! ## Architecture
//!
//! - `topology`: arena-backed topology tree, YAML loader and numbering
//! - `registry`: node and link type behavior tables
//! - `devices`: bridge/TAP lifecycle against the OS, device manifest
//! - `ns3`: ns-3 program synthesis and the waf launcher
//! - `config`: `settings.yaml` loading
//! - `utils`: validation and post-run artifact collection
//! - `orchestrator`: sequencing of a single run
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use ns3lxc::config::Settings;
//! use ns3lxc::devices::DeviceManager;
//! use ns3lxc::ns3::WafSimulator;
//! use ns3lxc::orchestrator::{Orchestrator, RunOptions};
//! use ns3lxc::registry::TypeRegistry;
//! use ns3lxc::topology::load_topology;
//! use std::path::Path;
//!
//! let settings = Settings::default();
//! let mut tree = load_topology(Path::new("topologies/demo.yaml"))?;
//! let mut orchestrator = Orchestrator::new(
//!     &settings,
//!     TypeRegistry::default(),
//!     DeviceManager::system(),
//!     None::<WafSimulator>,
//! );
//! let options = RunOptions { script_only: true, ..RunOptions::default() };
//! let summary = orchestrator.run(&mut tree, &options)?;
//!
//! // output/demo/ now contains:
//! // - demo.cc: ns-3 program
//! // - devices.json: bridge/tap assignment per interface
//! println!("{:?}", summary.script);
//! # Ok::<(), color_eyre::Report>(())
//! ```
//!
//! ## Topology Format
//!
//! ```yaml
//! name: demo
//! time: 30            # simulated seconds, overrides settings
//! nodes:
//!   - name: a
//!     type: lxc       # lxc, docker or ns3
//!     ifaces:
//!       eth0: { ip: 10.0.0.1, netmask: 255.255.255.0 }
//!     positions:
//!       - { x: 0, y: 0, z: 0 }
//! links:
//!   - type: csma      # csma, wifi or p2p
//!     ifaces: [a.eth0, branch.b.eth0]
//! topologies:
//!   - name: branch
//!     nodes:
//!       - name: b
//!         ifaces:
//!           eth0: { ip: 10.0.0.2, netmask: 255.255.255.0 }
//! ```
//!
//! ## Error Handling
//!
//! Each module reports typed errors (`thiserror`). The orchestrator and the
//! binary add context with `color_eyre`.

pub mod config;
pub mod devices;
pub mod ns3;
pub mod orchestrator;
pub mod registry;
pub mod topology;
pub mod utils;
