//! Bridge/TAP lifecycle.
//!
//! Every eligible interface gets one Linux bridge and one TAP device. The
//! container side attaches to the bridge; the simulator side opens the TAP.
//!
//! Creation runs five commands in order and, under the default
//! [`FailurePolicy::FailFast`], stops at the first failure without undoing
//! the steps already taken. Teardown runs the mirror sequence and, under the
//! default [`FailurePolicy::BestEffort`], keeps going past failures because
//! it usually runs after a crash or a partial setup where some devices are
//! already gone.

use super::command::{CommandRunner, SystemCommandRunner};
use crate::registry::{RegistryError, TypeRegistry};
use crate::topology::{Iface, IfaceId, Topology, TopologyTree};
use log::{debug, info, warn};
use std::collections::BTreeMap;

/// How far creation of one bridge/TAP pair has progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum DeviceState {
    #[default]
    Absent,
    BridgeCreated,
    TapCreated,
    TapUp,
    Attached,
    BridgeUp,
}

/// What to do when one step of a sequence fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop and report the failing step
    FailFast,
    /// Log the failure and run the remaining steps
    BestEffort,
}

/// Device lifecycle errors
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Failed to create bridge {device} for iface: {iface}")]
    BridgeCreate {
        device: String,
        iface: String,
        reached: DeviceState,
    },

    #[error("Failed to create or attach tap {device} for iface: {iface}")]
    TapCreate {
        device: String,
        iface: String,
        reached: DeviceState,
    },

    #[error("Failed to tear down {device} for iface {iface}: `{command}` failed")]
    Teardown {
        device: String,
        iface: String,
        command: String,
    },

    #[error("Interface {iface} has no bridge/tap assignment")]
    Unassigned { iface: String },

    #[error("Failed to run `{command}` for iface {iface}: {source}")]
    Spawn {
        command: String,
        iface: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Device {
    Bridge,
    Tap,
}

struct Step {
    argv: Vec<String>,
    /// Device named in the error if this step fails
    blame: Device,
    /// State after this step succeeds
    reaches: DeviceState,
}

impl Step {
    fn new(argv: &[&str], blame: Device, reaches: DeviceState) -> Self {
        Self {
            argv: argv.iter().map(|s| s.to_string()).collect(),
            blame,
            reaches,
        }
    }

    fn command_line(&self) -> String {
        self.argv.join(" ")
    }
}

fn creation_steps(bridge: &str, tap: &str) -> Vec<Step> {
    use Device::*;
    use DeviceState::*;
    vec![
        Step::new(&["brctl", "addbr", bridge], Bridge, BridgeCreated),
        Step::new(&["ip", "tuntap", "add", tap, "mode", "tap"], Tap, TapCreated),
        Step::new(&["ifconfig", tap, "0.0.0.0", "promisc", "up"], Tap, TapUp),
        Step::new(&["brctl", "addif", bridge, tap], Tap, Attached),
        Step::new(&["ifconfig", bridge, "up"], Bridge, BridgeUp),
    ]
}

fn teardown_steps(bridge: &str, tap: &str) -> Vec<Step> {
    use Device::*;
    use DeviceState::*;
    vec![
        Step::new(&["ifconfig", bridge, "down"], Bridge, Attached),
        Step::new(&["brctl", "delif", bridge, tap], Bridge, TapUp),
        // only the TAP is left once the bridge is gone
        Step::new(&["brctl", "delbr", bridge], Bridge, TapUp),
        Step::new(&["ifconfig", tap, "down"], Tap, TapCreated),
        Step::new(&["ip", "tuntap", "del", tap, "mode", "tap"], Tap, Absent),
    ]
}

/// Interfaces that get a bridge/TAP pair, in device-management order:
/// children before a topology's own nodes, each node's interfaces by name.
pub fn eligible_ifaces(
    tree: &TopologyTree,
    registry: &TypeRegistry,
) -> Result<Vec<IfaceId>, RegistryError> {
    fn walk(
        top: &Topology,
        tree: &TopologyTree,
        registry: &TypeRegistry,
        out: &mut Vec<IfaceId>,
    ) -> Result<(), RegistryError> {
        for sub in &top.subtopologies {
            walk(sub, tree, registry, out)?;
        }
        for &node_id in &top.nodes {
            let node = tree.arena.node(node_id);
            if !registry.node_type(&node.node_type, &node.name)?.creates_bridges_taps() {
                continue;
            }
            for &iface_id in node.ifaces.values() {
                if tree.arena.iface(iface_id).is_addressed() {
                    out.push(iface_id);
                }
            }
        }
        Ok(())
    }

    let mut out = Vec::new();
    walk(&tree.root, tree, registry, &mut out)?;
    Ok(out)
}

/// Creates and removes bridge/TAP pairs through a [`CommandRunner`].
pub struct DeviceManager<R: CommandRunner = SystemCommandRunner> {
    runner: R,
    create_policy: FailurePolicy,
    teardown_policy: FailurePolicy,
    states: BTreeMap<String, DeviceState>,
}

impl DeviceManager<SystemCommandRunner> {
    /// A manager that runs commands on this host.
    pub fn system() -> Self {
        Self::new(SystemCommandRunner)
    }
}

impl<R: CommandRunner> DeviceManager<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            create_policy: FailurePolicy::FailFast,
            teardown_policy: FailurePolicy::BestEffort,
            states: BTreeMap::new(),
        }
    }

    pub fn with_create_policy(mut self, policy: FailurePolicy) -> Self {
        self.create_policy = policy;
        self
    }

    pub fn with_teardown_policy(mut self, policy: FailurePolicy) -> Self {
        self.teardown_policy = policy;
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Last state reached by the pair whose bridge is `bridge`.
    pub fn state_of(&self, bridge: &str) -> DeviceState {
        self.states.get(bridge).copied().unwrap_or_default()
    }

    /// Run one command; `Ok(false)` means it ran and exited non-zero.
    fn run_step(&mut self, step: &Step, iface: &str) -> Result<bool, DeviceError> {
        let args: Vec<&str> = step.argv[1..].iter().map(String::as_str).collect();
        let output = self
            .runner
            .run(&step.argv[0], &args)
            .map_err(|source| DeviceError::Spawn {
                command: step.command_line(),
                iface: iface.to_string(),
                source,
            })?;
        if !output.success() {
            debug!(
                "`{}` exited with {:?}: {}",
                step.command_line(),
                output.exit_code,
                output.stderr.trim()
            );
        }
        Ok(output.success())
    }

    /// Create, attach and bring up the bridge/TAP pair of `iface`.
    pub fn create_device(&mut self, iface: &Iface) -> Result<(), DeviceError> {
        let (bridge, tap) = iface.device_names().ok_or_else(|| DeviceError::Unassigned {
            iface: iface.name.clone(),
        })?;
        info!("Creating bridge {} and tap {} for iface {}", bridge, tap, iface.name);

        for step in creation_steps(bridge, tap) {
            let succeeded = match self.run_step(&step, &iface.name) {
                Ok(succeeded) => succeeded,
                Err(e) if self.create_policy == FailurePolicy::BestEffort => {
                    warn!("{}", e);
                    false
                }
                Err(e) => return Err(e),
            };

            if succeeded {
                self.states.insert(bridge.to_string(), step.reaches);
                continue;
            }

            let reached = self.state_of(bridge);
            let device = match step.blame {
                Device::Bridge => bridge,
                Device::Tap => tap,
            };
            let err = match step.blame {
                Device::Bridge => DeviceError::BridgeCreate {
                    device: device.to_string(),
                    iface: iface.name.clone(),
                    reached,
                },
                Device::Tap => DeviceError::TapCreate {
                    device: device.to_string(),
                    iface: iface.name.clone(),
                    reached,
                },
            };
            match self.create_policy {
                FailurePolicy::FailFast => return Err(err),
                FailurePolicy::BestEffort => warn!("{}, continuing", err),
            }
        }
        Ok(())
    }

    /// Bring down, detach and delete the bridge/TAP pair of `iface`.
    pub fn teardown_device(&mut self, iface: &Iface) -> Result<(), DeviceError> {
        let (bridge, tap) = iface.device_names().ok_or_else(|| DeviceError::Unassigned {
            iface: iface.name.clone(),
        })?;
        debug!("Tearing down bridge {} and tap {} for iface {}", bridge, tap, iface.name);

        for step in teardown_steps(bridge, tap) {
            let failure = match self.run_step(&step, &iface.name) {
                Ok(true) => {
                    self.states.insert(bridge.to_string(), step.reaches);
                    None
                }
                Ok(false) => Some(DeviceError::Teardown {
                    device: match step.blame {
                        Device::Bridge => bridge.to_string(),
                        Device::Tap => tap.to_string(),
                    },
                    iface: iface.name.clone(),
                    command: step.command_line(),
                }),
                Err(e) => Some(e),
            };
            match (failure, self.teardown_policy) {
                (None, _) => {}
                (Some(e), FailurePolicy::FailFast) => return Err(e),
                (Some(e), FailurePolicy::BestEffort) => debug!("Ignoring teardown failure: {}", e),
            }
        }
        self.states.remove(bridge);
        Ok(())
    }

    /// Create a pair for every eligible interface in the tree.
    ///
    /// Returns how many pairs were created. Eligible interfaces that are not
    /// on any link have no names and are skipped.
    pub fn create_all(
        &mut self,
        tree: &TopologyTree,
        registry: &TypeRegistry,
    ) -> Result<usize, DeviceError> {
        let mut created = 0;
        for id in eligible_ifaces(tree, registry)? {
            let iface = tree.arena.iface(id);
            if iface.device_names().is_none() {
                warn!(
                    "Iface {} of node {} is addressed but not on any link, no bridge/tap created",
                    iface.name,
                    tree.arena.owner(id).name
                );
                continue;
            }
            self.create_device(iface)?;
            created += 1;
        }
        info!("Created {} bridge/tap pairs", created);
        Ok(created)
    }

    /// Tear down the pair of every eligible interface in the tree.
    pub fn teardown_all(
        &mut self,
        tree: &TopologyTree,
        registry: &TypeRegistry,
    ) -> Result<usize, DeviceError> {
        let mut removed = 0;
        for id in eligible_ifaces(tree, registry)? {
            let iface = tree.arena.iface(id);
            if iface.device_names().is_none() {
                continue;
            }
            self.teardown_device(iface)?;
            removed += 1;
        }
        info!("Tore down {} bridge/tap pairs", removed);
        Ok(removed)
    }
}
