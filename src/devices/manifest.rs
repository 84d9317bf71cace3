//! Device manifest.
//!
//! Written next to the generated script so container tooling can look up
//! which bridge belongs to which node interface without re-deriving the
//! numbering.

use super::manager::eligible_ifaces;
use crate::registry::{RegistryError, TypeRegistry};
use crate::topology::TopologyTree;
use color_eyre::eyre::WrapErr;
use serde::Serialize;
use std::path::Path;

/// One bridge/TAP pair and the interface it serves.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DeviceRecord {
    pub node: String,
    pub node_num: Option<u32>,
    pub iface: String,
    pub ip: String,
    pub subnet_mask: String,
    pub bridge: String,
    pub tap: String,
}

/// All bridge/TAP pairs of a numbered tree.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DeviceManifest {
    pub topology: String,
    pub devices: Vec<DeviceRecord>,
}

impl DeviceManifest {
    /// Collect records in the same order the device manager creates them.
    pub fn from_tree(tree: &TopologyTree, registry: &TypeRegistry) -> Result<Self, RegistryError> {
        let mut devices = Vec::new();
        for id in eligible_ifaces(tree, registry)? {
            let iface = tree.arena.iface(id);
            let Some((bridge, tap)) = iface.device_names() else {
                continue;
            };
            let node = tree.arena.owner(id);
            devices.push(DeviceRecord {
                node: node.name.clone(),
                node_num: node.node_num,
                iface: iface.name.clone(),
                ip: iface.ip.map(|ip| ip.to_string()).unwrap_or_default(),
                subnet_mask: iface.subnet_mask.map(|m| m.to_string()).unwrap_or_default(),
                bridge: bridge.to_string(),
                tap: tap.to_string(),
            });
        }
        Ok(Self {
            topology: tree.root.name.clone(),
            devices,
        })
    }

    pub fn write(&self, path: &Path) -> color_eyre::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .wrap_err_with(|| format!("Failed to write device manifest {:?}", path))?;
        log::info!("Wrote device manifest with {} entries to {:?}", self.devices.len(), path);
        Ok(())
    }
}
