//! Host virtual network devices.
//!
//! Creates, wires and removes the Linux bridge/TAP pairs that let
//! containers reach the simulated network, and records which pair belongs
//! to which interface.

pub mod command;
pub mod manager;
pub mod manifest;

pub use command::{CommandOutput, CommandRunner, ScriptedRunner, SystemCommandRunner};
pub use manager::{eligible_ifaces, DeviceError, DeviceManager, DeviceState, FailurePolicy};
pub use manifest::{DeviceManifest, DeviceRecord};
