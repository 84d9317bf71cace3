//! Run orchestrator.
//!
//! This module sequences a single run: apply default node types, number the
//! tree, validate it against the type registry, then depending on the run
//! mode tear down an earlier fabric, or write the ns-3 program and device
//! manifest, bring up the bridge/TAP fabric, run the simulation and tear
//! everything down again.

use crate::config::Settings;
use crate::devices::{CommandRunner, DeviceManager, DeviceManifest};
use crate::ns3::{LaunchError, ScriptWriter, Simulator};
use crate::registry::TypeRegistry;
use crate::topology::{number_topology, Numbering, TopologyTree};
use crate::utils::{collect_artifacts, validate_positions, validate_topology_types};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Device manifest file name inside the topology output directory
pub const MANIFEST_FILE: &str = "devices.json";

/// Run mode flags, mirroring the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Write the ns-3 program and manifest only; touch no devices
    pub script_only: bool,
    /// Tear down the fabric of an earlier run and stop
    pub cleanup: bool,
    /// Leave the fabric up after the simulation, or after a creation fault
    pub spawn: bool,
    /// Run the simulation under gdb
    pub gdb: bool,
}

/// What a run produced
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub numbering: Numbering,
    pub script: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
    pub devices_created: usize,
    pub devices_removed: usize,
    pub artifacts: Vec<PathBuf>,
}

pub struct Orchestrator<'a, R: CommandRunner, S: Simulator> {
    settings: &'a Settings,
    registry: TypeRegistry,
    devices: DeviceManager<R>,
    simulator: Option<S>,
}

impl<'a, R: CommandRunner, S: Simulator> Orchestrator<'a, R, S> {
    /// `simulator` may be `None` when no ns-3 tree is configured; runs that
    /// need it then fail after the fabric is up and torn down again.
    pub fn new(
        settings: &'a Settings,
        registry: TypeRegistry,
        devices: DeviceManager<R>,
        simulator: Option<S>,
    ) -> Self {
        Self {
            settings,
            registry,
            devices,
            simulator,
        }
    }

    pub fn devices(&self) -> &DeviceManager<R> {
        &self.devices
    }

    pub fn simulator(&self) -> Option<&S> {
        self.simulator.as_ref()
    }

    /// Default types, numbering and validation; shared by every mode.
    pub fn prepare(&self, tree: &mut TopologyTree) -> Result<Numbering> {
        tree.apply_default_node_type(&self.settings.node_type);
        validate_topology_types(tree, &self.registry)
            .wrap_err_with(|| format!("Topology {} failed type validation", tree.root.name))?;
        let numbering = number_topology(tree, &self.registry)?;
        validate_positions(tree)?;
        info!(
            "Topology {}: {} nodes, {} bridge/tap pairs",
            tree.root.name, numbering.node_count, numbering.device_count
        );
        Ok(numbering)
    }

    /// Write `<topology>.cc` and the device manifest into the topology's
    /// output directory and return both paths.
    pub fn write_outputs(&self, tree: &TopologyTree) -> Result<(PathBuf, PathBuf)> {
        let out_dir = self.settings.topology_output_dir(&tree.root.name);
        fs::create_dir_all(&out_dir)
            .wrap_err_with(|| format!("Failed to create output directory {:?}", out_dir))?;

        let script = out_dir.join(format!("{}.cc", tree.root.name));
        let run_time = self.settings.run_time_secs(&tree.root)?;
        ScriptWriter::new(tree, &self.registry, run_time).write_script(&script)?;
        info!("Wrote ns-3 program to {:?} ({}s run time)", script, run_time);

        let manifest = out_dir.join(MANIFEST_FILE);
        DeviceManifest::from_tree(tree, &self.registry)?.write(&manifest)?;
        Ok((script, manifest))
    }

    pub fn run(&mut self, tree: &mut TopologyTree, options: &RunOptions) -> Result<RunSummary> {
        let mut summary = RunSummary {
            numbering: self.prepare(tree)?,
            ..RunSummary::default()
        };

        if options.cleanup {
            summary.devices_removed = self
                .devices
                .teardown_all(tree, &self.registry)
                .wrap_err("Cleanup failed")?;
            return Ok(summary);
        }

        let (script, manifest) = self.write_outputs(tree)?;
        summary.script = Some(script.clone());
        summary.manifest = Some(manifest);
        if options.script_only {
            return Ok(summary);
        }

        match self.devices.create_all(tree, &self.registry) {
            Ok(created) => summary.devices_created = created,
            Err(e) => {
                if options.spawn {
                    warn!("Spawn mode: leaving partially created devices in place");
                } else {
                    self.teardown_after_fault(tree);
                }
                return Err(e).wrap_err("Failed to create bridge/tap devices");
            }
        }

        let simulated = self.simulate(&script, &tree.root.name, options.gdb);
        if let Some(sim) = &self.simulator {
            let out_dir = self.settings.topology_output_dir(&tree.root.name);
            summary.artifacts = collect_artifacts(sim.working_dir(), &out_dir);
        }

        if options.spawn {
            info!("Spawn mode: leaving {} bridge/tap pairs up", summary.devices_created);
        } else {
            summary.devices_removed = self
                .devices
                .teardown_all(tree, &self.registry)
                .wrap_err("Teardown after simulation failed")?;
        }

        simulated.wrap_err("Simulation failed")?;
        Ok(summary)
    }

    fn simulate(&mut self, script: &Path, program: &str, gdb: bool) -> Result<(), LaunchError> {
        let sim = self.simulator.as_mut().ok_or(LaunchError::MissingNs3Path)?;
        sim.run(script, program, gdb)
    }

    fn teardown_after_fault(&mut self, tree: &TopologyTree) {
        info!("Tearing down devices after creation fault");
        if let Err(e) = self.devices.teardown_all(tree, &self.registry) {
            warn!("Teardown after creation fault failed: {}", e);
        }
    }
}
