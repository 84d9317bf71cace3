use clap::Parser;
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use env_logger::Env;
use log::info;
use std::path::PathBuf;

use ns3lxc::config::{load_settings, locate_settings};
use ns3lxc::devices::DeviceManager;
use ns3lxc::ns3::WafSimulator;
use ns3lxc::orchestrator::{Orchestrator, RunOptions};
use ns3lxc::registry::TypeRegistry;
use ns3lxc::topology::load_topology;

/// Build a bridge/TAP fabric and an ns-3 program from a topology description
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the resolved topology YAML file
    topology: PathBuf,

    /// Write only the ns-3 program and device manifest (root not required)
    #[arg(short = 'n', long, conflicts_with = "cleanup")]
    ns3_only: bool,

    /// Tear down the bridges and taps of an earlier run
    #[arg(short, long)]
    cleanup: bool,

    /// Do not tear down after the simulation completes
    #[arg(short, long)]
    spawn: bool,

    /// Run the ns-3 program under gdb
    #[arg(short, long)]
    gdb: bool,

    /// Settings file (default: settings.yaml at the ns3-lxc project root)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Output directory, overriding the settings file
    #[arg(long)]
    output: Option<PathBuf>,
}

impl Args {
    fn run_options(&self) -> RunOptions {
        RunOptions {
            script_only: self.ns3_only,
            cleanup: self.cleanup,
            spawn: self.spawn,
            gdb: self.gdb,
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    if !args.ns3_only && !nix::unistd::geteuid().is_root() {
        return Err(eyre!(
            "Must be run as root to manage bridges and taps (use -n to only write the ns-3 program)"
        ));
    }

    let settings_path = match &args.settings {
        Some(path) => path.clone(),
        None => locate_settings(&std::env::current_dir()?),
    };
    let mut settings = load_settings(&settings_path)
        .wrap_err_with(|| format!("Failed to load settings from {:?}", settings_path))?;
    if let Some(output) = &args.output {
        settings.output_dest = output.clone();
    }

    info!("Starting ns3lxc");
    info!("Topology file: {:?}", args.topology);
    info!("Output directory: {:?}", settings.output_dest);

    let mut tree = load_topology(&args.topology)
        .wrap_err_with(|| format!("Failed to load topology {:?}", args.topology))?;

    let simulator = settings.ns3_path.clone().map(WafSimulator::new);
    let mut orchestrator = Orchestrator::new(
        &settings,
        TypeRegistry::default(),
        DeviceManager::system(),
        simulator,
    );
    let summary = orchestrator.run(&mut tree, &args.run_options())?;

    if let Some(script) = &summary.script {
        info!("ns-3 program: {:?}", script);
    }
    info!(
        "Done: {} nodes, {} bridge/tap pairs created, {} torn down, {} artifacts collected",
        summary.numbering.node_count,
        summary.devices_created,
        summary.devices_removed,
        summary.artifacts.len()
    );
    Ok(())
}
