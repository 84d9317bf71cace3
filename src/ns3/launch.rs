//! Building and running a generated program inside an ns-3 tree.

use log::info;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Simulator launch errors
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("ns3_path is not set in the settings file")]
    MissingNs3Path,

    #[error("Failed to copy script to {path}: {source}")]
    Copy { path: String, source: io::Error },

    #[error("Failed to launch '{command}': {source}")]
    Spawn { command: String, source: io::Error },

    #[error("Simulation '{program}' exited with {output}")]
    Failed { program: String, output: String },
}

/// Something that can build and run a generated program to completion
pub trait Simulator {
    /// Working directory the simulator writes its traces into
    fn working_dir(&self) -> &Path;

    fn run(&mut self, script: &Path, program: &str, gdb: bool) -> Result<(), LaunchError>;
}

/// Runs programs through `./waf` in an ns-3 source tree
#[derive(Debug, Clone)]
pub struct WafSimulator {
    ns3_path: PathBuf,
}

impl WafSimulator {
    pub fn new(ns3_path: impl Into<PathBuf>) -> Self {
        Self {
            ns3_path: ns3_path.into(),
        }
    }

    /// Copy the script into `scratch/` so waf picks it up as a program.
    pub fn install_script(&self, script: &Path, program: &str) -> Result<PathBuf, LaunchError> {
        let dest = self.ns3_path.join("scratch").join(format!("{}.cc", program));
        fs::copy(script, &dest).map_err(|source| LaunchError::Copy {
            path: dest.display().to_string(),
            source,
        })?;
        Ok(dest)
    }
}

/// `./waf` arguments for a program, wrapped in gdb when requested
pub fn waf_args(program: &str, gdb: bool) -> Vec<String> {
    let mut args = vec!["--run".to_string(), program.to_string()];
    if gdb {
        args.push("--command-template=gdb --args %s".to_string());
    }
    args
}

impl Simulator for WafSimulator {
    fn working_dir(&self) -> &Path {
        &self.ns3_path
    }

    fn run(&mut self, script: &Path, program: &str, gdb: bool) -> Result<(), LaunchError> {
        self.install_script(script, program)?;

        let args = waf_args(program, gdb);
        let command = format!("./waf {}", args.join(" "));
        info!("Running simulation: {} (in {:?})", command, self.ns3_path);

        // Inherit stdio so the progress printer and gdb stay interactive
        let status = Command::new("./waf")
            .args(&args)
            .current_dir(&self.ns3_path)
            .status()
            .map_err(|source| LaunchError::Spawn {
                command: command.clone(),
                source,
            })?;
        if !status.success() {
            return Err(LaunchError::Failed {
                program: program.to_string(),
                output: status.to_string(),
            });
        }
        Ok(())
    }
}

/// Simulator that records its invocations instead of running anything
#[derive(Debug, Clone)]
pub struct RecordingSimulator {
    pub working_dir: PathBuf,
    pub runs: Vec<(PathBuf, String, bool)>,
    pub fail: bool,
}

impl RecordingSimulator {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            runs: Vec::new(),
            fail: false,
        }
    }
}

impl Simulator for RecordingSimulator {
    fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    fn run(&mut self, script: &Path, program: &str, gdb: bool) -> Result<(), LaunchError> {
        self.runs.push((script.to_path_buf(), program.to_string(), gdb));
        if self.fail {
            return Err(LaunchError::Failed {
                program: program.to_string(),
                output: "exit status: 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_waf_args() {
        assert_eq!(waf_args("demo", false), vec!["--run", "demo"]);
        assert_eq!(
            waf_args("demo", true),
            vec!["--run", "demo", "--command-template=gdb --args %s"]
        );
    }

    #[test]
    fn test_install_script_into_scratch() {
        let ns3 = TempDir::new().unwrap();
        fs::create_dir(ns3.path().join("scratch")).unwrap();
        let out = TempDir::new().unwrap();
        let script = out.path().join("demo.cc");
        fs::write(&script, "int main () {}\n").unwrap();

        let sim = WafSimulator::new(ns3.path());
        let dest = sim.install_script(&script, "demo").unwrap();
        assert_eq!(dest, ns3.path().join("scratch/demo.cc"));
        assert_eq!(fs::read_to_string(dest).unwrap(), "int main () {}\n");
    }

    #[test]
    fn test_install_script_without_scratch_dir_fails() {
        let ns3 = TempDir::new().unwrap();
        let sim = WafSimulator::new(ns3.path());
        let err = sim
            .install_script(Path::new("/nonexistent/demo.cc"), "demo")
            .unwrap_err();
        assert!(matches!(err, LaunchError::Copy { .. }));
    }
}
