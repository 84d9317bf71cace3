use crate::topology::Topology;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory name the settings lookup climbs back to from a subdirectory
pub const PROJECT_ROOT_DIR: &str = "ns3-lxc";

/// Settings file name
pub const SETTINGS_FILE: &str = "settings.yaml";

/// Topology tag that overrides the configured run time, in seconds
pub const TAG_TIME: &str = "time";

/// Settings loading errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to read settings file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid settings file {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },

    #[error("Invalid settings: {0}")]
    Invalid(String),

    #[error("Topology {topology} has time tag {value}, expected a positive number of seconds")]
    InvalidTimeTag { topology: String, value: String },
}

/// Read-only settings for a run, mirroring `settings.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Directory that receives one output directory per topology
    #[serde(default = "default_output_dest")]
    pub output_dest: PathBuf,
    /// ns-3 source tree the generated program is built and run from
    #[serde(default)]
    pub ns3_path: Option<PathBuf>,
    /// Type given to nodes whose description names none
    #[serde(default = "default_node_type")]
    pub node_type: String,
    /// Simulated run time when the topology has no `time` tag (e.g. "10m")
    #[serde(default = "default_run_time", with = "humantime_serde")]
    pub run_time: Duration,
}

fn default_output_dest() -> PathBuf {
    PathBuf::from("output")
}

fn default_node_type() -> String {
    "lxc".to_string()
}

fn default_run_time() -> Duration {
    Duration::from_secs(600)
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dest: default_output_dest(),
            ns3_path: None,
            node_type: default_node_type(),
            run_time: default_run_time(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.node_type.is_empty() {
            return Err(SettingsError::Invalid("node_type cannot be empty".to_string()));
        }
        if self.run_time.is_zero() {
            return Err(SettingsError::Invalid("run_time must be greater than zero".to_string()));
        }
        Ok(())
    }

    /// Run time in seconds, taken from the topology's `time` tag when it has
    /// one. A tag that is not a positive number is an error, never ignored.
    pub fn run_time_secs(&self, top: &Topology) -> Result<f64, SettingsError> {
        let Some(tag) = top.tags.get(TAG_TIME) else {
            return Ok(self.run_time.as_secs_f64());
        };
        let secs = match tag {
            serde_yaml::Value::Number(n) => n.as_f64(),
            serde_yaml::Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match secs {
            Some(secs) if secs.is_finite() && secs > 0.0 => Ok(secs),
            _ => Err(SettingsError::InvalidTimeTag {
                topology: top.name.clone(),
                value: format!("{:?}", tag),
            }),
        }
    }

    /// `<output_dest>/<topology name>`
    pub fn topology_output_dir(&self, topology_name: &str) -> PathBuf {
        self.output_dest.join(topology_name)
    }
}

/// Find the settings file for a working directory: the one at the project
/// root if `cwd` lies inside an `ns3-lxc` checkout, `settings.yaml` in the
/// working directory otherwise.
pub fn locate_settings(cwd: &Path) -> PathBuf {
    let root = cwd
        .ancestors()
        .find(|dir| dir.file_name().map_or(false, |name| name == PROJECT_ROOT_DIR));
    match root {
        Some(root) => root.join(SETTINGS_FILE),
        None => PathBuf::from(SETTINGS_FILE),
    }
}

/// Load settings from a YAML file; a missing file yields the defaults.
pub fn load_settings(path: &Path) -> Result<Settings, SettingsError> {
    if !path.exists() {
        warn!("Settings file {:?} not found, using defaults", path);
        return Ok(Settings::default());
    }
    info!("Loading settings from: {:?}", path);

    let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let settings: Settings = serde_yaml::from_str(&content).map_err(|source| SettingsError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    settings.validate()?;
    Ok(settings)
}
