//! Post-run artifact collection.
//!
//! The simulator drops its packet captures and NetAnim trace into its own
//! working directory. After a run they are moved into the topology's output
//! directory. Collection is best-effort: a file that cannot be moved is
//! logged and left where it is.

use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// NetAnim trace written by the generated program
pub const ANIMATION_FILE: &str = "animation.xml";

fn is_artifact(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "pcap")
        || path.file_name().map_or(false, |name| name == ANIMATION_FILE)
}

/// Move one file, falling back to copy-and-delete across filesystems.
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to)?;
    fs::remove_file(from)
}

/// Move `*.pcap` and `animation.xml` from `sim_dir` into `output_dir`.
///
/// Returns the destination paths of the files that were moved.
pub fn collect_artifacts(sim_dir: &Path, output_dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(sim_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot read simulator directory {:?}: {}", sim_dir, e);
            return Vec::new();
        }
    };

    let mut moved = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() || !is_artifact(&path) {
            continue;
        }
        let Some(name) = path.file_name() else {
            continue;
        };
        let dest = output_dir.join(name);
        match move_file(&path, &dest) {
            Ok(()) => moved.push(dest),
            Err(e) => warn!("Failed to move {:?} to {:?}: {}", path, output_dir, e),
        }
    }
    moved.sort();
    info!("Collected {} simulation artifacts into {:?}", moved.len(), output_dir);
    moved
}
