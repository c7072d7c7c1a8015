//! Deployment directory layout

use std::path::{Path, PathBuf};

/// Watched upload tree and quarantine area
///
/// ```text
/// <root>/schematics/uploaded/<submitter>/*.nbt
/// <root>/schematics/anomaly/<submitter>/<file name>
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardPaths {
    pub uploaded_dir: PathBuf,
    pub anomaly_dir: PathBuf,
}

impl GuardPaths {
    pub fn from_deployment_root(root: impl AsRef<Path>) -> Self {
        let schematics = root.as_ref().join("schematics");
        Self {
            uploaded_dir: schematics.join("uploaded"),
            anomaly_dir: schematics.join("anomaly"),
        }
    }
}
