//! One-shot scan over the whole uploaded tree

use super::schematic_processor::SchematicProcessor;
use crate::errors::{GuardError, Result};
use serde::Serialize;
use std::fmt;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Totals for one batch scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub scanned: usize,
    pub anomalies: usize,
}

impl fmt::Display for ScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Scanned {} schematics, found {} anomalies",
            self.scanned, self.anomalies
        )
    }
}

/// Process every `*.<extension>` regular file under `uploaded_dir`,
/// synchronously, with the parent folder name as the submitter.
///
/// Unreadable entries below the root are skipped; a missing root is an error.
pub fn scan_all(
    uploaded_dir: &Path,
    extension: &str,
    processor: &SchematicProcessor,
) -> Result<ScanReport> {
    if !uploaded_dir.is_dir() {
        return Err(GuardError::io(
            format!("scan {}", uploaded_dir.display()),
            io::Error::new(
                io::ErrorKind::NotFound,
                "uploaded schematics directory not found",
            ),
        ));
    }

    let mut report = ScanReport::default();
    for entry in WalkDir::new(uploaded_dir) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("Skipping unreadable entry during scan: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }
        let Some(submitter) = path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
        else {
            continue;
        };

        if processor.process_file(path, &submitter).is_anomaly() {
            report.anomalies += 1;
        }
        report.scanned += 1;
    }

    tracing::info!("{}", report);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_display() {
        let report = ScanReport {
            scanned: 4,
            anomalies: 1,
        };
        assert_eq!(report.to_string(), "Scanned 4 schematics, found 1 anomalies");
    }

    #[test]
    fn test_report_serializes_counts() {
        let json = serde_json::to_string(&ScanReport {
            scanned: 2,
            anomalies: 0,
        })
        .unwrap();
        assert_eq!(json, r#"{"scanned":2,"anomalies":0}"#);
    }
}
