//! Anomaly notification port

/// Receives one plain-text line per handled anomaly
pub trait AnomalyNotifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Writes anomalies to the log under a dedicated target
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl AnomalyNotifier for LogNotifier {
    fn notify(&self, message: &str) {
        tracing::warn!(target: "schematic_guard::anomaly", "{}", message);
    }
}

/// Names the submitter and file only; the offending content is never included
pub fn anomaly_message(submitter: &str, file_name: &str) -> String {
    format!(
        "Found anomalous schematic by player '{}': {}",
        submitter, file_name
    )
}
