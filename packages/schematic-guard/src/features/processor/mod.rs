//! File Processing Orchestrator
//!
//! Load → sanitize → quarantine, wrapped in a bounded retry loop. The batch
//! `scan_all` entry point reuses the same per-file path.

mod batch;
mod schematic_processor;

pub use batch::{scan_all, ScanReport};
pub use schematic_processor::{ProcessOutcome, SchematicProcessor};
