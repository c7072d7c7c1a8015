//! Schematic Guard CLI
//!
//! # Usage
//!
//! ```bash
//! # Watch a deployment's upload directory until Ctrl-C
//! schematic-guard watch --root /srv/server --config guard.yaml
//!
//! # One-shot scan of everything already uploaded
//! schematic-guard scan-all --root /srv/server --json
//! ```

use clap::{Parser, Subcommand};
use schematic_guard::telemetry::{init_subscriber, Verbosity};
use schematic_guard::{
    build_processor, scan_all, ConfigHandle, GuardConfig, GuardPaths, LogNotifier,
    SchematicGuard, SerialExecutor,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tracing::{info, warn};

const HOST_POLL: Duration = Duration::from_millis(200);

#[derive(Parser)]
#[command(name = "schematic-guard")]
#[command(about = "Sanitizes uploaded schematic files and quarantines anomalies", long_about = None)]
struct Cli {
    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Warnings and errors only
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the upload directory until interrupted
    Watch {
        /// Deployment root (contains schematics/uploaded)
        #[arg(short, long)]
        root: PathBuf,

        /// YAML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// How often to check the config file for changes
        #[arg(long, default_value = "5")]
        reload_secs: u64,
    },

    /// Scan every uploaded schematic once
    ScanAll {
        /// Deployment root (contains schematics/uploaded)
        #[arg(short, long)]
        root: PathBuf,

        /// YAML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_subscriber(Verbosity::from_flags(cli.verbose, cli.quiet));

    match cli.command {
        Commands::Watch {
            root,
            config,
            reload_secs,
        } => run_watch(root, config, Duration::from_secs(reload_secs.max(1)))?,
        Commands::ScanAll { root, config, json } => run_scan_all(root, config, json)?,
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<GuardConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let config = GuardConfig::from_yaml(path)?;
            info!("Loaded config from {}", path.display());
            Ok(config)
        }
        None => Ok(GuardConfig::default()),
    }
}

fn modified_at(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn run_watch(
    root: PathBuf,
    config_path: Option<PathBuf>,
    reload_every: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Arc::new(ConfigHandle::new(load_config(config_path.as_deref())?));
    let paths = GuardPaths::from_deployment_root(&root);

    let (executor, host_loop) = SerialExecutor::new();
    let executor = Arc::new(executor);
    let mut guard = SchematicGuard::start(
        paths,
        config.clone(),
        executor.clone(),
        Arc::new(LogNotifier),
    )?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    ctrlc::set_handler(move || {
        info!("Received Ctrl+C, shutting down...");
        flag.store(true, Ordering::SeqCst);
    })?;

    let mut last_check = Instant::now();
    let mut last_modified = config_path.as_deref().and_then(modified_at);

    // Processing runs here, on the main thread, in submission order
    while !shutdown.load(Ordering::SeqCst) && guard.is_running() {
        if host_loop.run_for(HOST_POLL).is_none() {
            break;
        }

        let Some(path) = config_path.as_deref() else {
            continue;
        };
        if last_check.elapsed() < reload_every {
            continue;
        }
        last_check = Instant::now();

        let modified = modified_at(path);
        if modified != last_modified {
            last_modified = modified;
            if let Err(e) = config.reload_from_yaml(path) {
                warn!("Keeping previous config, reload failed: {}", e);
            }
        }
    }

    guard.stop();
    executor.close();
    let drained = host_loop.run_pending();
    if drained > 0 {
        info!("Finished {} queued file(s) before exit", drained);
    }
    Ok(())
}

fn run_scan_all(
    root: PathBuf,
    config_path: Option<PathBuf>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Arc::new(ConfigHandle::new(load_config(config_path.as_deref())?));
    let paths = GuardPaths::from_deployment_root(&root);
    let extension = config.snapshot().document_extension.clone();

    let processor = build_processor(&paths, &config, Arc::new(LogNotifier));
    let report = scan_all(&paths.uploaded_dir, &extension, &processor)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report);
    }
    Ok(())
}
