use std::env;
use std::path::PathBuf;

use tileworld::{run_shell, ShellConfig, Topology};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const MAP_FOLDER_ENV_VAR: &str = "TILEWORLD_MAP";
const TOPOLOGY_ENV_VAR: &str = "TILEWORLD_TOPOLOGY";

fn main() {
    init_tracing();
    info!("=== Tileworld Viewer Startup ===");

    let config = ShellConfig {
        map_folder: resolve_map_folder(),
        topology: resolve_topology(),
        ..ShellConfig::default()
    };

    if let Err(err) = run_shell(config) {
        error!(error = %err, "startup_failed");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

/// First CLI argument wins, then the env var, then the default folder.
fn resolve_map_folder() -> PathBuf {
    if let Some(arg) = env::args().nth(1) {
        return PathBuf::from(arg);
    }
    env::var(MAP_FOLDER_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| ShellConfig::default().map_folder)
}

fn resolve_topology() -> Topology {
    match env::var(TOPOLOGY_ENV_VAR).as_deref() {
        Ok("bounded") => Topology::Bounded,
        _ => Topology::Toroidal,
    }
}
