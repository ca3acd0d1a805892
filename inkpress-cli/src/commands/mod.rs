//! CLI command implementations.

pub mod build;
pub mod check;
pub mod init;
pub mod serve;

pub use build::{build_command, BuildOverrides};
pub use check::check_site;
pub use init::init_project;
pub use serve::serve_site;

use anyhow::{Context, Result};
use inkpress_core::Config;
use std::path::Path;

/// Load the config at `config_path`, falling back to `inkpress.yaml` next to
/// it when the path does not exist.
pub fn load_config(config_path: &Path) -> Result<Config> {
    let path = if config_path.exists() {
        config_path.to_path_buf()
    } else {
        let dir = config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        Config::discover(dir).unwrap_or_else(|| config_path.to_path_buf())
    };

    tracing::info!("Loading config from {:?}", path);
    Config::from_file(&path).with_context(|| format!("Failed to load configuration {:?}", path))
}
