//! Workspace config files: config/config.toml, then config/{FOODSNAP_ENV}.toml

use std::path::{Path, PathBuf};

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File};
use tracing::debug;

const DEFAULT_ENV: &str = "development";

/// Candidate files in increasing precedence
pub fn workspace_config_paths(workspace_root: &Path) -> Vec<PathBuf> {
    let config_dir = workspace_root.join("config");
    let env_name = std::env::var("FOODSNAP_ENV")
        .ok()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_ENV.to_string());
    vec![
        config_dir.join("config.toml"),
        config_dir.join(format!("{}.toml", env_name)),
    ]
}

pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(workspace_config_paths(workspace_root)
        .into_iter()
        .filter(|path| path.exists())
        .fold(builder, |builder, path| {
            debug!(config_path = %path.display(), "Loading workspace configuration");
            builder.add_source(File::from(path).required(false))
        }))
}
