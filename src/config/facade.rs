//! Entry point for loading [`ClientConfig`] from all layers.

use std::path::{Path, PathBuf};

use config::{ConfigError, Environment, File};

use super::merge::merge_policy::builder_with_defaults;
use super::sources::{global_file, workspace_file};
use super::ClientConfig;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace.
    ///
    /// Precedence (lowest to highest): defaults, user-level file, workspace
    /// `config/config.toml`, workspace `config/{FOODSNAP_ENV}.toml`,
    /// `FOODSNAP__SECTION__KEY` environment variables.
    pub fn load(workspace_root: &Path) -> Result<ClientConfig, ConfigError> {
        let builder = builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        builder
            .add_source(env_source())
            .build()?
            .try_deserialize()
    }

    /// Load from one explicit file (plus defaults and environment)
    pub fn load_from_file(path: &Path) -> Result<ClientConfig, ConfigError> {
        builder_with_defaults()?
            .add_source(File::from(path.to_path_buf()))
            .add_source(env_source())
            .build()?
            .try_deserialize()
    }

    /// Built-in defaults only
    pub fn default() -> ClientConfig {
        ClientConfig::default()
    }

    pub fn xdg_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("FOODSNAP")
        .separator("__")
        .try_parsing(true)
}
