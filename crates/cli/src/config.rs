//! CLI configuration
//!
//! Read from `~/.tagkit/tagkit.toml` and `TAGKIT_` environment variables,
//! where `__` separates nested keys (`TAGKIT_PROBE__AUTO_RECONNECT=true`).
//! A missing file means defaults.

use std::path::{Path, PathBuf};

use eyre::OptionExt;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use tagkit_probe::ProbeConfig;

/// Name of the configuration file inside [`config_dir`]
pub const CONFIG_FILE: &str = "tagkit.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Key files used when a command is not given any
    pub key_files: Vec<PathBuf>,
    /// Retry and reconnect policy
    pub probe: ProbeConfig,
}

/// Returns the base config directory for tagkit
pub fn config_dir() -> eyre::Result<PathBuf> {
    #[allow(deprecated)]
    let home = std::env::home_dir().ok_or_eyre("home directory not found")?;
    Ok(home.join(".tagkit"))
}

fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("TAGKIT_").split("__"))
}

/// Load the configuration from `path`, or from the default location
pub fn load_config(path: Option<&Path>) -> eyre::Result<Config> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => config_dir()?.join(CONFIG_FILE),
    };
    Ok(figment(&path).extract()?)
}
