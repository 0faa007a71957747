use actionchain_core::config::Config;
use anyhow::Context;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/actionchain/config.yaml";

/// Resolve the effective configuration.
///
/// Priority:
/// 1. `--config` flag / `ACTIONCHAIN_CONFIG` env var; the file must exist
/// 2. `/etc/actionchain/config.yaml` if present
/// 3. Built-in defaults
///
/// `--root` / `ACTIONCHAIN_ROOT` then overrides the states root.
pub fn load_config(explicit: Option<&Path>, root: Option<&Path>) -> anyhow::Result<Config> {
    let config = match explicit {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => {
            let path = PathBuf::from(DEFAULT_CONFIG_PATH);
            Config::load_or_default(&path)
                .with_context(|| format!("failed to load config {}", path.display()))?
        }
    };
    Ok(match root {
        Some(root) => config.with_states_root(root),
        None => config,
    })
}
