use crate::error::{ActionChainError, Result};
use crate::owner::{DirectoryOwner, NoOwner, ServiceAccount};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub message: String,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_states_root")]
    pub states_root: PathBuf,
    /// Leave ownership of the generated directory alone.
    #[serde(default)]
    pub skip_set_owner: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<ServiceAccount>,
    /// Top files shared by every endpoint; never deleted during cleanup.
    #[serde(default = "default_permanent_tops")]
    pub permanent_tops: Vec<String>,
    /// State trees shipped with the server; never deleted during cleanup.
    #[serde(default = "default_permanent_states")]
    pub permanent_states: Vec<String>,
}

fn default_states_root() -> PathBuf {
    PathBuf::from(paths::DEFAULT_STATES_ROOT)
}

fn default_permanent_tops() -> Vec<String> {
    vec!["top.sls".to_string()]
}

fn default_permanent_states() -> Vec<String> {
    [
        "bootloader",
        "certs",
        "channels",
        "custom",
        "distupgrade",
        "hardware",
        "images",
        "packages",
        "remotecommands",
        "services",
        "util",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            states_root: default_states_root(),
            skip_set_owner: false,
            owner: None,
            permanent_tops: default_permanent_tops(),
            permanent_states: default_permanent_states(),
        }
    }
}

impl Config {
    pub fn with_states_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.states_root = root.into();
        self
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        if cfg.states_root.as_os_str().is_empty() {
            return Err(ActionChainError::InvalidConfig(
                "states_root must not be empty".to_string(),
            ));
        }
        Ok(cfg)
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    /// Ownership capability applied to directories created under the root.
    pub fn directory_owner(&self) -> Box<dyn DirectoryOwner + Send + Sync> {
        match (&self.owner, self.skip_set_owner) {
            (Some(account), false) => Box::new(*account),
            _ => Box::new(NoOwner),
        }
    }

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        if self.states_root.is_relative() {
            warnings.push(ConfigWarning {
                message: format!(
                    "states_root '{}' is relative; the agent resolves references against an absolute root",
                    self.states_root.display()
                ),
            });
        }
        if !self.skip_set_owner && self.owner.is_none() {
            warnings.push(ConfigWarning {
                message: "no owner configured; generated directories keep the process owner"
                    .to_string(),
            });
        }
        for entry in self.permanent_tops.iter().chain(&self.permanent_states) {
            if entry.is_empty() {
                warnings.push(ConfigWarning {
                    message: "empty permanent entry protects every reference".to_string(),
                });
            }
        }
        warnings
    }
}
