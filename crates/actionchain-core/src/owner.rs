use serde::{Deserialize, Serialize};
use std::path::Path;

/// Assigns ownership of directories created for generated artifacts.
pub trait DirectoryOwner {
    fn assign(&self, dir: &Path) -> std::io::Result<()>;
}

/// Leaves ownership as created.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOwner;

impl DirectoryOwner for NoOwner {
    fn assign(&self, _dir: &Path) -> std::io::Result<()> {
        Ok(())
    }
}

/// The account the web and file-server processes run as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAccount {
    pub uid: u32,
    pub gid: u32,
}

impl DirectoryOwner for ServiceAccount {
    #[cfg(unix)]
    fn assign(&self, dir: &Path) -> std::io::Result<()> {
        std::os::unix::fs::chown(dir, Some(self.uid), Some(self.gid))
    }

    #[cfg(not(unix))]
    fn assign(&self, _dir: &Path) -> std::io::Result<()> {
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "directory ownership requires a unix platform",
        ))
    }
}
