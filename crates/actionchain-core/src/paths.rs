use crate::error::{ActionChainError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const DEFAULT_STATES_ROOT: &str = "/srv/susemanager/salt";
pub const SALT_FS_PREFIX: &str = "salt://";

pub const ACTIONCHAIN_DIR: &str = "actionchains";
pub const ACTIONCHAIN_FILE_PREFIX: &str = "actionchain_";
pub const TOP_FILE_PREFIX: &str = "top_";
pub const SLS_EXT: &str = "sls";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn actionchains_dir(states_root: &Path) -> PathBuf {
    states_root.join(ACTIONCHAIN_DIR)
}

/// File name of one chunk artifact: `actionchain_<chain>_<machine>_<chunk>.sls`.
///
/// The remote agent and the scheduler recompute this name on their own, so it
/// must only ever depend on its three inputs.
pub fn chunk_file_name(chain_id: u64, machine_id: &str, chunk: u32) -> String {
    format!("{ACTIONCHAIN_FILE_PREFIX}{chain_id}_{machine_id}_{chunk}.{SLS_EXT}")
}

pub fn chunk_path(states_root: &Path, chain_id: u64, machine_id: &str, chunk: u32) -> PathBuf {
    actionchains_dir(states_root).join(chunk_file_name(chain_id, machine_id, chunk))
}

/// Reference to a chunk artifact relative to the states root.
pub fn chunk_ref(chain_id: u64, machine_id: &str, chunk: u32) -> String {
    format!(
        "{ACTIONCHAIN_DIR}/{}",
        chunk_file_name(chain_id, machine_id, chunk)
    )
}

/// Relative path of the top file used by a highstate action inside a chain.
pub fn top_path(chain_id: u64, action_id: u64) -> String {
    format!("{ACTIONCHAIN_DIR}/{TOP_FILE_PREFIX}{chain_id}_{action_id}.{SLS_EXT}")
}

/// Parse a chunk artifact file name back into `(chain_id, machine_id, chunk)`.
pub fn parse_chunk_file_name(name: &str) -> Option<(u64, &str, u32)> {
    let rest = name
        .strip_prefix(ACTIONCHAIN_FILE_PREFIX)?
        .strip_suffix(SLS_EXT)?
        .strip_suffix('.')?;
    let (head, chunk) = rest.rsplit_once('_')?;
    let (chain, machine) = head.split_once('_')?;
    if machine.is_empty() || !is_digits(chain) || !is_digits(chunk) {
        return None;
    }
    Some((chain.parse().ok()?, machine, chunk.parse().ok()?))
}

/// Whether `name` is a chunk artifact of `machine_id`, optionally restricted
/// to a single chain.
pub fn is_chunk_file_of(name: &str, chain_id: Option<u64>, machine_id: &str) -> bool {
    match parse_chunk_file_name(name) {
        Some((chain, machine, _)) => {
            machine == machine_id && chain_id.map_or(true, |wanted| wanted == chain)
        }
        None => false,
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

// ---------------------------------------------------------------------------
// Machine id validation
// ---------------------------------------------------------------------------

static MACHINE_ID_RE: OnceLock<Regex> = OnceLock::new();

fn machine_id_re() -> &'static Regex {
    MACHINE_ID_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9\-]*$").unwrap())
}

/// Machine ids end up in file names, so only a conservative alphabet is allowed.
pub fn validate_machine_id(machine_id: &str) -> Result<()> {
    if machine_id.len() > 128 || !machine_id_re().is_match(machine_id) {
        return Err(ActionChainError::InvalidMachineId(machine_id.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
