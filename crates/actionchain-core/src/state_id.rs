//! Encoding of `(chain, action, chunk)` into declaration ids.
//!
//! Ids have the form `mgr_actionchain_<chain>_action_<action>_chunk_<chunk>`.
//! The agent reports results keyed by `<module>_|-<id>_|-<name>_|-<fn>`, so
//! decoding accepts the id either bare or embedded after a `|-` separator.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

pub const STATE_ID_PREFIX: &str = "mgr_actionchain_";
pub const STATE_ID_ACTION_MARKER: &str = "_action_";
pub const STATE_ID_CHUNK_MARKER: &str = "_chunk_";

static STATE_ID_RE: OnceLock<Regex> = OnceLock::new();

fn state_id_re() -> &'static Regex {
    STATE_ID_RE.get_or_init(|| {
        Regex::new(r"(?:^|\|-)mgr_actionchain_(\d+)_action_(\d+)_chunk_(\d+)").unwrap()
    })
}

/// Id of the declaration generated for `action_id` within `chain_id`.
/// The planner appends the chunk suffix.
pub fn create_state_id(chain_id: u64, action_id: u64) -> String {
    format!("{STATE_ID_PREFIX}{chain_id}{STATE_ID_ACTION_MARKER}{action_id}")
}

/// Suffix appended to identifiable declaration ids placed in `chunk`.
pub fn chunk_suffix(chunk: u32) -> String {
    format!("{STATE_ID_CHUNK_MARKER}{chunk}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionChainStateId {
    pub chain_id: u64,
    pub action_id: u64,
    pub chunk: u32,
}

impl ActionChainStateId {
    pub fn new(chain_id: u64, action_id: u64, chunk: u32) -> Self {
        Self {
            chain_id,
            action_id,
            chunk,
        }
    }

    /// Decode an id or an agent result key.
    ///
    /// Returns `None` for anything that is not an action-chain state id,
    /// including ids whose numbers do not fit.
    pub fn parse(state_id: &str) -> Option<Self> {
        let caps = state_id_re().captures(state_id)?;
        let parsed = (|| {
            Some(Self::new(
                caps[1].parse().ok()?,
                caps[2].parse().ok()?,
                caps[3].parse().ok()?,
            ))
        })();
        if parsed.is_none() {
            tracing::warn!(state_id, "action chain state id out of range");
        }
        parsed
    }
}

impl fmt::Display for ActionChainStateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            create_state_id(self.chain_id, self.action_id),
            chunk_suffix(self.chunk)
        )
    }
}
