//! Splits an endpoint's declarations into independently dispatched chunks.
//!
//! A chunk ends after any declaration that takes the agent away: a reboot, or
//! an upgrade of the agent package itself. Each closed chunk that has a
//! successor ends with a continuation that schedules it.
//!
//! Agent upgrades produce three chunks:
//!
//! ```text
//! chunk n    ... previous declarations, continuation(n + 1)
//! chunk n+1  upgrade, failure guard (onfail: upgrade)
//! chunk n+2  post-upgrade verification, ... remaining declarations
//! ```
//!
//! The agent running chunk n+1 is replaced while it runs, so it cannot report
//! the outcome of the upgrade. The verification chunk re-applies the same
//! package or patch set through an idempotent state once the new agent is up.

use crate::control::{self, Continuation};
use crate::declaration::{ModuleRun, PatchInstalled, PkgInstalled, RequisiteRef, StateDeclaration};
use crate::endpoint::Endpoint;
use crate::error::{ActionChainError, Result};
use crate::state_id::chunk_suffix;
use serde_yaml::Value;

pub const PKGINSTALL_STATE: &str = "packages.pkginstall";
pub const PATCHINSTALL_STATE: &str = "packages.patchinstall";
pub const REBOOT_FN: &str = "system.reboot";

pub const PARAM_PKGS: &str = "param_pkgs";
pub const PARAM_UPDATE_STACK_PATCHES: &str = "param_update_stack_patches";
pub const PARAM_REGULAR_PATCHES: &str = "param_regular_patches";
pub const PARAM_INCLUDE_AGENT_UPGRADE: &str = "include_salt_upgrade";

/// Package name of the agent.
pub const AGENT_PACKAGE: &str = "salt";

pub const POST_UPGRADE_PKGS_ID: &str = "mgr_post_upgrade_pkgs_installed";
pub const POST_UPGRADE_PATCHES_ID: &str = "mgr_post_upgrade_patches_installed";

pub type Chunk = Vec<StateDeclaration>;

// ---------------------------------------------------------------------------
// Split rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    None,
    /// The declaration ends its chunk.
    Plain,
    /// The declaration replaces the agent and runs in a chunk of its own.
    AgentUpgrade,
}

/// Decide whether `state` forces a chunk boundary on `endpoint`.
pub fn must_split(state: &StateDeclaration, endpoint: &Endpoint) -> Split {
    match state {
        StateDeclaration::ModuleRun(run) => {
            if run.applies_mod(PKGINSTALL_STATE) && installs_agent(run) {
                // Push-mode endpoints have no resident agent to replace.
                if !endpoint.is_push_mode() {
                    return Split::AgentUpgrade;
                }
            } else if run.applies_mod(PATCHINSTALL_STATE) && includes_agent_upgrade(run) {
                return Split::AgentUpgrade;
            }
            if run.name == REBOOT_FN {
                Split::Plain
            } else {
                Split::None
            }
        }
        StateDeclaration::SystemReboot(_) => Split::Plain,
        _ => Split::None,
    }
}

fn installs_agent(run: &ModuleRun) -> bool {
    run.pillar()
        .and_then(|p| p.get(PARAM_PKGS))
        .and_then(Value::as_mapping)
        .is_some_and(|pkgs| pkgs.contains_key(AGENT_PACKAGE))
}

fn includes_agent_upgrade(run: &ModuleRun) -> bool {
    run.pillar()
        .and_then(|p| p.get(PARAM_INCLUDE_AGENT_UPGRADE))
        .is_some_and(|flag| !matches!(flag, Value::Bool(false) | Value::Null))
}

/// Re-express an agent upgrade as an idempotent install of the same set.
pub fn post_upgrade_verification(state: &StateDeclaration) -> Result<StateDeclaration> {
    let malformed = |reason: &str| ActionChainError::MalformedDeclaration {
        id: state.id().to_string(),
        reason: reason.to_string(),
    };
    let run = state
        .as_module_run()
        .ok_or_else(|| malformed("agent upgrade must be a module invocation"))?;
    let pillar = run
        .pillar()
        .ok_or_else(|| malformed("agent upgrade without pillar"))?;

    if run.applies_mod(PKGINSTALL_STATE) {
        let pkgs = pillar
            .get(PARAM_PKGS)
            .and_then(Value::as_mapping)
            .ok_or_else(|| malformed("package install without param_pkgs"))?;
        let mut installed = PkgInstalled::new(POST_UPGRADE_PKGS_ID);
        for (name, version) in pkgs {
            let name = scalar_to_string(name).ok_or_else(|| malformed("non-scalar package name"))?;
            installed.add_package(name, scalar_to_string(version).unwrap_or_default());
        }
        Ok(installed.into())
    } else if run.applies_mod(PATCHINSTALL_STATE) {
        let mut installed = PatchInstalled::new(POST_UPGRADE_PATCHES_ID);
        for key in [PARAM_UPDATE_STACK_PATCHES, PARAM_REGULAR_PATCHES] {
            let patches = pillar.get(key).and_then(Value::as_sequence);
            for patch in patches.into_iter().flatten().filter_map(scalar_to_string) {
                installed.add_patch(patch);
            }
        }
        Ok(installed.into())
    } else {
        Err(malformed("not a package or patch install"))
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// ChunkPlanner
// ---------------------------------------------------------------------------

/// Plans the chunks of one chain on one endpoint. Planning is pure: nothing
/// is written, so a malformed declaration aborts before any artifact exists.
#[derive(Debug, Clone)]
pub struct ChunkPlanner<'a> {
    chain_id: u64,
    endpoint: &'a Endpoint,
    extra_filerefs: Option<&'a str>,
}

impl<'a> ChunkPlanner<'a> {
    pub fn new(chain_id: u64, endpoint: &'a Endpoint) -> Self {
        Self {
            chain_id,
            endpoint,
            extra_filerefs: None,
        }
    }

    /// Files bundled for the whole chain, passed along with every continuation.
    pub fn with_extra_filerefs(mut self, refs: Option<&'a str>) -> Self {
        self.extra_filerefs = refs;
        self
    }

    /// Split `states` into chunks; chunk `i` of the result is chunk number `i + 1`.
    pub fn plan(&self, states: Vec<StateDeclaration>) -> Result<Vec<Chunk>> {
        let next_action_ids: Vec<Option<u64>> = (0..states.len())
            .map(|i| states.get(i + 1).and_then(StateDeclaration::action_id))
            .collect();
        let total = states.len();

        let mut chunks: Vec<Chunk> = Vec::new();
        let mut current: Chunk = Vec::new();
        let mut chunk: u32 = 1;

        for (i, state) in states.into_iter().enumerate() {
            let has_more = i + 1 < total;
            match must_split(&state, self.endpoint) {
                Split::None => place(&mut current, state, chunk)?,
                Split::Plain => {
                    place(&mut current, state, chunk)?;
                    if has_more {
                        let after = last_ref(&current)?;
                        current.push(self.continuation(chunk + 1, next_action_ids[i], after));
                    }
                    chunks.push(std::mem::take(&mut current));
                    chunk += 1;
                }
                Split::AgentUpgrade => {
                    let verification = post_upgrade_verification(&state)?;
                    if !current.is_empty() {
                        let after = last_ref(&current)?;
                        current.push(self.continuation(chunk + 1, state.action_id(), after));
                        chunks.push(std::mem::take(&mut current));
                        chunk += 1;
                    }
                    // The verification chunk is scheduled before the agent is replaced.
                    current.push(self.continuation(chunk + 1, next_action_ids[i], None));
                    place(&mut current, state, chunk)?;
                    let watched = last_ref(&current)?;
                    current.push(control::failure_guard(watched));
                    chunks.push(std::mem::take(&mut current));
                    chunk += 1;
                    current.push(verification);
                }
            }
        }
        if !current.is_empty() {
            chunks.push(current);
        }
        Ok(chunks)
    }

    fn continuation(
        &self,
        next_chunk: u32,
        next_action_id: Option<u64>,
        after: Option<RequisiteRef>,
    ) -> StateDeclaration {
        let params = Continuation {
            chain_id: self.chain_id,
            next_chunk,
            next_action_id,
            extra_filerefs: self.extra_filerefs,
        };
        control::continuation(&params, after)
    }
}

/// Append `state` to `chunk`, requiring the declaration placed before it.
fn place(chunk: &mut Chunk, mut state: StateDeclaration, number: u32) -> Result<()> {
    if state.supports_requisites() {
        if let Some(target) = last_ref(chunk)? {
            if let Some(requisites) = state.requisites_mut() {
                requisites.add_require(target);
            }
        }
    }
    tag(&mut state, number);
    chunk.push(state);
    Ok(())
}

fn tag(state: &mut StateDeclaration, number: u32) {
    if let Some(id) = state.id_mut() {
        id.push_str(&chunk_suffix(number));
    }
}

fn last_ref(chunk: &[StateDeclaration]) -> Result<Option<RequisiteRef>> {
    chunk.last().map(StateDeclaration::requisite_ref).transpose()
}
