//! Declarations synthesized by the planner to stitch chunks together.

use crate::declaration::{ModuleRun, RequisiteRef, StateDeclaration};

/// Agent-side function that schedules the next chunk of a chain.
pub const ADVANCE_CHAIN_FN: &str = "mgractionchains.next";
/// Agent-side function that drops the rest of a chain after a failure.
pub const ABORT_IF_FAILED_FN: &str = "mgractionchains.clean";

pub const CONTINUATION_ID: &str = "schedule_next_chunk";
pub const FAILURE_GUARD_ID: &str = "clean_action_chain_if_previous_failed";

/// Marker of the argument carrying the file bundle shared by the whole chain.
pub const EXTRA_FILEREFS_ARG: &str = "ssh_extra_filerefs";

/// Parameters of one continuation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Continuation<'a> {
    pub chain_id: u64,
    pub next_chunk: u32,
    pub next_action_id: Option<u64>,
    pub extra_filerefs: Option<&'a str>,
}

/// Schedules `next_chunk`; runs only if `after` succeeded.
pub fn continuation(params: &Continuation<'_>, after: Option<RequisiteRef>) -> StateDeclaration {
    let mut run = ModuleRun::new(CONTINUATION_ID, ADVANCE_CHAIN_FN)
        .with_arg("actionchain_id", params.chain_id)
        .with_arg("chunk", params.next_chunk);
    if let Some(action_id) = params.next_action_id {
        run = run.with_arg("next_action_id", action_id);
    }
    if let Some(refs) = params.extra_filerefs {
        run = run.with_arg(EXTRA_FILEREFS_ARG, refs);
    }
    if let Some(target) = after {
        run.requisites.add_require(target);
    }
    run.into()
}

/// Cleans up the chain on the agent if `watched` failed.
pub fn failure_guard(watched: Option<RequisiteRef>) -> StateDeclaration {
    let mut run = ModuleRun::new(FAILURE_GUARD_ID, ABORT_IF_FAILED_FN);
    if let Some(target) = watched {
        run.requisites.add_onfail(target);
    }
    run.into()
}
