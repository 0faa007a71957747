use crate::output::{print_json, print_table};
use actionchain_core::declaration::StateDeclaration;
use actionchain_core::endpoint::Endpoint;
use actionchain_core::types::ActionChain;
use actionchain_core::ActionChainGenerator;
use anyhow::Context;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Input of `plan` and `count`: one chain, one endpoint and its declarations.
#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    pub chain: ActionChain,
    pub endpoint: Endpoint,
    #[serde(default)]
    pub extra_filerefs: Option<String>,
    #[serde(default)]
    pub states: Vec<StateDeclaration>,
}

impl PlanRequest {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_yaml::from_str(&data).with_context(|| format!("invalid plan request {}", path.display()))
    }
}

pub fn run(generator: &ActionChainGenerator, request: &Path, json: bool) -> anyhow::Result<()> {
    let req = PlanRequest::load(request)?;
    let counts = generator
        .create_chain_files(
            &req.chain,
            &req.endpoint,
            req.states,
            req.extra_filerefs.as_deref(),
        )
        .with_context(|| {
            format!(
                "failed to generate chain {} for '{}'",
                req.chain.id, req.endpoint.minion_id
            )
        })?;

    if json {
        let files: Vec<String> = (1..=counts.values().sum::<usize>() as u32)
            .map(|n| {
                generator
                    .chunk_path(req.chain.id, &req.endpoint.machine_id, n)
                    .display()
                    .to_string()
            })
            .collect();
        print_json(&serde_json::json!({
            "chain": req.chain.id,
            "label": req.chain.label,
            "chunks": counts,
            "files": files,
        }))?;
    } else {
        print_counts(&counts);
    }
    Ok(())
}

pub fn count(generator: &ActionChainGenerator, request: &Path, json: bool) -> anyhow::Result<()> {
    let req = PlanRequest::load(request)?;
    let counts = generator
        .chunks_per_endpoint(&req.chain, &[(req.endpoint, req.states)])
        .context("failed to plan chain")?;

    if json {
        print_json(&counts)?;
    } else {
        print_counts(&counts);
    }
    Ok(())
}

fn print_counts(counts: &BTreeMap<String, usize>) {
    let rows: Vec<Vec<String>> = counts
        .iter()
        .map(|(minion, n)| vec![minion.clone(), n.to_string()])
        .collect();
    print_table(&["MINION", "CHUNKS"], &rows);
}
