use crate::output::{print_json, print_list};
use actionchain_core::endpoint::{EndpointLookup, Inventory};
use actionchain_core::ActionChainGenerator;
use anyhow::Context;
use clap::Args;
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct CleanArgs {
    #[arg(long)]
    pub chain: u64,
    #[arg(long)]
    pub minion: String,
    /// Chunk that just finished
    #[arg(long)]
    pub chunk: u32,
    /// The chunk failed; drop the rest of the chain as well
    #[arg(long)]
    pub failed: bool,
    /// Endpoint inventory (YAML)
    #[arg(long)]
    pub inventory: PathBuf,
}

fn load_inventory(path: &Path) -> anyhow::Result<Inventory> {
    Inventory::load(path).with_context(|| format!("failed to load inventory {}", path.display()))
}

pub fn run(generator: &ActionChainGenerator, args: CleanArgs, json: bool) -> anyhow::Result<()> {
    let inventory = load_inventory(&args.inventory)?;
    let deleted = generator.remove_chain_files(
        args.chain,
        &args.minion,
        args.chunk,
        args.failed,
        &inventory,
    );
    report(&deleted, json)
}

pub fn run_endpoint(
    generator: &ActionChainGenerator,
    minion: &str,
    chain: Option<u64>,
    inventory: &Path,
    json: bool,
) -> anyhow::Result<()> {
    let inventory = load_inventory(inventory)?;
    let endpoint = inventory
        .find_by_minion_id(minion)
        .with_context(|| format!("minion '{minion}' not in inventory"))?;
    let deleted = generator.remove_endpoint_files(&endpoint, chain);
    report(&deleted, json)
}

fn report(deleted: &[PathBuf], json: bool) -> anyhow::Result<()> {
    if json {
        let paths: Vec<String> = deleted.iter().map(|p| p.display().to_string()).collect();
        print_json(&serde_json::json!({ "deleted": paths }))?;
    } else {
        let lines: Vec<String> = deleted
            .iter()
            .map(|p| format!("deleted {}", p.display()))
            .collect();
        print_list(&lines, "Nothing to delete.");
    }
    Ok(())
}
