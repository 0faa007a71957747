use crate::output::{print_json, print_list};
use actionchain_core::paths;
use actionchain_core::scanner::ReferenceScanner;
use actionchain_core::state_id::ActionChainStateId;
use actionchain_core::ActionChainGenerator;
use std::path::Path;

pub fn refs(generator: &ActionChainGenerator, artifact: &Path, json: bool) -> anyhow::Result<()> {
    let refs = ReferenceScanner::from_config(generator.config()).find_file_refs_to_delete(artifact);
    if json {
        print_json(&refs)?;
    } else {
        print_list(&refs, "No deletable references.");
    }
    Ok(())
}

pub fn decode(state_id: &str, json: bool) -> anyhow::Result<()> {
    let id = ActionChainStateId::parse(state_id)
        .ok_or_else(|| anyhow::anyhow!("'{state_id}' is not an action chain state id"))?;
    if json {
        print_json(&id)?;
    } else {
        println!("chain:  {}", id.chain_id);
        println!("action: {}", id.action_id);
        println!("chunk:  {}", id.chunk);
    }
    Ok(())
}

pub fn path(
    generator: &ActionChainGenerator,
    chain: u64,
    machine: &str,
    chunk: u32,
    json: bool,
) -> anyhow::Result<()> {
    paths::validate_machine_id(machine)?;
    let file = generator.chunk_path(chain, machine, chunk);
    let reference = format!(
        "{}{}",
        paths::SALT_FS_PREFIX,
        paths::chunk_ref(chain, machine, chunk)
    );
    if json {
        print_json(&serde_json::json!({
            "path": file.display().to_string(),
            "ref": reference,
        }))?;
    } else {
        println!("{}", file.display());
        println!("{reference}");
    }
    Ok(())
}
