use crate::output::print_json;
use actionchain_core::top::TopFile;
use actionchain_core::ActionChainGenerator;
use anyhow::Context;

pub fn run(
    generator: &ActionChainGenerator,
    chain: u64,
    action: u64,
    states: Vec<String>,
    json: bool,
) -> anyhow::Result<()> {
    let top = TopFile::for_all_targets(states);
    let reference = generator
        .generate_top(chain, action, &top)
        .with_context(|| format!("failed to write top file for action {action}"))?;
    if json {
        print_json(&serde_json::json!({ "ref": reference }))?;
    } else {
        println!("{reference}");
    }
    Ok(())
}
