use crate::output::print_json;
use crate::root;
use actionchain_core::config::Config;
use anyhow::Context;
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Write a config file with the built-in defaults
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration
    Show,
    /// Report configuration problems
    Validate,
}

pub fn run(
    config_path: Option<&Path>,
    states_root: Option<&Path>,
    subcmd: ConfigSubcommand,
    json: bool,
) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Init { force } => init(config_path, states_root, force, json),
        ConfigSubcommand::Show => show(&root::load_config(config_path, states_root)?, json),
        ConfigSubcommand::Validate => {
            validate(&root::load_config(config_path, states_root)?, json)
        }
    }
}

// ---------------------------------------------------------------------------
// config init
// ---------------------------------------------------------------------------

fn init(
    config_path: Option<&Path>,
    states_root: Option<&Path>,
    force: bool,
    json: bool,
) -> anyhow::Result<()> {
    let path = config_path.unwrap_or(Path::new(root::DEFAULT_CONFIG_PATH));
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let config = match states_root {
        Some(dir) => Config::default().with_states_root(dir),
        None => Config::default(),
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        actionchain_core::io::ensure_dir(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    config
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;

    if json {
        print_json(&serde_json::json!({ "path": path.display().to_string() }))?;
    } else {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// config show
// ---------------------------------------------------------------------------

fn show(config: &Config, json: bool) -> anyhow::Result<()> {
    if json {
        print_json(config)?;
    } else {
        print!("{}", serde_yaml::to_string(config)?);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// config validate
// ---------------------------------------------------------------------------

fn validate(config: &Config, json: bool) -> anyhow::Result<()> {
    let warnings = config.validate();
    if json {
        print_json(&serde_json::json!({
            "valid": warnings.is_empty(),
            "warnings": warnings,
        }))?;
    } else if warnings.is_empty() {
        println!("Config OK");
    } else {
        for w in &warnings {
            println!("warning: {}", w.message);
        }
    }
    Ok(())
}
