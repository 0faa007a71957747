mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{clean::CleanArgs, config::ConfigSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "actionchain",
    about = "Generate and clean up chunked action chain state files",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (default: /etc/actionchain/config.yaml)
    #[arg(long, global = true, env = "ACTIONCHAIN_CONFIG")]
    config: Option<PathBuf>,

    /// States root, overrides the config file
    #[arg(long, global = true, env = "ACTIONCHAIN_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log at info level
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan a chain for one endpoint and write its chunk files
    Plan {
        /// Plan request (YAML: chain, endpoint, extra_filerefs, states)
        request: PathBuf,
    },

    /// Show how many chunks a plan request would produce, without writing
    Count { request: PathBuf },

    /// Remove a finished chunk (and the rest of the chain with --failed)
    Clean(CleanArgs),

    /// Remove all chunk files of an endpoint
    CleanEndpoint {
        #[arg(long)]
        minion: String,
        /// Restrict to one chain
        #[arg(long)]
        chain: Option<u64>,
        /// Endpoint inventory (YAML)
        #[arg(long)]
        inventory: PathBuf,
    },

    /// List the references a chunk file would delete
    Refs { artifact: PathBuf },

    /// Decode an action chain state id or agent result key
    Decode { state_id: String },

    /// Print the path of a chunk file
    Path {
        #[arg(long)]
        chain: u64,
        #[arg(long)]
        machine: String,
        #[arg(long)]
        chunk: u32,
    },

    /// Write a top file for a highstate action in a chain
    Top {
        #[arg(long)]
        chain: u64,
        #[arg(long)]
        action: u64,
        /// States applied to every target
        #[arg(required = true)]
        states: Vec<String>,
    },

    /// Inspect the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let json = cli.json;
    let generator = || {
        root::load_config(cli.config.as_deref(), cli.root.as_deref())
            .map(actionchain_core::ActionChainGenerator::new)
    };
    let result = match cli.command {
        Commands::Plan { request } => generator().and_then(|g| cmd::plan::run(&g, &request, json)),
        Commands::Count { request } => {
            generator().and_then(|g| cmd::plan::count(&g, &request, json))
        }
        Commands::Clean(args) => generator().and_then(|g| cmd::clean::run(&g, args, json)),
        Commands::CleanEndpoint {
            minion,
            chain,
            inventory,
        } => generator()
            .and_then(|g| cmd::clean::run_endpoint(&g, &minion, chain, &inventory, json)),
        Commands::Refs { artifact } => {
            generator().and_then(|g| cmd::inspect::refs(&g, &artifact, json))
        }
        Commands::Decode { state_id } => cmd::inspect::decode(&state_id, json),
        Commands::Path {
            chain,
            machine,
            chunk,
        } => generator().and_then(|g| cmd::inspect::path(&g, chain, &machine, chunk, json)),
        Commands::Top {
            chain,
            action,
            states,
        } => generator().and_then(|g| cmd::top::run(&g, chain, action, states, json)),
        Commands::Config { subcommand } => cmd::config::run(
            cli.config.as_deref(),
            cli.root.as_deref(),
            subcommand,
            json,
        ),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
