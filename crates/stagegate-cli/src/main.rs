use clap::{Parser, Subcommand};

mod commands;
mod config;

use config::CliConfig;

#[derive(Parser)]
#[command(
    name = "stagegate",
    about = "Stagegate — staged-rollout decision engine",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Optional stagegate.toml supplying default paths.
    #[arg(short, long, default_value = "stagegate.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the rollout decision and print the chosen payload.
    ///
    /// Loads the node and peer fixtures, resolves the current and
    /// desired documents from the store, and runs the full check
    /// (retries, backoff, triggers) for this node.
    Check {
        /// Node fixture: JSON {"name": ..., "attributes": {...}}
        #[arg(long)]
        node: Option<String>,
        /// Peers fixture: JSON array of node objects
        #[arg(long)]
        peers: Option<String>,
        /// Document store root directory
        #[arg(long)]
        store: Option<String>,
        /// Rollout state name
        #[arg(long)]
        state: Option<String>,
    },
    /// Evaluate the desired document's conditions once and print the
    /// verdict and per-condition detail. No retries, no triggers.
    Evaluate {
        #[arg(long)]
        node: Option<String>,
        #[arg(long)]
        peers: Option<String>,
        #[arg(long)]
        store: Option<String>,
        #[arg(long)]
        state: Option<String>,
        /// Combinator operator: "and" or "or"
        #[arg(long, default_value = "or")]
        operator: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("stagegate=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = CliConfig::load_optional(std::path::Path::new(&cli.config))?;

    match cli.command {
        Commands::Check {
            node,
            peers,
            store,
            state,
        } => {
            let target = commands::check::resolve(&config, node, peers, store, state)?;
            commands::check::check(&target)
        }
        Commands::Evaluate {
            node,
            peers,
            store,
            state,
            operator,
        } => {
            let target = commands::check::resolve(&config, node, peers, store, state)?;
            commands::check::evaluate(&target, &operator)
        }
    }
}
