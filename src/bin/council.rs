//! Ambient CLI wiring: loads configuration, initializes structured logging,
//! builds a small roster, and runs one deliberation against the placeholder
//! provider. A real deployment would substitute a concrete `Provider` and a
//! persistence/transport layer; both are external collaborators here.

use std::sync::Arc;

use clap::Parser;
use llm_council::{Council, CouncilConfig, PlaceholderProvider, Registry, Role};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "council", about = "Run a multi-model deliberation")]
struct Args {
    /// The task to deliberate on.
    #[arg(short, long)]
    task: String,

    /// Optional path (without extension) to a config file layered over defaults.
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = CouncilConfig::load(args.config.as_deref())?;

    let mut registry = Registry::new();
    registry.add(Role::new("generalist", "You are a careful, concise assistant.", "placeholder-model"))?;
    registry.add(Role::new("skeptic", "You challenge assumptions and look for flaws.", "placeholder-model"))?;

    let provider = Arc::new(PlaceholderProvider);
    let council = Council::new(registry, provider, config)?;

    let output = council.deliberate(&args.task).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
