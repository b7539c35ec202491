use anyhow::Context;
use clap::Parser;
use polly_cli::agent::ClaudeConnector;
use polly_cli::console::{Console, Theme};
use polly_cli::input::StdinPrompter;
use polly_cli::orchestrator::Orchestrator;
use polly_cli::root;
use polly_core::config::PollyConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "polly",
    about = "Turn feature ideas into incremental coding prompts through a guided conversation",
    version
)]
struct Cli {
    /// Project root (default: auto-detect from .polly/ or .git/)
    #[arg(long, env = "POLLY_ROOT")]
    root: Option<PathBuf>,

    /// Model for the agent runtime (overrides .polly/config.yaml)
    #[arg(long)]
    model: Option<String>,

    /// Skip the phase menu and run a single skill-driven session
    #[arg(long)]
    coordinator: bool,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let root = root::resolve_root(cli.root.as_deref());
    let mut config = PollyConfig::load(&root)
        .with_context(|| format!("failed to load config under {}", root.display()))?;
    if cli.model.is_some() {
        config.model = cli.model;
    }
    tracing::debug!(root = %root.display(), ?config, "starting");

    let connector = ClaudeConnector::from_config(&config);
    let mut orchestrator = Orchestrator::new(
        root,
        config,
        Console::stdout(Theme::default()),
        Box::new(StdinPrompter::new()),
        Box::new(connector),
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        if cli.coordinator {
            orchestrator.run_coordinator().await
        } else {
            orchestrator.run().await
        }
    })
}
