//! shopbot - a conversational product-recommendation assistant.
//!
//! Pipeline per user turn: a tool-mediated catalog search, a ranking
//! analysis, and a self-critique, each driven by its own configured role.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use shopbot::advisor::roles::RoleSet;
use shopbot::advisor::tools::ToolRegistry;
use shopbot::advisor::Advisor;
use shopbot::catalog::CatalogClient;
use shopbot::config::loader::{load_config, resolve_api_key};
use shopbot::providers::openai_compat::OpenAICompatProvider;
use shopbot::repl;

const VERSION: &str = "0.1.0";

#[derive(Parser)]
#[command(name = "shopbot", about = "shopbot - Product Advisor", version = VERSION)]
struct Cli {
    /// Verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the advisor (the default).
    Chat {
        /// One-shot message; runs a single turn and exits.
        #[arg(short, long)]
        message: Option<String>,
        /// Config file path (defaults to ~/.shopbot/config.json).
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "shopbot=debug" } else { "shopbot=warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let (message, config_path) = match cli.command {
        Some(Commands::Chat { message, config }) => (message, config),
        None => (None, None),
    };

    let cfg = load_config(config_path.as_deref());
    // Fail fast: no credential, no process.
    let api_key = resolve_api_key()?;

    if cfg.llm.stream {
        warn!("llm.stream is set but responses are always buffered");
    }

    let provider = Arc::new(OpenAICompatProvider::from_config(&cfg.llm, &api_key));
    let catalog = CatalogClient::new(&cfg.catalog);
    let registry = ToolRegistry::with_catalog(catalog, cfg.catalog.page_limit);
    let advisor = Advisor::new(
        provider,
        RoleSet::standard(),
        registry,
        cfg.llm.clone(),
        cfg.advisor.clone(),
    );

    match message {
        Some(msg) => repl::run_once(&advisor, &msg).await,
        None => repl::run_repl(&advisor).await?,
    }

    Ok(())
}
