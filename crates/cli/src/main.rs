use std::path::PathBuf;

use clap::{Parser, Subcommand};
use cli::{Config, Result};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cumulus")]
#[command(about = "Streaming chat with a weather tool for a local model", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: ./cumulus.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the chat endpoint over HTTP
    Serve,
    /// Serve the weather tool over MCP on stdin/stdout
    ToolServer,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = Cli::parse();
    let config = Config::load(args.config.as_deref())?;
    init_tracing(&config.log.level);

    match args.command.unwrap_or(Commands::Serve) {
        Commands::Serve => cli::serve(&config).await,
        Commands::ToolServer => cli::tool_server::run(&config).await,
    }
}

/// Logs go to stderr; stdout belongs to the tool protocol.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
