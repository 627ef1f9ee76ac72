//! Stratus Node - git hosting on an object store.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use stratus_node::config::Config;
use stratus_node::observability::{init_logging, LogFormat};

/// Stratus Node - git repositories served from an object store
#[derive(Parser, Debug)]
#[command(name = "stratus-node")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "stratus.yaml")]
    config: PathBuf,

    /// API listen address (overrides the configuration file)
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load(&args.config)?;
    if let Some(listen) = args.listen {
        config.listen = listen;
    }
    if let Some(level) = args.log_level {
        config.log_level = level;
    }
    config.json_logs |= args.json_logs;

    init_logging(&config.log_level, LogFormat::from_json_flag(config.json_logs));
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        "Starting Stratus node"
    );

    stratus_node::serve(config).await
}
