use anyhow::Context;
use backend::{Broadcaster, SnapshotWatcher, server};
use clap::Parser;
use shared::TelemetryConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "backend")]
#[command(about = "Streams live telemetry snapshots to connected viewers")]
struct Cli {
    /// TOML configuration file; defaults apply when it does not exist
    #[arg(long, short, default_value = TelemetryConfig::DEFAULT_FILE)]
    config: PathBuf,

    /// Snapshot file written by the acquisition process
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Address for the WebSocket server, e.g. 0.0.0.0:8080
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();

    let mut config = TelemetryConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    if let Some(snapshot) = cli.snapshot {
        config.server.snapshot_path = snapshot.display().to_string();
    }
    if let Some(bind) = cli.bind {
        config.server.bind_addr = bind;
    }

    let broadcaster = Broadcaster::from_config(&config.server);
    let watcher = SnapshotWatcher::from_config(&config.server);
    tokio::spawn(watcher.run(broadcaster.clone()));

    server::start_server(&config.server.bind_addr, broadcaster).await
}
