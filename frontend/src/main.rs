use anyhow::Context;
use clap::Parser;
use frontend::connection::run_connection;
use frontend::console::{ConsoleRows, chart_summary};
use frontend::{ChannelStore, ChartPanel, HeadlessChart};
use shared::{ChartSection, TelemetryConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "viewer")]
#[command(about = "Console viewer for live telemetry channels")]
struct Cli {
    /// TOML configuration file; defaults apply when it does not exist
    #[arg(long, short, default_value = TelemetryConfig::DEFAULT_FILE)]
    config: PathBuf,

    /// WebSocket URL of the telemetry server
    #[arg(long)]
    server: Option<String>,

    /// Channel to chart; repeat for several charts. Replaces configured charts.
    #[arg(long = "chart")]
    charts: Vec<String>,

    /// Sampling cadence in milliseconds
    #[arg(long)]
    cadence_ms: Option<u64>,

    /// Default retention in seconds for charts without their own
    #[arg(long)]
    retention_secs: Option<f64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();

    let config = TelemetryConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    let mut viewer = config.viewer;
    if let Some(server) = cli.server {
        viewer.server_url = server;
    }
    if !cli.charts.is_empty() {
        viewer.charts = cli.charts.into_iter().map(ChartSection::for_channel).collect();
    }
    if let Some(cadence_ms) = cli.cadence_ms {
        viewer.cadence_ms = cadence_ms;
    }
    if let Some(retention_secs) = cli.retention_secs {
        viewer.retention_secs = retention_secs;
    }

    let store = ChannelStore::new(ConsoleRows);
    let connection = tokio::spawn(run_connection(
        viewer.server_url.clone(),
        store.clone(),
        viewer.reconnect_delay(),
    ));

    let mut charts = Vec::with_capacity(viewer.charts.len());
    let mut panels = Vec::with_capacity(viewer.charts.len());
    for section in &viewer.charts {
        let chart = HeadlessChart::default();
        let panel = ChartPanel::new(section, viewer.retention_secs, store.clone(), chart.clone());
        panels.push(panel.spawn(viewer.cadence()));
        charts.push((section.channel.clone(), chart));
    }
    log::info!(
        "Charting {} channel(s) every {}ms from {}",
        charts.len(),
        viewer.cadence_ms,
        viewer.server_url
    );

    let mut summary = tokio::time::interval(viewer.summary_interval());
    loop {
        tokio::select! {
            _ = summary.tick() => {
                for (channel, chart) in &charts {
                    log::info!("{}", chart_summary(channel, chart));
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    drop(panels);
    connection.abort();
    log::info!("Viewer stopped");
    Ok(())
}
