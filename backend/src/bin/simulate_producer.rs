//! Stand-in for the acquisition process: rewrites the snapshot file in place
//! with slowly varying engine channels so the server and viewers can be run
//! without hardware attached.

use anyhow::{Context, Result};
use clap::Parser;
use shared::{Channel, ChannelValue, ServerSection, Snapshot};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "simulate_producer")]
#[command(about = "Writes synthetic telemetry snapshots for local testing")]
struct Cli {
    /// Snapshot file to rewrite
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Milliseconds between rewrites
    #[arg(long, default_value = "1000")]
    interval_ms: u64,
}

struct SimulatedChannel {
    name: &'static str,
    units: &'static str,
    precision: usize,
    base: f64,
    amplitude: f64,
    period_secs: f64,
}

const CHANNELS: &[SimulatedChannel] = &[
    SimulatedChannel { name: "RPM", units: "RPM", precision: 0, base: 4500.0, amplitude: 3500.0, period_secs: 20.0 },
    SimulatedChannel { name: "ThrottlePosition", units: "%", precision: 1, base: 50.0, amplitude: 45.0, period_secs: 7.0 },
    SimulatedChannel { name: "ManifoldPressure", units: "kPa", precision: 1, base: 70.0, amplitude: 30.0, period_secs: 11.0 },
    SimulatedChannel { name: "BatteryVoltage", units: "V", precision: 2, base: 13.2, amplitude: 0.6, period_secs: 31.0 },
];

fn snapshot_at(elapsed_secs: f64) -> Snapshot {
    let channels = CHANNELS
        .iter()
        .map(|channel| {
            let phase = elapsed_secs / channel.period_secs * std::f64::consts::TAU;
            let value = channel.base + channel.amplitude * phase.sin();
            Channel {
                name: channel.name.to_string(),
                value: ChannelValue::Text(format!(
                    "{:.*} {}",
                    channel.precision, value, channel.units
                )),
            }
        })
        .collect();
    Snapshot { channels }
}

fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let text = snapshot.to_json()?;
    std::fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    let output = cli
        .output
        .unwrap_or_else(|| PathBuf::from(ServerSection::default().snapshot_path));
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    log::info!(
        "Writing {} channels to {} every {}ms",
        CHANNELS.len(),
        output.display(),
        cli.interval_ms
    );

    let start = Instant::now();
    let mut ticker = tokio::time::interval(Duration::from_millis(cli.interval_ms.max(1)));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let snapshot = snapshot_at(start.elapsed().as_secs_f64());
                write_snapshot(&output, &snapshot)?;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    log::info!("Producer stopped");
    Ok(())
}
