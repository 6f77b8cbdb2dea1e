use crate::channel_store::ChannelStore;
use anyhow::Result;
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Feeds every snapshot pushed by the server into `store`, reconnecting
/// after `reconnect_delay` whenever the connection fails or closes.
///
/// Never returns; charts keep sampling the last known values while the
/// connection is down.
pub async fn run_connection(server_url: String, store: Arc<ChannelStore>, reconnect_delay: Duration) {
    loop {
        match receive_snapshots(&server_url, &store).await {
            Ok(()) => log::warn!(
                "Connection to {} closed. Reconnecting in {:?}...",
                server_url,
                reconnect_delay
            ),
            Err(e) => log::warn!(
                "Connection to {} failed: {}. Reconnecting in {:?}...",
                server_url,
                e,
                reconnect_delay
            ),
        }
        tokio::time::sleep(reconnect_delay).await;
    }
}

async fn receive_snapshots(server_url: &str, store: &ChannelStore) -> Result<()> {
    let (ws_stream, _) = connect_async(server_url).await?;
    log::info!("Connected to telemetry server at {}", server_url);
    let (_ws_tx, mut ws_rx) = ws_stream.split();

    while let Some(msg) = ws_rx.next().await {
        match msg? {
            Message::Text(payload) => {
                // Malformed payloads are logged by the store and skipped.
                let _ = store.on_snapshot(&payload);
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    Ok(())
}
