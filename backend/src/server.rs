use crate::broadcaster::Broadcaster;
use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message};

pub async fn start_server(bind_addr: &str, broadcaster: Arc<Broadcaster>) -> Result<()> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind WebSocket server to {}", bind_addr))?;
    log::info!("WebSocket server listening on {}", listener.local_addr()?);
    serve(listener, broadcaster).await
}

/// Accepts viewers forever; each connection runs on its own task.
pub async fn serve(listener: TcpListener, broadcaster: Arc<Broadcaster>) -> Result<()> {
    loop {
        let (stream, peer) = listener
            .accept()
            .await
            .context("Failed to accept viewer connection")?;
        let broadcaster = broadcaster.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer, broadcaster).await {
                log::error!("Connection error from {}: {}", peer, e);
            }
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    broadcaster: Arc<Broadcaster>,
) -> Result<()> {
    let ws_stream = accept_async(stream).await?;
    let (mut ws_tx, mut ws_rx) = ws_stream.split();
    let mut session = broadcaster.connect();
    log::info!("Viewer {} joined as session {}", peer, session.id);

    let result: Result<()> = async {
        loop {
            tokio::select! {
                Some(payload) = session.payloads.recv() => {
                    ws_tx.send(Message::Text(payload.to_string().into())).await?;
                }
                msg = ws_rx.next() => {
                    match msg {
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Err(e)) => {
                            log::debug!("Viewer {} transport error: {}", peer, e);
                            break;
                        }
                        Some(Ok(_)) => {}
                    }
                }
            }
        }
        Ok(())
    }
    .await;

    broadcaster.disconnect(session.id);
    result
}
