//! WebSocket subscriber endpoint
//!
//! Accept loop plus one task per connection. A connection upgrades only
//! at the configured request path; anything else is rejected during the
//! handshake. Each connection task registers a subscriber, forwards
//! events from its channel as text frames, reads and discards inbound
//! frames (liveness only), and deregisters itself on the way out —
//! whether the peer closed, the write failed, or the server is
//! shutting down.

use crate::registry::SubscriberRegistry;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;

/// Run the accept loop until `cancel` fires.
///
/// Each accepted connection is handled on its own task; a broken
/// handshake or connection error never takes the listener down.
pub async fn serve(
    listener: TcpListener,
    ws_path: impl Into<String>,
    registry: Arc<SubscriberRegistry>,
    cancel: CancellationToken,
) {
    let ws_path = ws_path.into();
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let registry = registry.clone();
                    let path = ws_path.clone();
                    let cancel = cancel.clone();
                    tokio::spawn(async move {
                        if let Err(e) =
                            handle_connection(stream, peer, &path, registry, cancel).await
                        {
                            tracing::debug!("Connection from {} ended: {}", peer, e);
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!("Failed to accept connection: {}", e);
                }
            },
        }
    }
    tracing::info!("Subscriber endpoint stopped");
}

/// Drive one subscriber connection from handshake to deregistration.
async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    ws_path: &str,
    registry: Arc<SubscriberRegistry>,
    cancel: CancellationToken,
) -> Result<(), tungstenite::Error> {
    let expected = ws_path.to_string();
    let check_path = move |request: &Request, response: Response| {
        if request.uri().path() == expected {
            Ok(response)
        } else {
            let mut rejection = ErrorResponse::new(Some("not found".to_string()));
            *rejection.status_mut() = StatusCode::NOT_FOUND;
            Err(rejection)
        }
    };

    let ws = tokio_tungstenite::accept_hdr_async(stream, check_path).await?;
    let (mut ws_tx, mut ws_rx) = ws.split();

    let (id, mut events) = registry.register();
    tracing::info!("Subscriber {} connected from {}", id, peer);

    let result = async {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    return Ok(());
                }
                event = events.recv() => match event {
                    Some(event) => ws_tx.send(Message::text(event.frame())).await?,
                    // Our registry entry was pruned; nothing left to forward.
                    None => return Ok(()),
                },
                inbound = ws_rx.next() => match inbound {
                    // Keep-alive chatter from the peer, accepted and discarded
                    Some(Ok(Message::Close(_))) | None => return Ok(()),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e),
                },
            }
        }
    }
    .await;

    registry.remove(&id);
    tracing::info!("Subscriber {} disconnected", id);
    result
}
