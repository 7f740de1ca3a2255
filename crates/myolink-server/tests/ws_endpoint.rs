//! Endpoint behavior over real sockets: upgrade, frame delivery,
//! path rejection, and deregistration on disconnect.

use futures_util::{SinkExt, StreamExt};
use myolink_core::SignalEvent;
use myolink_server::{serve, Broadcaster, SubscriberRegistry};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

async fn start_endpoint() -> (String, Arc<SubscriberRegistry>, CancellationToken) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let registry = Arc::new(SubscriberRegistry::new());
    let cancel = CancellationToken::new();

    tokio::spawn(serve(listener, "/ws", registry.clone(), cancel.clone()));
    (format!("ws://{}", addr), registry, cancel)
}

async fn wait_for_len(registry: &SubscriberRegistry, len: usize) {
    tokio::time::timeout(TEST_TIMEOUT, async {
        while registry.len() != len {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("registry never reached {} subscribers", len));
}

#[tokio::test]
async fn subscribers_receive_events_as_text_frames() {
    let (base, registry, cancel) = start_endpoint().await;

    let (mut client, _) = tokio_tungstenite::connect_async(format!("{}/ws", base))
        .await
        .expect("connect");
    wait_for_len(&registry, 1).await;

    let broadcaster = Broadcaster::new(registry.clone());
    broadcaster.broadcast(SignalEvent::Rest);
    broadcaster.broadcast(SignalEvent::Active);

    for expected in ["0", "1"] {
        let frame = tokio::time::timeout(TEST_TIMEOUT, client.next())
            .await
            .expect("frame timeout")
            .expect("stream ended")
            .expect("frame error");
        assert_eq!(frame, Message::text(expected));
    }

    cancel.cancel();
}

#[tokio::test]
async fn inbound_frames_are_discarded_and_stream_continues() {
    let (base, registry, cancel) = start_endpoint().await;

    let (mut client, _) = tokio_tungstenite::connect_async(format!("{}/ws", base))
        .await
        .expect("connect");
    wait_for_len(&registry, 1).await;

    client
        .send(Message::text("keep-alive"))
        .await
        .expect("send keep-alive");

    let broadcaster = Broadcaster::new(registry.clone());
    broadcaster.broadcast(SignalEvent::Active);

    let frame = tokio::time::timeout(TEST_TIMEOUT, client.next())
        .await
        .expect("frame timeout")
        .expect("stream ended")
        .expect("frame error");
    assert_eq!(frame, Message::text("1"));

    cancel.cancel();
}

#[tokio::test]
async fn unknown_path_is_rejected_during_handshake() {
    let (base, registry, cancel) = start_endpoint().await;

    let result = tokio_tungstenite::connect_async(format!("{}/nope", base)).await;
    assert!(result.is_err());
    assert!(registry.is_empty());

    cancel.cancel();
}

#[tokio::test]
async fn closing_the_connection_deregisters_the_subscriber() {
    let (base, registry, cancel) = start_endpoint().await;

    let (mut client, _) = tokio_tungstenite::connect_async(format!("{}/ws", base))
        .await
        .expect("connect");
    wait_for_len(&registry, 1).await;

    client.close(None).await.expect("close");
    wait_for_len(&registry, 0).await;

    cancel.cancel();
}

#[tokio::test]
async fn shutdown_closes_connected_subscribers() {
    let (base, registry, cancel) = start_endpoint().await;

    let (mut client, _) = tokio_tungstenite::connect_async(format!("{}/ws", base))
        .await
        .expect("connect");
    wait_for_len(&registry, 1).await;

    cancel.cancel();

    // The server sends a close frame and drops the registration.
    let frame = tokio::time::timeout(TEST_TIMEOUT, client.next())
        .await
        .expect("close timeout");
    match frame {
        Some(Ok(Message::Close(_))) | None => {}
        other => panic!("expected close frame, got {:?}", other),
    }
    wait_for_len(&registry, 0).await;
}
