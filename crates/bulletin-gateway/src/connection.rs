use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::{info, trace, warn};

use crate::hub::Hub;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Drive one push-channel connection: register with the hub, forward every
/// broadcast to the socket until either side goes away, then unregister.
///
/// Subscribers are anonymous and receive no initial state.
pub async fn handle_connection(socket: WebSocket, hub: Hub) {
    let (mut sender, mut receiver) = socket.split();

    let mut subscription = hub.subscribe();
    let subscriber_id = subscription.id();
    info!(subscriber = %subscriber_id, "Subscriber connected ({} live)", hub.subscriber_count());

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Forward broadcasts -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = subscription.recv() => {
                    let Some(msg) = result else { break };

                    if sender.send(Message::Text(msg.json.clone().into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // The push channel is one-way; client frames only matter for liveness
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                Message::Text(text) => {
                    trace!("Ignoring client text frame ({} bytes)", text.len());
                }
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    // The aborted send task drops the subscription too; this covers the
    // window before the abort is observed.
    hub.unsubscribe(subscriber_id);
    info!(subscriber = %subscriber_id, "Subscriber disconnected ({} live)", hub.subscriber_count());
}
