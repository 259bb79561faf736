//! Per-connection handler: register, pump events both ways, clean up.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, warn};

use crate::dispatcher::Relay;
use crate::protocol::ClientEvent;

/// Handle a single WebSocket connection until either side closes it.
pub async fn handle_connection(ws: WebSocketStream<TcpStream>, addr: SocketAddr, relay: Relay) {
    let (mut sink, mut stream) = ws.split();
    let (id, mut rx) = relay.connect().await;

    info!(peer = %addr, conn = %id, "Client connected");

    loop {
        tokio::select! {
            // Events queued for this client → its WebSocket
            Some(event) = rx.recv() => {
                let json = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(conn = %id, error = %e, "Failed to encode event");
                        continue;
                    }
                };
                if sink.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }

            // Frames from this client → dispatcher
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => match ClientEvent::parse(&text) {
                        Ok(event) => relay.handle(&id, event).await,
                        Err(e) => warn!(conn = %id, error = %e, "Ignoring frame"),
                    },
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(conn = %id, error = %e, "WS error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    relay.disconnect(&id).await;
    info!(peer = %addr, conn = %id, "Client disconnected");
}
