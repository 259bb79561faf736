//! Server bootstrap: binds the signaling and webhook listeners and runs
//! their accept loops.

use std::net::SocketAddr;
use std::time::Duration;

use lookout_common::LookoutError;
use lookout_config::LookoutConfig;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tracing::{error, info, warn};

use crate::connection::handle_connection;
use crate::dispatcher::Relay;
use crate::webhook::{self, WebhookState};

/// Handle returned by [`start`]. Keeps the listener tasks alive.
pub struct ServerHandle {
    pub relay_addr: SocketAddr,
    pub webhook_addr: Option<SocketAddr>,
    pub relay: Relay,
    accept: JoinHandle<()>,
    webhook: Option<JoinHandle<()>>,
}

impl ServerHandle {
    /// Stop accepting new connections and HTTP requests.
    pub fn shutdown(&self) {
        self.accept.abort();
        if let Some(webhook) = &self.webhook {
            webhook.abort();
        }
    }
}

/// Bind both listeners and start serving.
pub async fn start(config: &LookoutConfig) -> Result<ServerHandle, LookoutError> {
    let relay = Relay::new(config.relay.mode, config.relay.channel_capacity as usize);

    let listener = TcpListener::bind(config.relay.bind_addr()).await?;
    let relay_addr = listener.local_addr()?;

    let webhook_listener = if config.webhook.enabled {
        Some(TcpListener::bind(config.webhook.bind_addr()).await?)
    } else {
        None
    };

    let handshake_timeout = Duration::from_secs(config.relay.handshake_timeout.into());
    let accept = tokio::spawn(accept_loop(listener, relay.clone(), handshake_timeout));
    info!(addr = %relay_addr, mode = %config.relay.mode, "Signaling relay listening");

    let (webhook_addr, webhook) = match webhook_listener {
        Some(listener) => {
            let addr = listener.local_addr()?;
            let router = webhook::build_router(
                WebhookState {
                    relay: relay.clone(),
                    frame_timeout: Duration::from_secs(config.webhook.frame_timeout.into()),
                },
                &config.webhook.allowed_origins,
            );
            let handle = tokio::spawn(async move {
                if let Err(e) = axum::serve(listener, router).await {
                    error!(error = %e, "Webhook server stopped");
                }
            });
            info!(addr = %addr, "Webhook bridge listening");
            (Some(addr), Some(handle))
        }
        None => (None, None),
    };

    Ok(ServerHandle {
        relay_addr,
        webhook_addr,
        relay,
        accept,
        webhook,
    })
}

async fn accept_loop(listener: TcpListener, relay: Relay, handshake_timeout: Duration) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let relay = relay.clone();
                tokio::spawn(async move {
                    match tokio::time::timeout(handshake_timeout, accept_async(stream)).await {
                        Ok(Ok(ws)) => handle_connection(ws, addr, relay).await,
                        Ok(Err(e)) => {
                            warn!(peer = %addr, error = %e, "WS handshake failed");
                        }
                        Err(_) => {
                            warn!(peer = %addr, "WS handshake timed out");
                        }
                    }
                });
            }
            Err(e) => {
                warn!(error = %e, "TCP accept error");
            }
        }
    }
}
