//! Live-reload WebSocket server.
//!
//! ## Protocol
//!
//! A single text message is defined, `reload`. The server pushes it:
//!
//! - once, to the first client that connects during the session
//! - to every connected client after each completed rebuild
//!
//! Client messages are ignored and nothing is acknowledged. A client that
//! misses a message simply waits for the next rebuild.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;

/// The only message the server sends.
pub const RELOAD_MESSAGE: &str = "reload";

/// Handle for broadcasting reloads to connected clients.
#[derive(Debug, Clone)]
pub struct Reloader {
    tx: broadcast::Sender<()>,
}

impl Reloader {
    /// Tells every connected client to reload. Returns the number reached.
    pub fn reload(&self) -> usize {
        self.tx.send(()).unwrap_or(0)
    }
}

/// A bound reload server.
pub struct ReloadServer {
    listener: TcpListener,
    reload_tx: broadcast::Sender<()>,
    greeted: Arc<AtomicBool>,
}

impl ReloadServer {
    /// Binds to `127.0.0.1:port`. Port 0 picks a free port.
    pub async fn bind(port: u16) -> std::io::Result<Self> {
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        let listener = TcpListener::bind(addr).await?;
        let (reload_tx, _) = broadcast::channel(16);
        Ok(Self {
            listener,
            reload_tx,
            greeted: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn reloader(&self) -> Reloader {
        Reloader {
            tx: self.reload_tx.clone(),
        }
    }

    /// Accepts connections until `shutdown` fires.
    pub async fn serve(self, mut shutdown: broadcast::Receiver<()>) {
        loop {
            tokio::select! {
                accept_result = self.listener.accept() => {
                    match accept_result {
                        Ok((stream, peer_addr)) => {
                            tracing::debug!(%peer_addr, "new reload client");
                            tokio::spawn(handle_connection(
                                stream,
                                peer_addr,
                                self.reload_tx.subscribe(),
                                Arc::clone(&self.greeted),
                                shutdown.resubscribe(),
                            ));
                        }
                        Err(e) => tracing::warn!("accept error: {}", e),
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!("reload server shut down");
                    break;
                }
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    mut reload_rx: broadcast::Receiver<()>,
    greeted: Arc<AtomicBool>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let ws_stream = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            tracing::debug!(%peer_addr, "websocket handshake failed: {}", e);
            return;
        }
    };

    let (mut write, mut read) = ws_stream.split();

    // Only the first client of the session is told to reload on connect
    if !greeted.swap(true, Ordering::SeqCst) {
        if let Err(e) = write.send(Message::Text(RELOAD_MESSAGE.to_string())).await {
            tracing::debug!(%peer_addr, "send error: {}", e);
            return;
        }
    }
    tracing::info!(%peer_addr, "extension connected");

    loop {
        tokio::select! {
            reload = reload_rx.recv() => {
                match reload {
                    Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {
                        if let Err(e) = write.send(Message::Text(RELOAD_MESSAGE.to_string())).await {
                            tracing::debug!(%peer_addr, "send error: {}", e);
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            msg_opt = read.next() => {
                match msg_opt {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(%peer_addr, "receive error: {}", e);
                        break;
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                let _ = write.send(Message::Close(None)).await;
                break;
            }
        }
    }

    tracing::debug!(%peer_addr, "reload client disconnected");
}
