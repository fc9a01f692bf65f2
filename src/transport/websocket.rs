//! WebSocket transport
//!
//! Accepts TCP connections, upgrades them to WebSockets, and bridges each one
//! to the shared `Broker`:
//! - one task reads text frames, decodes them, and runs them on the broker
//! - one task drains the connection's bounded outbound queue into the socket
//!
//! When the broker drops a connection (disconnect or eviction) the reader
//! stops, and a writer still stuck on the socket after `WRITER_CLOSE_GRACE`
//! is aborted so the TCP stream is released.
//!
//! The broker lock is only taken for synchronous broker calls and is never
//! held across an `.await`.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tracing::{debug, info, warn};
use tungstenite::protocol::Message as WsMessage;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::broker::Broker;
use crate::config::MIN_OUTBOUND_QUEUE_CAPACITY;
use crate::transport::codec::{Command, ServerFrame};
use crate::utils::error::{BrokerError, Result};

/// How long a closing connection's writer may keep flushing before it is
/// aborted and the socket dropped.
pub const WRITER_CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Binds `addr` and serves connections until the task is dropped.
pub async fn start_websocket_server(addr: &str, broker: Arc<Mutex<Broker>>) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("WebSocket server listening on ws://{}", listener.local_addr()?);
    serve(listener, broker).await
}

/// Serves connections from an already bound listener.
pub async fn serve(listener: TcpListener, broker: Arc<Mutex<Broker>>) -> Result<()> {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("Failed to accept connection: {e}");
                continue;
            }
        };

        let broker = broker.clone();
        tokio::spawn(async move {
            handle_connection(stream, peer, broker).await;
        });
    }
}

/// Locks the broker, recovering the guard if another task panicked while
/// holding it.
pub fn lock_broker(broker: &Mutex<Broker>) -> MutexGuard<'_, Broker> {
    broker.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Decodes one text frame and runs it on the broker. Malformed frames are
/// dropped.
pub fn handle_text(broker: &Mutex<Broker>, client_id: &str, text: &str) {
    match text.parse::<Command>() {
        Ok(command) => lock_broker(broker).handle_command(client_id, command),
        Err(err) => debug!(
            "Discarding frame from {client_id}: {err} | {}",
            text.chars().take(100).collect::<String>()
        ),
    }
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, broker: Arc<Mutex<Broker>>) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake error from {peer}: {e}");
            return;
        }
    };
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let capacity = lock_broker(&broker)
        .settings()
        .outbound_queue_capacity
        .max(MIN_OUTBOUND_QUEUE_CAPACITY);
    let (tx, mut rx) = mpsc::channel::<WsMessage>(capacity);

    let registered = lock_broker(&broker).connect(tx);
    let client_id = match registered {
        Ok(id) => id,
        Err(e) => {
            warn!("Refusing connection from {peer}: {e}");
            if let BrokerError::ServerFull { .. } = e {
                let _ = ws_sender
                    .send(WsMessage::from(ServerFrame::server_full()))
                    .await;
            }
            let _ = ws_sender.close().await;
            return;
        }
    };
    info!("{client_id} connected from {peer}");

    let shutdown_signal = lock_broker(&broker)
        .clients()
        .get(&client_id)
        .map(|client| client.shutdown_signal());
    let shutdown = match shutdown_signal {
        Some(shutdown) => shutdown,
        None => {
            debug!("{client_id} was evicted during the handshake");
            let _ = ws_sender.close().await;
            return;
        }
    };

    let cleanup_called = Arc::new(AtomicBool::new(false));

    let do_cleanup = {
        let broker = broker.clone();
        let client_id = client_id.clone();
        let cleanup_called = cleanup_called.clone();

        move || {
            if !cleanup_called.swap(true, Ordering::SeqCst) {
                lock_broker(&broker).disconnect(&client_id);
            }
        }
    };

    let mut writer = {
        let client_id = client_id.clone();
        let do_cleanup = do_cleanup.clone();

        spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let Err(e) = ws_sender.send(msg).await {
                    warn!("Failed to send message to {client_id}: {e}");
                    break;
                }
            }

            // queue closed: the broker dropped this client, or the socket failed
            let _ = ws_sender.close().await;
            do_cleanup();
            debug!("Send loop closed for {client_id}");
        })
    };

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                debug!("{client_id} was dropped by the broker");
                break;
            }
            frame = ws_receiver.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    handle_text(&broker, &client_id, text.as_str())
                }
                Some(Ok(WsMessage::Close(_))) => {
                    debug!("{client_id} requested close");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("Read error from {client_id}: {e}");
                    break;
                }
                None => break,
            },
        }
    }

    do_cleanup();

    // the writer may be parked on a peer that stopped reading
    if timeout(WRITER_CLOSE_GRACE, &mut writer).await.is_err() {
        debug!("Aborting stalled send loop for {client_id}");
        writer.abort();
    }
    info!("{client_id} disconnected");
}
