//! Per-connection request loop.

use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpStream;

use crate::network::dispatch::dispatch;
use crate::network::protocol::{read_request, write_response, Response};
use crate::store::Store;

/// Serves one client connection until it disconnects or fails.
pub struct ConnectionHandler {
    store: Arc<Store>,
}

impl ConnectionHandler {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Runs the read, dispatch, write loop for a single connection.
    pub async fn handle(&self, mut stream: TcpStream) -> Result<()> {
        let peer_addr = stream.peer_addr()?;
        tracing::info!("New connection from {}", peer_addr);

        loop {
            match read_request(&mut stream).await {
                Ok(request) => {
                    let response = dispatch(&self.store, request);
                    if let Err(e) = write_response(&mut stream, &response).await {
                        tracing::error!("Failed to write response to {}: {}", peer_addr, e);
                        break;
                    }
                }
                Err(e) => {
                    if is_disconnect(&e) {
                        tracing::info!("Client disconnected: {}", peer_addr);
                    } else {
                        tracing::error!("Failed to read request from {}: {}", peer_addr, e);
                        // A bad frame may leave the stream desynchronized,
                        // so answer once and close rather than resync.
                        let response = Response::error("bad_request", e.to_string());
                        let _ = write_response(&mut stream, &response).await;
                    }
                    break;
                }
            }
        }

        tracing::info!("Connection closed from {}", peer_addr);
        Ok(())
    }
}

fn is_disconnect(err: &anyhow::Error) -> bool {
    err.downcast_ref::<std::io::Error>()
        .map(|io| {
            matches!(
                io.kind(),
                std::io::ErrorKind::UnexpectedEof | std::io::ErrorKind::ConnectionReset
            )
        })
        .unwrap_or(false)
}
