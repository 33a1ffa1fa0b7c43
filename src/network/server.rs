//! TCP server for the framed document protocol.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;

use crate::network::connection::ConnectionHandler;
use crate::store::Store;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address
    pub bind_addr: SocketAddr,

    /// Maximum concurrent connections
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 28015)),
            max_connections: 1024,
        }
    }
}

/// Document protocol server
pub struct ProtocolServer {
    listener: TcpListener,
    handler: Arc<ConnectionHandler>,
    connection_semaphore: Arc<Semaphore>,
}

impl ProtocolServer {
    /// Binds the listener; the configured address may name port 0 to let
    /// the OS pick one, recoverable through [`local_addr`](Self::local_addr).
    pub async fn bind(config: &ServerConfig, store: Arc<Store>) -> Result<Self> {
        let listener = TcpListener::bind(config.bind_addr).await?;
        let handler = Arc::new(ConnectionHandler::new(store));
        let connection_semaphore = Arc::new(Semaphore::new(config.max_connections));

        tracing::info!("Protocol server listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            handler,
            connection_semaphore,
        })
    }

    /// Accept connections forever, each served on its own task.
    pub async fn serve(&self) -> Result<()> {
        loop {
            // Acquire connection permit
            let permit = self.connection_semaphore.clone().acquire_owned().await?;

            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let handler = self.handler.clone();

                    tokio::spawn(async move {
                        tracing::debug!("Accepted connection from {}", addr);

                        if let Err(e) = handler.handle(stream).await {
                            tracing::error!("Connection error from {}: {}", addr, e);
                        }

                        // Permit automatically released when dropped
                        drop(permit);
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to accept connection: {}", e);
                    // Don't break the loop, keep accepting new connections
                }
            }
        }
    }

    /// The address the listener actually bound.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Get available connection slots
    pub fn available_connections(&self) -> usize {
        self.connection_semaphore.available_permits()
    }
}
