//! Network protocol handling
//!
//! This module implements the framed JSON wire protocol for client-server
//! communication: length-prefixed commands over TCP, one response per
//! request, served concurrently up to a connection cap.

pub mod connection;
pub mod dispatch;
pub mod protocol;
pub mod server;

pub use connection::ConnectionHandler;
pub use dispatch::{dispatch, error_code};
pub use protocol::{
    read_request, read_response, write_request, write_response, CollectionInfo, Request,
    Response, ResponseStatus, MAX_MESSAGE_SIZE,
};
pub use server::{ProtocolServer, ServerConfig};
