//! TCP transport for the Venus Plus wire protocol: frame send/receive over
//! a real socket, a blocking client and a threaded server, layered on top
//! of `venus_wire`'s codec.

pub mod client;
pub mod io;
pub mod message;
pub mod server;

pub use client::NetworkClient;
pub use server::NetworkServer;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("wire error: {0}")]
    Wire(#[from] venus_wire::VenusWireError),
    #[error("connection closed while waiting for a reply")]
    ConnectionClosed,
}
