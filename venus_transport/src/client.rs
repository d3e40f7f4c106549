//! Client-side transport: one TCP connection to the remote Vulkan
//! implementation.
//!
//! The ring layer above this enforces single in-flight reply-bearing call
//! semantics at the command level; this type only guarantees that a single
//! `call` does an atomic send-then-receive so two concurrent callers can't
//! interleave their bytes on the wire.

use std::net::{TcpStream, ToSocketAddrs};

use parking_lot::Mutex;

use crate::message::{receive_frame, send_frame, SequenceCounter};
use crate::TransportError;

pub struct NetworkClient {
    stream: Mutex<TcpStream>,
    sequence: SequenceCounter,
}

impl NetworkClient {
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream: Mutex::new(stream),
            sequence: SequenceCounter::new(),
        })
    }

    /// Sends a command frame without waiting for a reply.
    pub fn send(&self, payload: &[u8]) -> Result<(), TransportError> {
        let mut stream = self.stream.lock();
        send_frame(&mut *stream, &self.sequence, payload)
    }

    /// Sends a command frame and blocks for its reply frame, holding the
    /// connection lock across both halves so no other caller's traffic can
    /// land between the request and its response.
    pub fn call(&self, payload: &[u8]) -> Result<Vec<u8>, TransportError> {
        let mut stream = self.stream.lock();
        send_frame(&mut *stream, &self.sequence, payload)?;
        receive_frame(&mut *stream)?.ok_or(TransportError::ConnectionClosed)
    }

    pub fn disconnect(&self) -> Result<(), TransportError> {
        self.stream.lock().shutdown(std::net::Shutdown::Both)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::NetworkServer;
    use std::sync::Arc;

    #[test]
    fn call_round_trips_through_a_real_socket() {
        let server = NetworkServer::bind("127.0.0.1:0").unwrap();
        let addr = server.local_addr().unwrap();
        let server = Arc::new(server);
        let server_clone = server.clone();
        let handle = std::thread::spawn(move || {
            server_clone.accept_one(|payload| {
                let mut reply = payload.to_vec();
                reply.push(0xFF);
                Some(reply)
            })
        });
        let client = NetworkClient::connect(addr).unwrap();
        let reply = client.call(&[1, 2, 3]).unwrap();
        assert_eq!(reply, vec![1, 2, 3, 0xFF]);
        client.disconnect().unwrap();
        handle.join().unwrap().unwrap();
    }
}
