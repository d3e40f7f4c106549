//! Server-side transport: accepts connections and dispatches framed
//! request/reply pairs to a caller-supplied handler.

use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::message::{receive_frame, send_frame, SequenceCounter};
use crate::TransportError;

pub struct NetworkServer {
    listener: TcpListener,
    stopped: AtomicBool,
}

impl NetworkServer {
    pub fn bind<A: ToSocketAddrs>(addr: A) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)?;
        Ok(Self {
            listener,
            stopped: AtomicBool::new(false),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// Accepts connections in a loop and runs each one on its own thread
    /// until `stop` is called. `handler` receives one decoded command
    /// payload and returns the reply payload to send back, or `None` for a
    /// fire-and-forget command that expects no reply frame at all --
    /// skipping the frame rather than sending an empty one keeps the stream
    /// aligned for a caller that never reads past a `Ring::send`.
    pub fn run<F>(self: &Arc<Self>, handler: F) -> Result<(), TransportError>
    where
        F: Fn(&[u8]) -> Option<Vec<u8>> + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        while !self.stopped.load(Ordering::SeqCst) {
            let (stream, _) = match self.listener.accept() {
                Ok(pair) => pair,
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
                Err(e) => return Err(e.into()),
            };
            let handler = handler.clone();
            std::thread::spawn(move || {
                let _ = serve_connection(stream, move |payload| handler(payload));
            });
        }
        Ok(())
    }

    /// Accepts exactly one connection and serves it on the calling thread
    /// until the peer disconnects. Used by integration tests that don't
    /// want a background thread outliving the assertion.
    pub fn accept_one<F>(&self, handler: F) -> Result<(), TransportError>
    where
        F: Fn(&[u8]) -> Option<Vec<u8>>,
    {
        let (stream, _) = self.listener.accept()?;
        serve_connection(stream, handler)
    }
}

fn serve_connection<F>(mut stream: TcpStream, handler: F) -> Result<(), TransportError>
where
    F: Fn(&[u8]) -> Option<Vec<u8>>,
{
    let sequence = SequenceCounter::new();
    loop {
        let payload = match receive_frame(&mut stream)? {
            Some(payload) => payload,
            None => return Ok(()),
        };
        if let Some(reply) = handler(&payload) {
            send_frame(&mut stream, &sequence, &reply)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_to_ephemeral_port_yields_a_usable_address() {
        let server = NetworkServer::bind("127.0.0.1:0").unwrap();
        let addr = server.local_addr().unwrap();
        assert_ne!(addr.port(), 0);
    }
}
