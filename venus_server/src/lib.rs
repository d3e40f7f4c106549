//! The remote half of Venus Plus: a process that holds one fake GPU's worth
//! of state and answers a driver's commands over `venus_transport`.
//! Every accepted connection gets its own [`ServerState`] -- there
//! is no cross-connection sharing of instances, devices or memory, matching
//! a real Vulkan implementation where two clients never see each other's
//! handles.

pub mod dispatch;
pub mod fake_gpu;
pub mod state;

use std::net::ToSocketAddrs;
use std::sync::Arc;

use log::info;

use venus_transport::{NetworkServer, TransportError};

pub use state::ServerState;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub type Result<T> = std::result::Result<T, ServerError>;

/// A bound listener plus the state table backing every connection it
/// accepts. One `Server` normally serves a single client for its whole
/// lifetime,
/// but nothing here prevents a second connection reusing the same state if
/// a caller wants that.
pub struct Server {
    transport: Arc<NetworkServer>,
    state: Arc<ServerState>,
}

impl Server {
    pub fn bind<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let transport = Arc::new(NetworkServer::bind(addr)?);
        Ok(Self {
            transport,
            state: Arc::new(ServerState::new()),
        })
    }

    pub fn local_addr(&self) -> Result<std::net::SocketAddr> {
        Ok(self.transport.local_addr()?)
    }

    pub fn stop(&self) {
        self.transport.stop();
    }

    /// Runs the accept loop until [`Server::stop`] is called from another
    /// thread. Every frame decoded off any connection is routed through
    /// [`dispatch::dispatch`] against the same `ServerState`.
    pub fn run(&self) -> Result<()> {
        info!("venus_server listening on {:?}", self.transport.local_addr());
        let state = self.state.clone();
        self.transport.run(move |payload| dispatch::dispatch(&state, payload))?;
        Ok(())
    }

    /// Accepts and serves exactly one connection on the calling thread, for
    /// tests that want the accept loop to return once the peer disconnects.
    pub fn accept_one(&self) -> Result<()> {
        let state = self.state.clone();
        self.transport.accept_one(move |payload| dispatch::dispatch(&state, payload))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    use venus_wire::command::{CommandFlags, CommandHeader, CommandId};
    use venus_wire::commands::instance::{decode_enumerate_instance_version_reply, encode_enumerate_instance_version_args, EnumerateInstanceVersionArgs};
    use venus_wire::{Decoder, Encoder};

    #[test]
    fn accepts_a_connection_and_answers_a_real_command() {
        let server = Server::bind("127.0.0.1:0").unwrap();
        let addr = server.local_addr().unwrap();
        let server = Arc::new(server);
        let server_clone = server.clone();
        let handle = thread::spawn(move || server_clone.accept_one());

        let client = venus_transport::NetworkClient::connect(addr).unwrap();
        let mut enc = Encoder::dynamic();
        enc.acquire();
        CommandHeader::new(CommandId::ENUMERATE_INSTANCE_VERSION, CommandFlags::REPLY_EXPECTED).encode(&mut enc);
        encode_enumerate_instance_version_args(&mut enc, &EnumerateInstanceVersionArgs);
        let reply = client.call(enc.data()).unwrap();
        let version = decode_enumerate_instance_version_reply(&mut Decoder::new(&reply)).api_version;
        assert_eq!(version, venus_wire::VULKAN_XML_REGISTRY_VERSION);

        client.disconnect().unwrap();
        handle.join().unwrap().unwrap();
    }
}
