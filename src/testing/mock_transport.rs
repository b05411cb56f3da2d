//! In-memory [`Transport`] for driving a server without sockets

use std::collections::HashSet;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use crate::server::Transport;

type Datagram = (Vec<u8>, SocketAddr);
type Inbound = Result<Datagram, io::ErrorKind>;

/// Server-side half: what the server reads from and writes to
#[derive(Debug)]
pub struct MockTransport {
    local: SocketAddr,
    inbound: Mutex<mpsc::UnboundedReceiver<Inbound>>,
    outbound: mpsc::UnboundedSender<Datagram>,
    refused: Arc<StdMutex<HashSet<SocketAddr>>>,
}

/// Test-side half: inject datagrams and collect what the server sent
#[derive(Debug)]
pub struct MockPeer {
    inbound: Option<mpsc::UnboundedSender<Inbound>>,
    outbound: mpsc::UnboundedReceiver<Datagram>,
    refused: Arc<StdMutex<HashSet<SocketAddr>>>,
}

impl MockTransport {
    /// Create a connected transport/peer pair
    #[must_use]
    pub fn pair(local: SocketAddr) -> (Arc<Self>, MockPeer) {
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let refused = Arc::new(StdMutex::new(HashSet::new()));

        let transport = Arc::new(Self {
            local,
            inbound: Mutex::new(in_rx),
            outbound: out_tx,
            refused: Arc::clone(&refused),
        });
        let peer = MockPeer {
            inbound: Some(in_tx),
            outbound: out_rx,
            refused,
        };
        (transport, peer)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn receive(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        let next = self.inbound.lock().await.recv().await;
        let (data, from) = match next {
            Some(Ok(datagram)) => datagram,
            Some(Err(kind)) => return Err(io::Error::new(kind, "injected receive error")),
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::NotConnected,
                    "mock transport closed",
                ));
            }
        };
        let len = data.len().min(buf.len());
        buf[..len].copy_from_slice(&data[..len]);
        Ok((len, from))
    }

    async fn send(&self, data: &[u8], dest: SocketAddr) -> io::Result<usize> {
        let refused = self
            .refused
            .lock()
            .is_ok_and(|set| set.contains(&dest));
        if refused {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "destination refused",
            ));
        }
        self.outbound
            .send((data.to_vec(), dest))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "peer dropped"))?;
        Ok(data.len())
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(self.local)
    }
}

impl MockPeer {
    /// Deliver a datagram to the server as if sent from `from`
    pub fn inject(&self, data: impl Into<Vec<u8>>, from: SocketAddr) {
        if let Some(tx) = &self.inbound {
            let _ = tx.send(Ok((data.into(), from)));
        }
    }

    /// Make the server's next receive fail with `kind`
    pub fn inject_error(&self, kind: io::ErrorKind) {
        if let Some(tx) = &self.inbound {
            let _ = tx.send(Err(kind));
        }
    }

    /// Wait for the next datagram the server sent
    pub async fn next_sent(&mut self) -> Option<(Vec<u8>, SocketAddr)> {
        self.outbound.recv().await
    }

    /// Take a sent datagram if one is already waiting
    pub fn try_next_sent(&mut self) -> Option<(Vec<u8>, SocketAddr)> {
        self.outbound.try_recv().ok()
    }

    /// Make sends to `dest` fail with `ConnectionRefused`
    pub fn refuse(&self, dest: SocketAddr) {
        if let Ok(mut set) = self.refused.lock() {
            set.insert(dest);
        }
    }

    /// Close the inbound side; the server's next receive fails fatally
    pub fn close(&mut self) {
        self.inbound = None;
    }
}
