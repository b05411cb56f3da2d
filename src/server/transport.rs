//! Datagram transport abstraction

use std::io;
use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::net::UdpSocket;

/// Datagram send/receive used by the server workers.
///
/// Sends are best effort with no delivery confirmation.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Wait for the next datagram, writing it into `buf`.
    ///
    /// Returns the datagram length (truncated to `buf.len()`) and its origin.
    async fn receive(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;

    /// Send one datagram to `dest`.
    async fn send(&self, data: &[u8], dest: SocketAddr) -> io::Result<usize>;

    /// Local address, if bound
    fn local_addr(&self) -> io::Result<SocketAddr>;
}

#[async_trait]
impl Transport for UdpSocket {
    async fn receive(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.recv_from(buf).await
    }

    async fn send(&self, data: &[u8], dest: SocketAddr) -> io::Result<usize> {
        self.send_to(data, dest).await
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        UdpSocket::local_addr(self)
    }
}
