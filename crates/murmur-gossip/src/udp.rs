//! UDP transport.

use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tracing::warn;

use crate::codec;
use crate::error::Result;
use crate::messages::{limits::MAX_DATAGRAM_SIZE, Envelope};
use crate::transport::Transport;

/// One datagram per envelope over a bound UDP socket.
pub struct UdpTransport {
    socket: UdpSocket,
    addr: SocketAddr,
}

impl UdpTransport {
    /// Bind a socket at `addr`. Port 0 picks a free port.
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        let addr = socket.local_addr()?;
        Ok(Self { socket, addr })
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn send(&self, to: SocketAddr, envelope: &Envelope) -> Result<()> {
        let datagram = codec::encode(envelope)?;
        self.socket.send_to(&datagram, to).await?;
        Ok(())
    }

    async fn recv(&self) -> Result<(SocketAddr, Envelope)> {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        loop {
            // Socket errors here are per-datagram (e.g. an ICMP unreachable
            // reported for an earlier send), not a dead socket.
            let (len, from) = match self.socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) => {
                    warn!("udp receive failed, continuing: {}", e);
                    continue;
                }
            };
            match codec::decode(&buf[..len]) {
                Ok(envelope) => return Ok((from, envelope)),
                Err(e) => warn!(%from, "dropping undecodable datagram: {}", e),
            }
        }
    }

    fn local_addr(&self) -> SocketAddr {
        self.addr
    }
}
