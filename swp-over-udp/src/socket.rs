//! UDP implementation of [`Link`].
//!
//! [`UdpLink`] is a thin wrapper around `tokio::net::UdpSocket` that moves
//! raw datagrams and applies a [`LossModel`] in both directions.  All protocol
//! logic lives elsewhere; this module owns only byte I/O.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::net::UdpSocket;

use crate::link::{Link, LinkError};
use crate::packet::MAX_PACKET;
use crate::simulator::LossModel;

/// Receive buffer size.  Anything longer than a maximal packet is still read
/// (and left for the codec to judge) as long as it fits.
const RECV_BUF: usize = MAX_PACKET + 512;

/// How the link decides where to send and whom to listen to.
#[derive(Debug, Clone, Copy)]
enum Peer {
    /// Sender side: fixed remote, datagrams from anyone else are ignored.
    Fixed(SocketAddr),
    /// Receiver side: reply to whoever sent the most recent datagram.
    Learned(Option<SocketAddr>),
}

/// A lossy, packet-oriented UDP link.
///
/// All methods are `&self` so the link can be shared between the background
/// receive loop and the send path.
#[derive(Debug)]
pub struct UdpLink {
    /// Address this socket is bound to (filled in after OS assigns ephemeral port).
    pub local_addr: SocketAddr,
    inner: UdpSocket,
    peer: Mutex<Peer>,
    loss: LossModel,
}

impl UdpLink {
    /// Bind an ephemeral port and talk only to `remote`.
    pub async fn connect(remote: SocketAddr, loss: LossModel) -> Result<Self, LinkError> {
        let any: SocketAddr = if remote.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let inner = UdpSocket::bind(any).await?;
        let local_addr = inner.local_addr()?;
        Ok(Self {
            local_addr,
            inner,
            peer: Mutex::new(Peer::Fixed(remote)),
            loss,
        })
    }

    /// Bind `local_addr` and learn the peer from incoming datagrams.
    ///
    /// Passing port `0` lets the OS choose an ephemeral port.
    pub async fn bind(local_addr: SocketAddr, loss: LossModel) -> Result<Self, LinkError> {
        let inner = UdpSocket::bind(local_addr).await?;
        let local_addr = inner.local_addr()?;
        Ok(Self {
            local_addr,
            inner,
            peer: Mutex::new(Peer::Learned(None)),
            loss,
        })
    }

    /// Current destination for outgoing datagrams, if one is known.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        match *self.peer.lock().unwrap_or_else(PoisonError::into_inner) {
            Peer::Fixed(addr) => Some(addr),
            Peer::Learned(addr) => addr,
        }
    }

    /// Returns `false` when the datagram should be ignored.
    fn accept_from(&self, from: SocketAddr) -> bool {
        let mut peer = self.peer.lock().unwrap_or_else(PoisonError::into_inner);
        match *peer {
            Peer::Fixed(addr) => addr == from,
            Peer::Learned(ref mut addr) => {
                if *addr != Some(from) {
                    log::debug!("[link:udp] peer is now {from}");
                    *addr = Some(from);
                }
                true
            }
        }
    }
}

#[async_trait]
impl Link for UdpLink {
    async fn send(&self, raw: Vec<u8>) -> Result<(), LinkError> {
        if self.loss.should_drop() {
            log::trace!("[link:udp] dropped outgoing datagram ({} bytes)", raw.len());
            return Ok(());
        }
        let Some(dest) = self.peer_addr() else {
            log::debug!("[link:udp] no peer yet; discarding {} bytes", raw.len());
            return Ok(());
        };
        self.inner.send_to(&raw, dest).await?;
        Ok(())
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, LinkError> {
        let mut buf = vec![0u8; RECV_BUF];
        let (n, from) = self.inner.recv_from(&mut buf).await?;
        if !self.accept_from(from) {
            log::debug!("[link:udp] ignoring datagram from stranger {from}");
            return Ok(None);
        }
        if self.loss.should_drop() {
            log::trace!("[link:udp] dropped incoming datagram ({n} bytes)");
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(buf))
    }
}
