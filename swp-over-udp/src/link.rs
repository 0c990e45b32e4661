//! The unreliable datagram link the protocol engines run on.
//!
//! [`Link`] is the only thing the sender and receiver know about the network:
//! a best-effort `send` and a `recv` that may report a synthetically dropped
//! arrival as `Ok(None)`.  Two implementations ship with the crate:
//!
//! - [`crate::socket::UdpLink`] — a real UDP socket.
//! - [`MemoryLink`] — an in-process pair joined by channels, for tests and
//!   local experiments.
//!
//! Both apply a [`LossModel`] independently to each direction.

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use crate::simulator::LossModel;

/// A lossy, unordered, point-to-point datagram link.
#[async_trait]
pub trait Link: Send + Sync {
    /// Hand one datagram to the link.  Returns once it is queued; delivery is
    /// not guaranteed.
    async fn send(&self, raw: Vec<u8>) -> Result<(), LinkError>;

    /// Wait for the next arrival attempt.
    ///
    /// `Ok(None)` means a datagram arrived but was dropped (or was not from
    /// the expected peer); the caller should simply try again.
    async fn recv(&self) -> Result<Option<Vec<u8>>, LinkError>;
}

/// Errors a link can report.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Underlying I/O error from the OS.
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The other end is gone; no further datagrams will arrive.
    #[error("link closed")]
    Closed,
}

// ---------------------------------------------------------------------------
// MemoryLink
// ---------------------------------------------------------------------------

/// One end of an in-process link created by [`MemoryLink::pair`].
#[derive(Debug)]
pub struct MemoryLink {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    loss: LossModel,
}

impl MemoryLink {
    /// Two connected, lossless ends.
    pub fn pair() -> (MemoryLink, MemoryLink) {
        Self::pair_with(LossModel::lossless(), LossModel::lossless())
    }

    /// Two connected ends, each dropping outgoing and incoming datagrams with
    /// probability `p`.  The ends use `seed` and `seed + 1` respectively.
    pub fn pair_with_loss(
        p: f64,
        seed: u64,
    ) -> Result<(MemoryLink, MemoryLink), crate::config::ConfigError> {
        Ok(Self::pair_with(
            LossModel::new(p, Some(seed))?,
            LossModel::new(p, Some(seed.wrapping_add(1)))?,
        ))
    }

    /// Two connected ends with explicit loss models.
    pub fn pair_with(a_loss: LossModel, b_loss: LossModel) -> (MemoryLink, MemoryLink) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        let a = MemoryLink {
            tx: a_tx,
            rx: Mutex::new(a_rx),
            loss: a_loss,
        };
        let b = MemoryLink {
            tx: b_tx,
            rx: Mutex::new(b_rx),
            loss: b_loss,
        };
        (a, b)
    }
}

#[async_trait]
impl Link for MemoryLink {
    async fn send(&self, raw: Vec<u8>) -> Result<(), LinkError> {
        if self.loss.should_drop() {
            log::trace!("[link:mem] dropped outgoing datagram ({} bytes)", raw.len());
            return Ok(());
        }
        self.tx.send(raw).map_err(|_| LinkError::Closed)
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, LinkError> {
        let raw = self.rx.lock().await.recv().await.ok_or(LinkError::Closed)?;
        if self.loss.should_drop() {
            log::trace!("[link:mem] dropped incoming datagram ({} bytes)", raw.len());
            return Ok(None);
        }
        Ok(Some(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pair_delivers_both_ways() {
        let (a, b) = MemoryLink::pair();
        a.send(b"ping".to_vec()).await.unwrap();
        b.send(b"pong".to_vec()).await.unwrap();
        assert_eq!(b.recv().await.unwrap(), Some(b"ping".to_vec()));
        assert_eq!(a.recv().await.unwrap(), Some(b"pong".to_vec()));
    }

    #[tokio::test]
    async fn recv_after_peer_dropped_is_closed() {
        let (a, b) = MemoryLink::pair();
        drop(b);
        assert!(matches!(a.recv().await, Err(LinkError::Closed)));
        assert!(matches!(a.send(vec![1]).await, Err(LinkError::Closed)));
    }

    #[tokio::test]
    async fn total_loss_drops_outgoing() {
        let (a, b) = MemoryLink::pair_with(
            LossModel::new(1.0, Some(3)).unwrap(),
            LossModel::lossless(),
        );
        a.send(vec![1, 2, 3]).await.unwrap();
        drop(a);
        // Nothing was queued, so the only thing left to observe is the close.
        assert!(matches!(b.recv().await, Err(LinkError::Closed)));
    }

    #[tokio::test]
    async fn total_loss_drops_incoming_as_none() {
        let (a, b) = MemoryLink::pair_with(
            LossModel::lossless(),
            LossModel::new(1.0, Some(3)).unwrap(),
        );
        a.send(vec![9]).await.unwrap();
        assert_eq!(b.recv().await.unwrap(), None);
    }
}
