//! Receiver engine: reassembly, cumulative ACKs and in-order delivery.
//!
//! A background task is the only reader of the link.  For every DATA packet
//! it updates the [`Reassembler`] under a single lock, pushes any chunks that
//! became contiguous onto the delivery queue, and answers with a cumulative
//! ACK for the current watermark.  [`Receiver::recv`] pops the queue.
//!
//! ```text
//!  link ──▶ recv loop ──▶ Reassembler ──▶ delivery queue ──▶ recv()
//!               │
//!               └──────▶ ACK(watermark) ──▶ link
//! ```

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::SwpConfig;
use crate::error::SwpError;
use crate::link::{Link, LinkError};
use crate::packet::{Packet, PacketType};
use crate::reassembly::Reassembler;
use crate::simulator::LossModel;
use crate::socket::UdpLink;

/// Snapshot of the receiver's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    /// DATA packets buffered or delivered (not duplicates).
    pub accepted: u64,
    /// DATA packets at or behind the watermark.
    pub duplicates: u64,
    /// Chunks pushed onto the delivery queue.
    pub delivered: u64,
    /// ACK packets handed to the link.
    pub acks_sent: u64,
}

#[derive(Debug, Default)]
struct Counters {
    accepted: AtomicU64,
    duplicates: AtomicU64,
    delivered: AtomicU64,
    acks_sent: AtomicU64,
}

/// The receiving half of an SWP connection.
pub struct Receiver {
    shared: Arc<Shared>,
    ready: mpsc::UnboundedReceiver<Vec<u8>>,
    recv_task: JoinHandle<()>,
    local_addr: Option<SocketAddr>,
}

struct Shared {
    link: Arc<dyn Link>,
    /// Reorder buffer, watermark and the push side of the delivery queue
    /// change together under this lock.
    state: Mutex<Reassembly>,
    counters: Counters,
}

struct Reassembly {
    window: Reassembler,
    /// Taken when the receive loop stops, so `recv()` can observe the end.
    ready: Option<mpsc::UnboundedSender<Vec<u8>>>,
}

impl Receiver {
    /// Bind `local` and start receiving.
    pub async fn bind(local: SocketAddr, config: SwpConfig) -> Result<Self, SwpError> {
        config.validate()?;
        let loss = LossModel::new(config.loss_probability, config.seed)?;
        let drop_rate = loss.probability();
        let link = UdpLink::bind(local, loss).await?;
        let local_addr = link.local_addr;
        log::info!("[swp:recv] listening on {local_addr} (loss {drop_rate})");

        let mut receiver = Self::with_link(Arc::new(link));
        receiver.local_addr = Some(local_addr);
        Ok(receiver)
    }

    /// Run the receiver over an arbitrary link.
    pub fn with_link(link: Arc<dyn Link>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            link,
            state: Mutex::new(Reassembly {
                window: Reassembler::new(),
                ready: Some(tx),
            }),
            counters: Counters::default(),
        });
        let recv_task = tokio::spawn(recv_loop(Arc::clone(&shared)));
        Self {
            shared,
            ready: rx,
            recv_task,
            local_addr: None,
        }
    }

    /// Next in-order chunk, exactly as the sender chunked it.
    ///
    /// Waits until one is available.  Fails with [`SwpError::Closed`] only
    /// once the link is gone and every delivered chunk has been returned.
    pub async fn recv(&mut self) -> Result<Vec<u8>, SwpError> {
        self.ready.recv().await.ok_or(SwpError::Closed)
    }

    /// Next in-order chunk if one is already queued.
    pub fn try_recv(&mut self) -> Option<Vec<u8>> {
        self.ready.try_recv().ok()
    }

    /// Last sequence number delivered in order, if any.
    pub fn watermark(&self) -> Option<u32> {
        self.shared.state().window.watermark()
    }

    /// Sequence numbers held back behind a gap.
    pub fn reordered(&self) -> Vec<u32> {
        self.shared.state().window.reordered()
    }

    pub fn stats(&self) -> ReceiverStats {
        let c = &self.shared.counters;
        ReceiverStats {
            accepted: c.accepted.load(Ordering::Relaxed),
            duplicates: c.duplicates.load(Ordering::Relaxed),
            delivered: c.delivered.load(Ordering::Relaxed),
            acks_sent: c.acks_sent.load(Ordering::Relaxed),
        }
    }

    /// Local UDP address, when running over [`UdpLink`].
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}

impl Drop for Receiver {
    fn drop(&mut self) {
        self.recv_task.abort();
    }
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, Reassembly> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one DATA packet through reassembly.  Returns the sequence number
    /// to acknowledge, if anything has been delivered yet.
    fn on_data(&self, seq: u32, payload: Vec<u8>) -> Option<u32> {
        let mut state = self.state();
        let arrival = state.window.accept(seq, payload);

        if arrival.duplicate {
            self.counters.duplicates.fetch_add(1, Ordering::Relaxed);
            log::debug!("[swp:recv] ← DATA seq={seq} (duplicate)");
        } else {
            self.counters.accepted.fetch_add(1, Ordering::Relaxed);
            let n = arrival.released.len() as u64;
            if let Some(ready) = &state.ready {
                for chunk in arrival.released {
                    // The application dropping its end is not our problem.
                    let _ = ready.send(chunk);
                }
            }
            self.counters.delivered.fetch_add(n, Ordering::Relaxed);
            log::debug!(
                "[swp:recv] ← DATA seq={seq} delivered={n} held={}",
                state.window.reordered().len()
            );
        }

        state.window.watermark()
    }
}

/// Background task: the only reader of the receiver's link.
async fn recv_loop(shared: Arc<Shared>) {
    loop {
        let raw = match shared.link.recv().await {
            Ok(Some(raw)) => raw,
            Ok(None) => continue,
            Err(LinkError::Closed) => {
                log::debug!("[swp:recv] link closed; stopping receive loop");
                break;
            }
            Err(e) => {
                log::warn!("[swp:recv] receive failed: {e}");
                continue;
            }
        };

        let packet = match Packet::decode(&raw) {
            Ok(packet) => packet,
            Err(e) => {
                log::debug!("[swp:recv] dropping malformed datagram: {e}");
                continue;
            }
        };

        if packet.kind != PacketType::Data {
            log::debug!("[swp:recv] ignoring {packet}");
            continue;
        }

        let Some(ack) = shared.on_data(packet.seq, packet.payload) else {
            // Nothing contiguous yet; there is no watermark to report.
            continue;
        };

        if let Err(e) = shared.link.send(Packet::ack(ack).encode()).await {
            log::warn!("[swp:recv] failed to send ACK {ack}: {e}");
            continue;
        }
        shared.counters.acks_sent.fetch_add(1, Ordering::Relaxed);
        log::debug!("[swp:recv] → ACK {ack}");
    }

    shared.state().ready = None;
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
