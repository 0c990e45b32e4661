//! Sliding-window sender engine.
//!
//! [`Sender`] turns application buffers into numbered DATA packets, keeps at
//! most `window_size` of them outstanding, and re-sends each one every
//! `retransmit_timeout` until a cumulative ACK covers it.
//!
//! # Concurrency
//!
//! Three kinds of task touch the sender state:
//!
//! - the caller's task, inside [`Sender::send`];
//! - the background ACK loop, spawned at construction;
//! - one retransmission timer task per outstanding chunk.
//!
//! State is split across two locks, always taken in this order:
//!
//! 1. the send buffer ([`SendWindow`]: `base`, `next_seq`, unacked chunks);
//! 2. the [`TimerTable`].
//!
//! The window itself is a [`Semaphore`] with one permit per slot: `send`
//! consumes a permit per chunk and the ACK loop adds one back per chunk it
//! removes.  No lock is held while awaiting the link.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::config::SwpConfig;
use crate::error::SwpError;
use crate::link::{Link, LinkError};
use crate::packet::{Packet, PacketType, MAX_PAYLOAD};
use crate::send_window::SendWindow;
use crate::simulator::LossModel;
use crate::socket::UdpLink;
use crate::timer::TimerTable;

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Snapshot of the sender's packet counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SenderStats {
    /// DATA packets sent for the first time.
    pub transmitted: u64,
    /// DATA packets re-sent by a retransmission timer.
    pub retransmitted: u64,
    /// ACK packets processed, including duplicates.
    pub acks_received: u64,
}

#[derive(Debug, Default)]
struct Counters {
    transmitted: AtomicU64,
    retransmitted: AtomicU64,
    acks_received: AtomicU64,
}

// ---------------------------------------------------------------------------
// Sender
// ---------------------------------------------------------------------------

/// The sending half of an SWP connection.
///
/// `send` is meant to be driven by a single writer; concurrent calls do not
/// corrupt state but their chunks may interleave on the wire.
pub struct Sender {
    shared: Arc<Shared>,
    recv_task: JoinHandle<()>,
    local_addr: Option<SocketAddr>,
}

struct Shared {
    link: Arc<dyn Link>,
    window_size: usize,
    rto: Duration,
    slots: Semaphore,
    buffer: Mutex<SendWindow>,
    timers: TimerTable,
    counters: Counters,
}

impl Sender {
    /// Open a UDP link towards `remote` and start the ACK loop.
    pub async fn connect(remote: SocketAddr, config: SwpConfig) -> Result<Self, SwpError> {
        config.validate()?;
        let loss = LossModel::new(config.loss_probability, config.seed)?;
        let drop_rate = loss.probability();
        let link = UdpLink::connect(remote, loss).await?;
        let local_addr = link.local_addr;
        log::info!("[swp:send] {local_addr} → {remote} (loss {drop_rate})");

        let mut sender = Self::with_link(Arc::new(link), config)?;
        sender.local_addr = Some(local_addr);
        Ok(sender)
    }

    /// Run the sender over an arbitrary link.
    ///
    /// `config.loss_probability` is not applied here; the link carries its
    /// own loss model.
    pub fn with_link(link: Arc<dyn Link>, config: SwpConfig) -> Result<Self, SwpError> {
        config.validate()?;
        let shared = Arc::new(Shared {
            link,
            window_size: config.window_size,
            rto: config.retransmit_timeout,
            slots: Semaphore::new(config.window_size),
            buffer: Mutex::new(SendWindow::new()),
            timers: TimerTable::new(),
            counters: Counters::default(),
        });
        let recv_task = tokio::spawn(ack_loop(Arc::clone(&shared)));
        Ok(Self {
            shared,
            recv_task,
            local_addr: None,
        })
    }

    /// Send `data` as a sequence of chunks of at most [`MAX_PAYLOAD`] bytes.
    ///
    /// Returns once every chunk has been handed to the link; blocks whenever
    /// the window is full.  An empty buffer sends nothing.
    pub async fn send(&self, data: &[u8]) -> Result<(), SwpError> {
        for chunk in data.chunks(MAX_PAYLOAD) {
            self.shared.send_chunk(chunk.to_vec()).await?;
        }
        Ok(())
    }

    /// Wait until every chunk sent so far has been acknowledged.
    pub async fn flush(&self) -> Result<(), SwpError> {
        let all = self.shared.window_size as u32;
        let _permits = self
            .shared
            .slots
            .acquire_many(all)
            .await
            .map_err(|_| SwpError::Closed)?;
        Ok(())
    }

    /// Number of chunks awaiting acknowledgement.
    pub fn in_flight(&self) -> usize {
        self.shared.buffer().in_flight()
    }

    /// Smallest sequence number not yet acknowledged.
    pub fn base(&self) -> u32 {
        self.shared.buffer().base()
    }

    /// Sequence number the next chunk will get.
    pub fn next_seq(&self) -> u32 {
        self.shared.buffer().next_seq()
    }

    /// Sequence numbers with a live retransmission timer.
    pub fn armed_timers(&self) -> Vec<u32> {
        self.shared.timers.armed()
    }

    /// Packet counters so far.
    pub fn stats(&self) -> SenderStats {
        let c = &self.shared.counters;
        SenderStats {
            transmitted: c.transmitted.load(Ordering::Relaxed),
            retransmitted: c.retransmitted.load(Ordering::Relaxed),
            acks_received: c.acks_received.load(Ordering::Relaxed),
        }
    }

    /// Local UDP address, when running over [`UdpLink`].
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}

impl Drop for Sender {
    fn drop(&mut self) {
        self.recv_task.abort();
        self.shared.slots.close();
        self.shared.timers.cancel_all();
    }
}

// ---------------------------------------------------------------------------
// Send, retransmit and ACK paths
// ---------------------------------------------------------------------------

impl Shared {
    fn buffer(&self) -> MutexGuard<'_, SendWindow> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn send_chunk(self: &Arc<Self>, chunk: Vec<u8>) -> Result<(), SwpError> {
        self.slots
            .acquire()
            .await
            .map_err(|_| SwpError::Closed)?
            .forget();

        // The chunk and its timer are recorded together, before the first
        // await, so a dropped `send` still leaves the chunk under a timer.
        let packet = {
            let mut buffer = self.buffer();
            if self.slots.is_closed() {
                return Err(SwpError::Closed);
            }
            let packet = Packet::data(buffer.next_seq(), chunk);
            buffer.push(packet.payload.clone());
            self.timers.lock().arm(packet.seq, self.spawn_timer(packet.seq));
            packet
        };

        if self.transmit(&packet).await {
            self.counters.transmitted.fetch_add(1, Ordering::Relaxed);
        }
        log::debug!("[swp:send] → {packet}");
        Ok(())
    }

    /// Spawn the retransmission timer for `seq`.
    ///
    /// The timer keeps firing every `rto` until the retransmit routine finds
    /// the chunk acknowledged, or until the ACK path aborts it.
    fn spawn_timer(self: &Arc<Self>, seq: u32) -> JoinHandle<()> {
        let shared = Arc::clone(self);
        let rto = self.rto;
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(rto).await;
                if !shared.retransmit(seq).await {
                    break;
                }
            }
        })
    }

    /// Re-send `seq` if it is still outstanding.  Returns whether anything
    /// was sent.
    async fn retransmit(&self, seq: u32) -> bool {
        let chunk = self.buffer().retransmittable(seq);
        let Some(chunk) = chunk else {
            log::debug!("[swp:send] timer for seq={seq} fired after ACK; ignoring");
            return false;
        };

        let packet = Packet::data(seq, chunk);
        if self.transmit(&packet).await {
            self.counters.retransmitted.fetch_add(1, Ordering::Relaxed);
        }
        log::debug!("[swp:send] timeout; ↻ {packet}");
        true
    }

    /// Apply a cumulative ACK.  Returns how many chunks it newly covered.
    fn on_ack(&self, ack_num: u32) -> usize {
        self.counters.acks_received.fetch_add(1, Ordering::Relaxed);

        let acked = {
            let mut buffer = self.buffer();
            let acked = buffer.acknowledge(ack_num);
            let mut timers = self.timers.lock();
            for &seq in &acked {
                timers.cancel(seq);
            }
            acked
        };

        if acked.is_empty() {
            log::debug!("[swp:send] ← ACK {ack_num} (duplicate)");
        } else {
            self.slots.add_permits(acked.len());
            log::debug!("[swp:send] ← ACK {ack_num} (slid {})", acked.len());
        }
        acked.len()
    }

    /// Hand `packet` to the link.  Returns whether the link accepted it.
    async fn transmit(&self, packet: &Packet) -> bool {
        match self.link.send(packet.encode()).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("[swp:send] failed to send {packet}: {e}");
                false
            }
        }
    }
}

/// Background task: the only reader of the sender's link.
async fn ack_loop(shared: Arc<Shared>) {
    loop {
        let raw = match shared.link.recv().await {
            Ok(Some(raw)) => raw,
            Ok(None) => continue,
            Err(LinkError::Closed) => {
                log::debug!("[swp:send] link closed; stopping ACK loop");
                break;
            }
            Err(e) => {
                log::warn!("[swp:send] receive failed: {e}");
                continue;
            }
        };

        let packet = match Packet::decode(&raw) {
            Ok(packet) => packet,
            Err(e) => {
                log::debug!("[swp:send] dropping malformed datagram: {e}");
                continue;
            }
        };

        if packet.kind != PacketType::Ack {
            log::debug!("[swp:send] ignoring {packet}");
            continue;
        }
        shared.on_ack(packet.seq);
    }

    // Nobody will ever release another slot, and nothing sent from here on
    // can reach the peer.  Held under the buffer lock so no chunk is armed
    // after the sweep.
    let buffer = shared.buffer();
    shared.slots.close();
    shared.timers.cancel_all();
    drop(buffer);
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
