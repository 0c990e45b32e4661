//! Sliding-window send-side bookkeeping.
//!
//! [`SendWindow`] tracks which chunks have been handed to the link but not
//! yet covered by a cumulative ACK.  It knows nothing about timers, the
//! window semaphore or the socket; [`crate::sender::Sender`] owns those and
//! calls into this type under its buffer lock.
//!
//! # Sequence-number layout
//!
//! ```text
//!  base               next_seq
//!    │                    │
//!  ──┼────────────────────┼──────────────────▶ seq space
//!    │ <── outstanding ──▶│ <── unassigned ──▶
//! ```
//!
//! Sequence numbers count chunks, not bytes, start at 0 and never wrap.

use std::collections::BTreeMap;

/// Outstanding chunks and the two window edges.
#[derive(Debug, Default)]
pub struct SendWindow {
    /// Smallest sequence number not yet cumulatively acknowledged.
    base: u32,
    /// Sequence number the next new chunk will receive.
    next_seq: u32,
    /// Chunks awaiting acknowledgement, keyed by sequence number.
    unacked: BTreeMap<u32, Vec<u8>>,
}

impl SendWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn next_seq(&self) -> u32 {
        self.next_seq
    }

    /// Number of chunks currently awaiting acknowledgement.
    pub fn in_flight(&self) -> usize {
        self.unacked.len()
    }

    /// Assign the next sequence number to `chunk` and hold on to it until it
    /// is acknowledged.  Returns the assigned number.
    pub fn push(&mut self, chunk: Vec<u8>) -> u32 {
        let seq = self.next_seq;
        self.unacked.insert(seq, chunk);
        self.next_seq += 1;
        seq
    }

    /// Copy of the chunk for `seq`, for retransmission.
    ///
    /// `None` when `seq` is behind `base` or already acknowledged; a timer
    /// that lost the race against an ACK ends up here.
    pub fn retransmittable(&self, seq: u32) -> Option<Vec<u8>> {
        if seq < self.base {
            return None;
        }
        self.unacked.get(&seq).cloned()
    }

    /// Apply a cumulative ACK for `ack_num`.
    ///
    /// Every sequence number in `[base, ack_num]` is removed individually and
    /// returned, so the caller can cancel exactly those timers and release
    /// exactly that many window slots.  Duplicate and stale ACKs return an
    /// empty list.  ACKs for chunks never sent (`ack_num >= next_seq`) are
    /// ignored.
    pub fn acknowledge(&mut self, ack_num: u32) -> Vec<u32> {
        if ack_num >= self.next_seq {
            return Vec::new();
        }
        let mut acked = Vec::new();
        for seq in self.base..=ack_num {
            if self.unacked.remove(&seq).is_some() {
                acked.push(seq);
            }
        }
        self.base = self.base.max(ack_num + 1);
        acked
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
