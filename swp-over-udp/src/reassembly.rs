//! Receive-side reordering and cumulative-ACK state.
//!
//! [`Reassembler`] implements the selective-repeat receive rule:
//!
//! - Segments behind the watermark are **duplicates** and are not buffered.
//! - Segments at or ahead of `expected` are held in a reorder buffer.
//! - Whenever a run of consecutive sequence numbers starting at `expected`
//!   is complete, the whole run is released in order and `expected` moves
//!   past it.
//! - After every segment the caller sends a **cumulative ACK** for
//!   [`Reassembler::watermark`], the last sequence number released.
//!
//! This module only manages state; all socket I/O is the caller's
//! responsibility (see [`crate::receiver::Receiver`]).

use std::collections::BTreeMap;

/// What happened to one incoming DATA segment.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Arrival {
    /// The segment was at or behind the watermark and was not buffered.
    pub duplicate: bool,
    /// Payloads now in order, oldest first.  Empty when the segment opened
    /// or extended a gap.
    pub released: Vec<Vec<u8>>,
}

#[derive(Debug, Default)]
pub struct Reassembler {
    /// Next in-order sequence number awaited.
    expected: u32,
    /// Segments received ahead of `expected`.
    reorder: BTreeMap<u32, Vec<u8>>,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last sequence number released in order (`highSeq`).
    ///
    /// `None` until sequence 0 has been released; there is nothing to
    /// acknowledge before that.
    pub fn watermark(&self) -> Option<u32> {
        self.expected.checked_sub(1)
    }

    /// Sequence numbers waiting behind a gap, ascending.
    pub fn reordered(&self) -> Vec<u32> {
        self.reorder.keys().copied().collect()
    }

    /// Accept one DATA segment.
    pub fn accept(&mut self, seq: u32, payload: Vec<u8>) -> Arrival {
        if seq < self.expected {
            return Arrival {
                duplicate: true,
                released: Vec::new(),
            };
        }

        self.reorder.entry(seq).or_insert(payload);

        let mut released = Vec::new();
        while let Some(chunk) = self.reorder.remove(&self.expected) {
            released.push(chunk);
            self.expected += 1;
        }

        Arrival {
            duplicate: false,
            released,
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    fn chunk(i: u32) -> Vec<u8> {
        format!("chunk-{i}").into_bytes()
    }

    #[test]
    fn initial_state() {
        let r = Reassembler::new();
        assert_eq!(r.watermark(), None);
        assert!(r.reordered().is_empty());
    }

    #[test]
    fn in_order_segment_released_immediately() {
        let mut r = Reassembler::new();
        let a = r.accept(0, chunk(0));
        assert_eq!(a.released, vec![chunk(0)]);
        assert!(!a.duplicate);
        assert_eq!(r.watermark(), Some(0));
    }

    #[test]
    fn gap_holds_later_segments() {
        let mut r = Reassembler::new();
        assert_eq!(r.accept(0, chunk(0)).released, vec![chunk(0)]);
        assert!(r.accept(2, chunk(2)).released.is_empty());
        assert!(r.accept(3, chunk(3)).released.is_empty());

        assert_eq!(r.reordered(), vec![2, 3]);
        // Still acknowledging the last contiguous point, not 3.
        assert_eq!(r.watermark(), Some(0));

        let a = r.accept(1, chunk(1));
        assert_eq!(a.released, vec![chunk(1), chunk(2), chunk(3)]);
        assert!(r.reordered().is_empty());
        assert_eq!(r.watermark(), Some(3));
    }

    #[test]
    fn first_segment_missing_leaves_no_watermark() {
        let mut r = Reassembler::new();
        assert!(r.accept(1, chunk(1)).released.is_empty());
        assert_eq!(r.watermark(), None);
        assert_eq!(r.accept(0, chunk(0)).released, vec![chunk(0), chunk(1)]);
        assert_eq!(r.watermark(), Some(1));
    }

    #[test]
    fn duplicate_behind_watermark_not_rebuffered() {
        let mut r = Reassembler::new();
        r.accept(0, chunk(0));
        r.accept(1, chunk(1));
        let a = r.accept(0, chunk(0));
        assert!(a.duplicate);
        assert!(a.released.is_empty());
        assert!(r.reordered().is_empty());
        assert_eq!(r.watermark(), Some(1));
    }

    #[test]
    fn duplicate_ahead_of_gap_is_idempotent() {
        let mut r = Reassembler::new();
        r.accept(2, chunk(2));
        let a = r.accept(2, b"different".to_vec());
        assert!(!a.duplicate);
        assert_eq!(r.reordered(), vec![2]);

        r.accept(1, chunk(1));
        let a = r.accept(0, chunk(0));
        // The first copy of 2 wins.
        assert_eq!(a.released, vec![chunk(0), chunk(1), chunk(2)]);
    }

    #[test]
    fn any_arrival_order_releases_in_sequence() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..200 {
            let mut order: Vec<u32> = (0..12).collect();
            order.shuffle(&mut rng);

            let mut r = Reassembler::new();
            let mut out = Vec::new();
            for seq in order {
                out.extend(r.accept(seq, chunk(seq)).released);
            }

            let want: Vec<Vec<u8>> = (0..12).map(chunk).collect();
            assert_eq!(out, want);
            assert_eq!(r.watermark(), Some(11));
        }
    }
}
