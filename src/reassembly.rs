//! Receiver-side reassembly buffer.
//!
//! DATA segments are placed by index, not by arrival order: a segment with
//! sequence number `seq` lands in slot `(seq - base) / MSS`, where `base` is
//! the connection offset (`ISN + 1`).  Out-of-order and duplicate segments
//! therefore need no special handling; a duplicate simply rewrites its slot.
//!
//! This module only manages state; socket and file I/O belong to
//! [`crate::receiver`].

use std::collections::BTreeMap;

use crate::packet::MSS;

#[derive(Debug, Default)]
pub struct ReassemblyBuffer {
    chunks: BTreeMap<u64, Vec<u8>>,
}

impl ReassemblyBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot index for `seq` relative to `base`, or `None` if `seq` precedes it.
    pub fn index_of(base: u64, seq: u64) -> Option<u64> {
        seq.checked_sub(base).map(|offset| offset / MSS as u64)
    }

    /// Store `payload` at the slot addressed by `seq`.
    ///
    /// Returns the slot index, or `None` when `seq` lies before `base`.
    pub fn insert(&mut self, base: u64, seq: u64, payload: &[u8]) -> Option<u64> {
        let index = Self::index_of(base, seq)?;
        self.chunks.insert(index, payload.to_vec());
        Some(index)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Lowest index missing from `0..=max_index`, if any.
    pub fn first_gap(&self) -> Option<u64> {
        self.chunks
            .keys()
            .enumerate()
            .find(|(expected, index)| **index != *expected as u64)
            .map(|(expected, _)| expected as u64)
    }

    /// Concatenate every stored chunk in ascending index order.
    pub fn assemble(&self) -> Vec<u8> {
        let total = self.chunks.values().map(Vec::len).sum();
        let mut out = Vec::with_capacity(total);
        for chunk in self.chunks.values() {
            out.extend_from_slice(chunk);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_is_offset_divided_by_mss() {
        assert_eq!(ReassemblyBuffer::index_of(101, 101), Some(0));
        assert_eq!(ReassemblyBuffer::index_of(101, 1101), Some(1));
        assert_eq!(ReassemblyBuffer::index_of(101, 5101), Some(5));
        assert_eq!(ReassemblyBuffer::index_of(101, 100), None);
    }

    #[test]
    fn reverse_arrival_still_assembles_in_order() {
        let mut buf = ReassemblyBuffer::new();
        buf.insert(1, 2001, b"cc");
        buf.insert(1, 1001, &[b'b'; MSS]);
        buf.insert(1, 1, &[b'a'; MSS]);

        let out = buf.assemble();
        assert_eq!(out.len(), 2 * MSS + 2);
        assert!(out[..MSS].iter().all(|&b| b == b'a'));
        assert!(out[MSS..2 * MSS].iter().all(|&b| b == b'b'));
        assert_eq!(&out[2 * MSS..], b"cc");
        assert_eq!(buf.first_gap(), None);
    }

    #[test]
    fn duplicate_rewrites_the_same_slot() {
        let mut buf = ReassemblyBuffer::new();
        assert_eq!(buf.insert(1, 1, b"x"), Some(0));
        assert_eq!(buf.insert(1, 1, b"x"), Some(0));
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.assemble(), b"x");
    }

    #[test]
    fn gap_is_reported() {
        let mut buf = ReassemblyBuffer::new();
        buf.insert(0, 0, b"a");
        buf.insert(0, 2000, b"c");
        assert_eq!(buf.first_gap(), Some(1));
    }

    #[test]
    fn segment_before_base_is_rejected() {
        let mut buf = ReassemblyBuffer::new();
        assert_eq!(buf.insert(500, 10, b"stale"), None);
        assert!(buf.is_empty());
    }
}
