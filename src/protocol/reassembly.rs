//! Receiver-side frame reassembly
//!
//! Fragments may arrive out of order, duplicated, or not at all. The
//! reassembler keeps a small number of partially received frames keyed by
//! sequence number and hands back a frame once every index is present.
//! Anything at or behind the newest completed frame is stale and dropped.
//!
//! Sequence comparison uses serial-number arithmetic, so ordering survives
//! the u32 wrap.

use std::collections::HashMap;

use bytes::{Bytes, BytesMut};

use super::fragment::Fragment;

/// Default number of incomplete frames kept at once
pub const DEFAULT_MAX_IN_FLIGHT: usize = 4;

/// Frames claiming more fragments than this are rejected
pub const MAX_FRAGMENTS_PER_FRAME: u32 = 4096;

/// A fully reassembled frame
#[derive(Debug, Clone)]
pub struct CompletedFrame {
    pub sequence: u32,
    pub data: Bytes,
}

/// Counters for what the reassembler threw away
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReassemblyStats {
    /// Frames completed
    pub completed: u64,
    /// Fragments for frames at or behind the newest completed one
    pub stale_fragments: u64,
    /// Duplicate fragments
    pub duplicate_fragments: u64,
    /// Incomplete frames evicted or superseded
    pub incomplete_frames: u64,
    /// Fragments with an unusable header
    pub rejected_fragments: u64,
}

#[derive(Debug)]
struct PendingFrame {
    total: u32,
    received: u32,
    size: usize,
    slots: Vec<Option<Bytes>>,
}

impl PendingFrame {
    fn new(total: u32) -> Self {
        Self {
            total,
            received: 0,
            size: 0,
            slots: vec![None; total as usize],
        }
    }

    fn is_complete(&self) -> bool {
        self.received == self.total
    }

    fn assemble(self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.size);
        for chunk in self.slots.into_iter().flatten() {
            buf.extend_from_slice(&chunk);
        }
        buf.freeze()
    }
}

/// True if `a` comes after `b` in serial-number order
pub fn sequence_newer(a: u32, b: u32) -> bool {
    a != b && a.wrapping_sub(b) < 0x8000_0000
}

/// Reassembles fragments into frames
#[derive(Debug)]
pub struct Reassembler {
    max_in_flight: usize,
    pending: HashMap<u32, PendingFrame>,
    last_completed: Option<u32>,
    stats: ReassemblyStats,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::with_max_in_flight(DEFAULT_MAX_IN_FLIGHT)
    }

    pub fn with_max_in_flight(max_in_flight: usize) -> Self {
        Self {
            max_in_flight: max_in_flight.max(1),
            pending: HashMap::new(),
            last_completed: None,
            stats: ReassemblyStats::default(),
        }
    }

    /// Feed one fragment; returns the frame if this fragment completed it
    pub fn push(&mut self, fragment: Fragment) -> Option<CompletedFrame> {
        let header = fragment.header;
        let sequence = header.sequence;

        if header.total_fragments == 0
            || header.total_fragments > MAX_FRAGMENTS_PER_FRAME
            || header.fragment_index >= header.total_fragments
        {
            self.stats.rejected_fragments += 1;
            return None;
        }

        if let Some(last) = self.last_completed {
            if !sequence_newer(sequence, last) {
                self.stats.stale_fragments += 1;
                return None;
            }
        }

        let entry = self
            .pending
            .entry(sequence)
            .or_insert_with(|| PendingFrame::new(header.total_fragments));

        // Header disagrees with what we saw earlier for this sequence
        if entry.total != header.total_fragments {
            tracing::debug!(
                sequence = sequence,
                expected = entry.total,
                actual = header.total_fragments,
                "Fragment total changed, restarting frame"
            );
            *entry = PendingFrame::new(header.total_fragments);
            self.stats.incomplete_frames += 1;
        }

        let slot = &mut entry.slots[header.fragment_index as usize];
        if slot.is_some() {
            self.stats.duplicate_fragments += 1;
            return None;
        }
        entry.size += fragment.payload.len();
        *slot = Some(fragment.payload);
        entry.received += 1;

        if entry.is_complete() {
            let frame = self.pending.remove(&sequence)?;
            self.complete(sequence);
            return Some(CompletedFrame {
                sequence,
                data: frame.assemble(),
            });
        }

        self.evict_excess();
        None
    }

    fn complete(&mut self, sequence: u32) {
        self.last_completed = Some(sequence);
        self.stats.completed += 1;

        let before = self.pending.len();
        self.pending.retain(|&seq, _| sequence_newer(seq, sequence));
        self.stats.incomplete_frames += (before - self.pending.len()) as u64;
    }

    fn evict_excess(&mut self) {
        while self.pending.len() > self.max_in_flight {
            let oldest = self
                .pending
                .keys()
                .copied()
                .reduce(|a, b| if sequence_newer(a, b) { b } else { a });

            match oldest {
                Some(seq) => {
                    self.pending.remove(&seq);
                    self.stats.incomplete_frames += 1;
                }
                None => break,
            }
        }
    }

    /// Number of frames currently being assembled
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Sequence of the newest completed frame
    pub fn last_completed(&self) -> Option<u32> {
        self.last_completed
    }

    pub fn stats(&self) -> ReassemblyStats {
        self.stats
    }
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new()
    }
}
