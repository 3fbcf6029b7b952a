//! Statistics for the broadcast loop

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Live broadcast counters
///
/// Updated by the broadcast loop, readable from anywhere via [`snapshot`].
///
/// [`snapshot`]: BroadcastStats::snapshot
#[derive(Debug)]
pub struct BroadcastStats {
    started_at: Instant,
    frames_sent: AtomicU64,
    frames_dropped: AtomicU64,
    encode_failures: AtomicU64,
    fragments_sent: AtomicU64,
    bytes_sent: AtomicU64,
    clients_evicted: AtomicU64,
    last_sequence: AtomicU64,
}

impl BroadcastStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            frames_sent: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
            encode_failures: AtomicU64::new(0),
            fragments_sent: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            clients_evicted: AtomicU64::new(0),
            last_sequence: AtomicU64::new(0),
        }
    }

    /// A frame was encoded and handed to the fan-out
    pub fn record_frame(&self, sequence: u32) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.last_sequence.store(sequence as u64, Ordering::Relaxed);
    }

    /// The source had no frame available
    pub fn record_drop(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_encode_failure(&self) {
        self.encode_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// One datagram left the socket
    pub fn record_fragment(&self, bytes: usize) {
        self.fragments_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.clients_evicted.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy of the current counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            uptime: self.started_at.elapsed(),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            encode_failures: self.encode_failures.load(Ordering::Relaxed),
            fragments_sent: self.fragments_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            clients_evicted: self.clients_evicted.load(Ordering::Relaxed),
            last_sequence: self.last_sequence.load(Ordering::Relaxed) as u32,
        }
    }
}

impl Default for BroadcastStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`BroadcastStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub uptime: Duration,
    /// Frames encoded and fanned out
    pub frames_sent: u64,
    /// Source returned no frame
    pub frames_dropped: u64,
    /// Encoder failed
    pub encode_failures: u64,
    /// Datagrams sent across all clients
    pub fragments_sent: u64,
    /// Bytes sent across all clients, headers included
    pub bytes_sent: u64,
    /// Clients removed after a send failure
    pub clients_evicted: u64,
    /// Sequence number of the most recent frame
    pub last_sequence: u32,
}

impl StatsSnapshot {
    /// Average outgoing bitrate in bits per second
    pub fn bitrate(&self) -> u64 {
        let secs = self.uptime.as_secs();
        if secs > 0 {
            (self.bytes_sent * 8) / secs
        } else {
            0
        }
    }

    /// Average frame rate since start
    pub fn framerate(&self) -> f64 {
        let secs = self.uptime.as_secs_f64();
        if secs > 0.0 {
            self.frames_sent as f64 / secs
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stats_are_zero() {
        let snap = BroadcastStats::new().snapshot();
        assert_eq!(snap.frames_sent, 0);
        assert_eq!(snap.frames_dropped, 0);
        assert_eq!(snap.encode_failures, 0);
        assert_eq!(snap.fragments_sent, 0);
        assert_eq!(snap.bytes_sent, 0);
        assert_eq!(snap.clients_evicted, 0);
        assert_eq!(snap.last_sequence, 0);
    }

    #[test]
    fn test_counters() {
        let stats = BroadcastStats::new();
        stats.record_frame(1);
        stats.record_frame(2);
        stats.record_drop();
        stats.record_encode_failure();
        stats.record_fragment(100);
        stats.record_fragment(50);
        stats.record_eviction();

        let snap = stats.snapshot();
        assert_eq!(snap.frames_sent, 2);
        assert_eq!(snap.last_sequence, 2);
        assert_eq!(snap.frames_dropped, 1);
        assert_eq!(snap.encode_failures, 1);
        assert_eq!(snap.fragments_sent, 2);
        assert_eq!(snap.bytes_sent, 150);
        assert_eq!(snap.clients_evicted, 1);
    }

    #[test]
    fn test_bitrate() {
        let snap = StatsSnapshot {
            uptime: Duration::from_secs(10),
            bytes_sent: 1_000_000,
            ..Default::default()
        };
        // 1,000,000 bytes * 8 bits / 10 seconds
        assert_eq!(snap.bitrate(), 800_000);
    }

    #[test]
    fn test_bitrate_zero_duration() {
        let snap = StatsSnapshot {
            bytes_sent: 1_000_000,
            ..Default::default()
        };
        assert_eq!(snap.bitrate(), 0);
        assert_eq!(snap.framerate(), 0.0);
    }

    #[test]
    fn test_framerate() {
        let snap = StatsSnapshot {
            uptime: Duration::from_secs(2),
            frames_sent: 30,
            ..Default::default()
        };
        assert_eq!(snap.framerate(), 15.0);
    }
}
