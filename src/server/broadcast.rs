//! Broadcast loop
//!
//! One iteration per frame:
//!
//! ```text
//!   source.next_frame() ──none──► backoff, retry
//!        │
//!   processor.process(frame, params snapshot)
//!        │
//!   encoder.encode() ──err──► skip to pacing
//!        │
//!   sequence += 1, fragment
//!        │
//!   for client in registry snapshot:
//!       send fragments in index order ──err──► evict client, next client
//!        │
//!   sleep(frame_interval - elapsed)
//! ```
//!
//! An overrun iteration starts the next one immediately; there is no
//! catch-up.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::net::UdpSocket;

use crate::error::EncodeError;
use crate::params::{ParameterStore, ProcessingParams};
use crate::pipeline::{FrameEncoder, FrameProcessor, FrameSource};
use crate::protocol::fragment::Fragmenter;
use crate::registry::ClientRegistry;
use crate::stats::BroadcastStats;

use super::config::ServerConfig;
use super::shutdown::RunFlag;

/// Monotonic frame counter wrapping at a configured modulus
#[derive(Debug, Clone)]
pub struct SequenceCounter {
    current: u64,
    modulus: u64,
}

impl SequenceCounter {
    /// Counter whose first `next()` is 1
    ///
    /// `modulus` is capped at 2^32 so every value fits the wire header.
    pub fn new(modulus: u64) -> Self {
        Self {
            current: 0,
            modulus: modulus.clamp(2, 1 << 32),
        }
    }

    /// Advance and return the new sequence number
    pub fn next(&mut self) -> u32 {
        self.current = (self.current + 1) % self.modulus;
        self.current as u32
    }

    /// Last value handed out (0 before the first frame)
    pub fn current(&self) -> u32 {
        self.current as u32
    }
}

/// Result of running the upstream stages once
#[derive(Debug)]
pub enum StageOutput {
    /// Source had nothing
    NoFrame,
    /// Encoder failed
    EncodeFailed(EncodeError),
    /// Encoded frame ready to send
    Encoded(Bytes),
}

/// Source, processor and encoder owned together
///
/// The source is released exactly once, either explicitly during shutdown
/// or when the stages are dropped.
pub struct Stages<S: FrameSource, P: FrameProcessor, E: FrameEncoder> {
    source: S,
    processor: P,
    encoder: E,
    released: bool,
}

impl<S: FrameSource, P: FrameProcessor, E: FrameEncoder> Stages<S, P, E> {
    pub fn new(source: S, processor: P, encoder: E) -> Self {
        Self {
            source,
            processor,
            encoder,
            released: false,
        }
    }

    /// Open the source
    pub fn open(&mut self) -> crate::error::Result<()> {
        self.source.open()
    }

    /// Pull, process and encode one frame
    pub fn produce(&mut self, params: &ProcessingParams) -> StageOutput {
        if self.released {
            return StageOutput::NoFrame;
        }
        let Some(frame) = self.source.next_frame() else {
            return StageOutput::NoFrame;
        };
        let processed = self.processor.process(frame, params);
        match self.encoder.encode(&processed) {
            Ok(data) => StageOutput::Encoded(data),
            Err(e) => StageOutput::EncodeFailed(e),
        }
    }

    pub fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.source.release();
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }
}

impl<S: FrameSource, P: FrameProcessor, E: FrameEncoder> Drop for Stages<S, P, E> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Sleep owed after an iteration that took `elapsed`
///
/// Zero once the budget is spent; an overrun is never paid back.
pub fn pacing_delay(frame_interval: Duration, elapsed: Duration) -> Duration {
    frame_interval.saturating_sub(elapsed)
}

/// Stages shared between the broadcast loop and the server's teardown
pub type SharedStages<S, P, E> = Arc<Mutex<Stages<S, P, E>>>;

/// What happened to one frame's fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOut {
    /// Clients that got every fragment
    pub delivered: usize,
    /// Clients evicted after a send error
    pub evicted: usize,
}

/// Frame broadcast worker
pub struct BroadcastLoop<S: FrameSource, P: FrameProcessor, E: FrameEncoder> {
    socket: Arc<UdpSocket>,
    registry: Arc<ClientRegistry>,
    params: Arc<ParameterStore>,
    stats: Arc<BroadcastStats>,
    running: RunFlag,
    stages: SharedStages<S, P, E>,
    fragmenter: Fragmenter,
    sequence: SequenceCounter,
    frame_interval: Duration,
    retry_backoff: Duration,
    summary_every: u64,
}

impl<S: FrameSource, P: FrameProcessor, E: FrameEncoder> BroadcastLoop<S, P, E> {
    pub fn new(
        config: &ServerConfig,
        socket: Arc<UdpSocket>,
        registry: Arc<ClientRegistry>,
        params: Arc<ParameterStore>,
        stats: Arc<BroadcastStats>,
        running: RunFlag,
        stages: SharedStages<S, P, E>,
    ) -> Self {
        Self {
            socket,
            registry,
            params,
            stats,
            running,
            stages,
            fragmenter: Fragmenter::new(config.max_datagram_size),
            sequence: SequenceCounter::new(config.sequence_modulus),
            frame_interval: config.frame_interval(),
            retry_backoff: config.source_retry_backoff,
            summary_every: config.stats_interval_frames(),
        }
    }

    /// Run upstream stages on the blocking pool
    async fn produce(&self) -> StageOutput {
        let params = self.params.snapshot().await;
        let stages = Arc::clone(&self.stages);

        let result = tokio::task::spawn_blocking(move || {
            let mut stages = stages.lock().unwrap_or_else(PoisonError::into_inner);
            stages.produce(&params)
        })
        .await;

        match result {
            Ok(output) => output,
            Err(e) => {
                tracing::error!(error = %e, "Frame pipeline task failed");
                StageOutput::NoFrame
            }
        }
    }

    /// Send every datagram to every client in `clients`
    ///
    /// A client whose send fails is evicted and skips its remaining
    /// fragments; other clients are unaffected.
    pub async fn fan_out(&self, datagrams: &[Bytes], clients: &[SocketAddr]) -> FanOut {
        let mut result = FanOut::default();

        for client in clients {
            let mut failed = false;

            for datagram in datagrams {
                match self.socket.send_to(datagram, *client).await {
                    Ok(_) => self.stats.record_fragment(datagram.len()),
                    Err(e) => {
                        tracing::warn!(client = %client, error = %e, "Send failed, dropping client");
                        failed = true;
                        break;
                    }
                }
            }

            if failed {
                self.registry.unregister(client).await;
                self.stats.record_eviction();
                result.evicted += 1;
            } else {
                result.delivered += 1;
            }
        }

        result
    }

    /// One pass of the state machine, excluding pacing
    ///
    /// Returns `false` when the source had no frame and the caller should
    /// back off instead of pacing.
    async fn step(&mut self) -> bool {
        let payload = match self.produce().await {
            StageOutput::NoFrame => {
                tracing::warn!("Dropped frame");
                self.stats.record_drop();
                return false;
            }
            StageOutput::EncodeFailed(e) => {
                tracing::warn!(error = %e, "Frame encoding failed");
                self.stats.record_encode_failure();
                return true;
            }
            StageOutput::Encoded(payload) => payload,
        };

        if payload.is_empty() {
            tracing::warn!("Encoder produced an empty frame, skipping");
            self.stats.record_encode_failure();
            return true;
        }

        let sequence = self.sequence.next();
        let datagrams = self.fragmenter.fragment(sequence, &payload);
        let clients = self.registry.snapshot().await;

        let fan_out = self.fan_out(&datagrams, &clients).await;
        self.stats.record_frame(sequence);

        if sequence as u64 % self.summary_every == 1 {
            tracing::debug!(
                sequence = sequence,
                bytes = payload.len(),
                fragments = datagrams.len(),
                clients = fan_out.delivered,
                evicted = fan_out.evicted,
                "Frame broadcast"
            );
        }

        true
    }

    /// Broadcast until the run flag is cleared
    pub async fn run(mut self) {
        tracing::info!(
            interval_ms = self.frame_interval.as_millis() as u64,
            payload_capacity = self.fragmenter.payload_capacity(),
            "Starting frame broadcast"
        );

        while self.running.is_running() {
            let started = Instant::now();

            if !self.step().await {
                tokio::time::sleep(self.retry_backoff).await;
                continue;
            }

            let delay = pacing_delay(self.frame_interval, started.elapsed());
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        tracing::debug!(last_sequence = self.sequence.current(), "Broadcast loop stopped");
    }
}
