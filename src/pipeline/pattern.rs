//! Synthetic frame source
//!
//! Generates a scrolling color gradient so the server can run without a
//! camera. Useful for demos and tests.

use crate::error::{Error, Result};

use super::{Frame, FrameSource};

/// Moving gradient generator
#[derive(Debug, Clone)]
pub struct TestPatternSource {
    width: u32,
    height: u32,
    /// Calls to `next_frame` so far
    calls: u64,
    /// Frames actually produced
    produced: u64,
    /// Stop producing after this many frames
    limit: Option<u64>,
    /// Return `None` on every n-th call
    drop_every: Option<u64>,
    opened: bool,
    released: bool,
}

impl TestPatternSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            calls: 0,
            produced: 0,
            limit: None,
            drop_every: None,
            opened: false,
            released: false,
        }
    }

    /// Produce at most `frames` frames, then report none available
    pub fn with_limit(mut self, frames: u64) -> Self {
        self.limit = Some(frames);
        self
    }

    /// Simulate a dropped capture on every `n`-th call
    pub fn drop_every(mut self, n: u64) -> Self {
        self.drop_every = if n > 0 { Some(n) } else { None };
        self
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn frames_produced(&self) -> u64 {
        self.produced
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    fn render(&self, tick: u64) -> Frame {
        let mut frame = Frame::new(self.width, self.height);
        let shift = (tick as u32).wrapping_mul(4);
        let w = self.width.max(1);
        let h = self.height.max(1);

        for (i, px) in frame.data.chunks_exact_mut(Frame::CHANNELS).enumerate() {
            let x = i as u32 % w;
            let y = i as u32 / w;
            px[0] = ((x + shift % w) % w * 255 / w) as u8;
            px[1] = (y * 255 / h) as u8;
            px[2] = (shift % 256) as u8;
        }

        frame
    }
}

impl FrameSource for TestPatternSource {
    fn open(&mut self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::SourceUnavailable(format!(
                "unsupported resolution {}x{}",
                self.width, self.height
            )));
        }
        self.opened = true;
        tracing::info!(width = self.width, height = self.height, "Test pattern source opened");
        Ok(())
    }

    fn next_frame(&mut self) -> Option<Frame> {
        if !self.opened || self.released {
            return None;
        }

        self.calls += 1;
        if let Some(n) = self.drop_every {
            if self.calls % n == 0 {
                return None;
            }
        }
        if let Some(limit) = self.limit {
            if self.produced >= limit {
                return None;
            }
        }

        let frame = self.render(self.produced);
        self.produced += 1;
        Some(frame)
    }

    fn release(&mut self) {
        self.released = true;
        tracing::debug!(frames = self.produced, "Test pattern source released");
    }
}
