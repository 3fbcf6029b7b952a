//! Upstream stages of the broadcast pipeline
//!
//! The broadcast loop drives three collaborators per frame:
//!
//! ```text
//!   FrameSource ──Frame──► FrameProcessor ──Frame──► FrameEncoder ──Bytes──► fragmenter
//!                               ▲
//!                     ProcessingParams snapshot
//! ```
//!
//! These traits are synchronous; the broadcast loop runs them on the
//! blocking thread pool so a slow camera or encoder never stalls the
//! listeners.

pub mod frame;
pub mod jpeg;
pub mod pattern;
pub mod tint;

use bytes::Bytes;

use crate::error::{EncodeError, Result};
use crate::params::ProcessingParams;

pub use frame::Frame;
pub use jpeg::JpegEncoder;
pub use pattern::TestPatternSource;
pub use tint::TintProcessor;

/// Supplies raw frames (a camera, a file, a generator)
pub trait FrameSource: Send + 'static {
    /// Acquire the underlying device
    ///
    /// Called once at startup; an error aborts the server.
    fn open(&mut self) -> Result<()> {
        Ok(())
    }

    /// Next frame, or `None` if none is available right now
    fn next_frame(&mut self) -> Option<Frame>;

    /// Release the underlying device
    ///
    /// Called once during shutdown.
    fn release(&mut self) {}
}

/// Applies the visual effect to a frame
pub trait FrameProcessor: Send + 'static {
    fn process(&mut self, frame: Frame, params: &ProcessingParams) -> Frame;
}

/// Compresses a processed frame for transmission
pub trait FrameEncoder: Send + 'static {
    fn encode(&mut self, frame: &Frame) -> std::result::Result<Bytes, EncodeError>;
}

/// Processor that returns frames untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl FrameProcessor for Passthrough {
    fn process(&mut self, frame: Frame, _params: &ProcessingParams) -> Frame {
        frame
    }
}
