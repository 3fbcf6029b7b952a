//! JPEG encoder stage

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder as ImageJpegEncoder;
use image::ColorType;

use crate::error::EncodeError;

use super::{Frame, FrameEncoder};

/// Encodes RGB8 frames as baseline JPEG
#[derive(Debug, Clone, Copy)]
pub struct JpegEncoder {
    quality: u8,
}

impl JpegEncoder {
    /// Create an encoder; quality is clamped to 1..=100
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl Default for JpegEncoder {
    fn default() -> Self {
        Self::new(40)
    }
}

impl FrameEncoder for JpegEncoder {
    fn encode(&mut self, frame: &Frame) -> Result<Bytes, EncodeError> {
        if frame.width == 0 || frame.height == 0 {
            return Err(EncodeError::new("empty frame"));
        }
        if !frame.is_well_formed() {
            return Err(EncodeError::new(format!(
                "buffer is {} bytes, expected {} for {}x{}",
                frame.data.len(),
                Frame::expected_len(frame.width, frame.height),
                frame.width,
                frame.height
            )));
        }

        let mut out = Vec::with_capacity(frame.data.len() / 8);
        ImageJpegEncoder::new_with_quality(&mut out, self.quality)
            .encode(&frame.data, frame.width, frame.height, ColorType::Rgb8)
            .map_err(|e| EncodeError::new(e.to_string()))?;

        Ok(Bytes::from(out))
    }
}
