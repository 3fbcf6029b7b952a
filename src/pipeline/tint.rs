//! Soft color tint effect
//!
//! Blends the configured color into an elliptical region centred in the
//! frame. Inside the ellipse the blend weight is `intensity`; past its edge
//! the weight falls off smoothly over a band whose width grows with the blur
//! radius.

use crate::params::ProcessingParams;

use super::{Frame, FrameProcessor};

/// Ellipse radii as a fraction of frame width/height
const REGION_SCALE: f64 = 0.35;

/// Elliptical tint overlay
#[derive(Debug, Clone, Copy, Default)]
pub struct TintProcessor;

impl TintProcessor {
    pub fn new() -> Self {
        Self
    }
}

/// Blend weight for a point at normalized elliptical distance `d`
fn falloff(d: f64, feather: f64) -> f64 {
    if d <= 1.0 {
        return 1.0;
    }
    if feather <= 0.0 {
        return 0.0;
    }
    let t = ((d - 1.0) / feather).min(1.0);
    // smoothstep from 1 down to 0
    1.0 - t * t * (3.0 - 2.0 * t)
}

impl FrameProcessor for TintProcessor {
    fn process(&mut self, mut frame: Frame, params: &ProcessingParams) -> Frame {
        if params.intensity <= 0.0 || !frame.is_well_formed() || frame.data.is_empty() {
            return frame;
        }

        let w = frame.width as f64;
        let h = frame.height as f64;
        let (cx, cy) = (w / 2.0, h / 2.0);
        let (rx, ry) = ((w * REGION_SCALE).max(1.0), (h * REGION_SCALE).max(1.0));
        let feather = params.blur as f64 / rx.min(ry);
        let color = [
            params.color.r as f64,
            params.color.g as f64,
            params.color.b as f64,
        ];
        let width = frame.width as usize;

        for (i, px) in frame.data.chunks_exact_mut(Frame::CHANNELS).enumerate() {
            let x = (i % width) as f64 + 0.5;
            let y = (i / width) as f64 + 0.5;
            let dx = (x - cx) / rx;
            let dy = (y - cy) / ry;
            let d = (dx * dx + dy * dy).sqrt();

            let alpha = falloff(d, feather) * params.intensity;
            if alpha <= 0.0 {
                continue;
            }
            for (c, target) in px.iter_mut().zip(color) {
                *c = (*c as f64 * (1.0 - alpha) + target * alpha).round() as u8;
            }
        }

        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Color;

    fn params(intensity: f64, blur: u32) -> ProcessingParams {
        ProcessingParams {
            color: Color::new(200, 100, 50),
            intensity,
            blur,
        }
    }

    #[test]
    fn test_zero_intensity_is_identity() {
        let frame = Frame::new(20, 20);
        let out = TintProcessor::new().process(frame.clone(), &params(0.0, 15));
        assert_eq!(out, frame);
    }

    #[test]
    fn test_full_intensity_center_takes_color() {
        let out = TintProcessor::new().process(Frame::new(40, 40), &params(1.0, 5));
        assert_eq!(out.pixel(20, 20), Some([200, 100, 50]));
    }

    #[test]
    fn test_partial_blend() {
        let out = TintProcessor::new().process(Frame::new(40, 40), &params(0.5, 5));
        assert_eq!(out.pixel(20, 20), Some([100, 50, 25]));
    }

    #[test]
    fn test_corners_untouched_with_small_blur() {
        let out = TintProcessor::new().process(Frame::new(100, 100), &params(1.0, 5));
        assert_eq!(out.pixel(0, 0), Some([0, 0, 0]));
    }

    #[test]
    fn test_larger_blur_spreads_further() {
        let sharp = TintProcessor::new().process(Frame::new(100, 100), &params(1.0, 5));
        let soft = TintProcessor::new().process(Frame::new(100, 100), &params(1.0, 50));

        // Just outside the ellipse edge on the horizontal axis
        let sharp_px = sharp.pixel(88, 50).unwrap();
        let soft_px = soft.pixel(88, 50).unwrap();
        assert!(soft_px[0] > sharp_px[0]);
    }

    #[test]
    fn test_falloff_shape() {
        assert_eq!(falloff(0.5, 0.2), 1.0);
        assert_eq!(falloff(1.0, 0.2), 1.0);
        assert_eq!(falloff(1.3, 0.2), 0.0);
        assert_eq!(falloff(1.5, 0.0), 0.0);
        let mid = falloff(1.1, 0.2);
        assert!(mid > 0.0 && mid < 1.0);
    }
}
