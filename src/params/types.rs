//! Processing parameter values

use crate::error::ValidationError;

/// RGB color of the effect overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build a color from unchecked channel values
    ///
    /// Every channel must be within 0..=255.
    pub fn try_from_channels(r: i64, g: i64, b: i64) -> Result<Self, ValidationError> {
        Ok(Self {
            r: channel("r", r)?,
            g: channel("g", g)?,
            b: channel("b", b)?,
        })
    }
}

fn channel(name: &'static str, value: i64) -> Result<u8, ValidationError> {
    u8::try_from(value).map_err(|_| ValidationError::ChannelOutOfRange {
        channel: name,
        value,
    })
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RGB({}, {}, {})", self.r, self.g, self.b)
    }
}

/// Allowed blur radius range (inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlurBounds {
    pub min: u32,
    pub max: u32,
}

impl BlurBounds {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Clamp a requested radius into the bounds
    ///
    /// Never panics; inverted bounds pin every radius to `max`.
    pub fn clamp(&self, radius: i64) -> u32 {
        radius.max(self.min as i64).min(self.max as i64) as u32
    }

    /// Same bounds with `min <= max`
    pub fn ordered(self) -> Self {
        Self::new(self.min.min(self.max), self.min.max(self.max))
    }

    pub fn is_valid(&self) -> bool {
        self.min <= self.max
    }
}

impl Default for BlurBounds {
    fn default() -> Self {
        Self::new(5, 50)
    }
}

/// Clamp an intensity into 0.0..=1.0
///
/// NaN maps to 1.0.
pub fn clamp_intensity(x: f64) -> f64 {
    if x.is_nan() {
        return 1.0;
    }
    x.clamp(0.0, 1.0)
}

/// Live parameters of the frame processor's effect
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessingParams {
    pub color: Color,
    /// Blend strength, 0.0..=1.0
    pub intensity: f64,
    /// Softness radius in pixels
    pub blur: u32,
}

impl Default for ProcessingParams {
    fn default() -> Self {
        Self {
            color: Color::new(235, 148, 146),
            intensity: 0.25,
            blur: 15,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_channels() {
        assert_eq!(
            Color::try_from_channels(0, 128, 255),
            Ok(Color::new(0, 128, 255))
        );
        assert_eq!(
            Color::try_from_channels(300, 10, 10),
            Err(ValidationError::ChannelOutOfRange {
                channel: "r",
                value: 300
            })
        );
        assert_eq!(
            Color::try_from_channels(1, 2, -1),
            Err(ValidationError::ChannelOutOfRange {
                channel: "b",
                value: -1
            })
        );
    }

    #[test]
    fn test_blur_bounds_clamp() {
        let bounds = BlurBounds::default();
        assert_eq!(bounds.clamp(-3), 5);
        assert_eq!(bounds.clamp(5), 5);
        assert_eq!(bounds.clamp(20), 20);
        assert_eq!(bounds.clamp(1000), 50);
        assert_eq!(bounds.clamp(i64::MAX), 50);
        assert_eq!(bounds.clamp(i64::MIN), 5);
        assert!(!BlurBounds::new(10, 2).is_valid());
    }

    #[test]
    fn test_inverted_bounds_do_not_panic() {
        let inverted = BlurBounds::new(10, 2);
        assert_eq!(inverted.clamp(7), 2);
        assert_eq!(inverted.ordered(), BlurBounds::new(2, 10));
        assert_eq!(inverted.ordered().clamp(7), 7);
    }

    #[test]
    fn test_clamp_intensity() {
        assert_eq!(clamp_intensity(1.5), 1.0);
        assert_eq!(clamp_intensity(-0.1), 0.0);
        assert_eq!(clamp_intensity(0.4), 0.4);
        assert_eq!(clamp_intensity(f64::INFINITY), 1.0);
        assert_eq!(clamp_intensity(f64::NEG_INFINITY), 0.0);
        assert_eq!(clamp_intensity(f64::NAN), 1.0);
    }

    #[test]
    fn test_defaults() {
        let params = ProcessingParams::default();
        assert_eq!(params.color, Color::new(235, 148, 146));
        assert_eq!(params.intensity, 0.25);
        assert_eq!(params.blur, 15);
    }
}
