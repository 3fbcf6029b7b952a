//! Raw frame buffer

/// An RGB8 frame, row-major, tightly packed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Frame {
    /// Bytes per pixel
    pub const CHANNELS: usize = 3;

    /// Create a black frame
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; Self::expected_len(width, height)],
        }
    }

    /// Wrap an existing buffer
    ///
    /// Returns `None` if the buffer length does not match the dimensions.
    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != Self::expected_len(width, height) {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    pub fn expected_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * Self::CHANNELS
    }

    /// True if the buffer matches the dimensions
    pub fn is_well_formed(&self) -> bool {
        self.data.len() == Self::expected_len(self.width, self.height)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * Self::CHANNELS;
        Some([self.data[i], self.data[i + 1], self.data[i + 2]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_frame_size() {
        let frame = Frame::new(4, 2);
        assert_eq!(frame.data.len(), 24);
        assert!(frame.is_well_formed());
        assert_eq!(frame.pixel(3, 1), Some([0, 0, 0]));
        assert_eq!(frame.pixel(4, 0), None);
    }

    #[test]
    fn test_from_rgb_checks_length() {
        assert!(Frame::from_rgb(2, 2, vec![0; 12]).is_some());
        assert!(Frame::from_rgb(2, 2, vec![0; 11]).is_none());
    }
}
