//! Live-tunable processing parameters
//!
//! The control listener writes, the broadcast loop reads one snapshot per
//! frame. Color is a hard contract and invalid channels are rejected;
//! intensity and blur are soft dials and out-of-range values are clamped.

pub mod store;
pub mod types;

pub use store::ParameterStore;
pub use types::{clamp_intensity, BlurBounds, Color, ProcessingParams};
