//! Guarded parameter store

use tokio::sync::RwLock;

use crate::error::ValidationError;
use crate::protocol::command::ControlCommand;

use super::types::{clamp_intensity, BlurBounds, Color, ProcessingParams};

/// Shared, live-tunable processing parameters
///
/// All fields sit behind one lock and readers get a copy, so a snapshot
/// never mixes values from two different updates.
#[derive(Debug)]
pub struct ParameterStore {
    params: RwLock<ProcessingParams>,
    blur_bounds: BlurBounds,
}

impl ParameterStore {
    /// Create a store with default parameters and blur bounds
    pub fn new() -> Self {
        Self::with_params(ProcessingParams::default(), BlurBounds::default())
    }

    /// Create a store with explicit initial values
    ///
    /// Inverted blur bounds are reordered. The initial intensity and blur are
    /// clamped like any later update.
    pub fn with_params(initial: ProcessingParams, blur_bounds: BlurBounds) -> Self {
        let blur_bounds = blur_bounds.ordered();
        let params = ProcessingParams {
            color: initial.color,
            intensity: clamp_intensity(initial.intensity),
            blur: blur_bounds.clamp(initial.blur as i64),
        };

        Self {
            params: RwLock::new(params),
            blur_bounds,
        }
    }

    pub fn blur_bounds(&self) -> BlurBounds {
        self.blur_bounds
    }

    /// Replace the color; rejects channels outside 0..=255
    pub async fn set_color(&self, r: i64, g: i64, b: i64) -> Result<Color, ValidationError> {
        let color = Color::try_from_channels(r, g, b)?;
        self.params.write().await.color = color;
        tracing::info!(r = color.r, g = color.g, b = color.b, "Color updated");
        Ok(color)
    }

    /// Replace the intensity, clamped into 0.0..=1.0
    ///
    /// Never fails; returns the stored value. NaN is stored as 1.0.
    pub async fn set_intensity(&self, x: f64) -> f64 {
        let intensity = clamp_intensity(x);
        self.params.write().await.intensity = intensity;
        tracing::info!(intensity = intensity, requested = x, "Intensity updated");
        intensity
    }

    /// Replace the blur radius, clamped into the configured bounds
    pub async fn set_blur(&self, radius: i64) -> u32 {
        let blur = self.blur_bounds.clamp(radius);
        self.params.write().await.blur = blur;
        tracing::info!(blur = blur, requested = radius, "Blur updated");
        blur
    }

    /// Replace every field at once
    pub async fn replace(&self, params: ProcessingParams) {
        let params = ProcessingParams {
            intensity: clamp_intensity(params.intensity),
            blur: self.blur_bounds.clamp(params.blur as i64),
            ..params
        };
        *self.params.write().await = params;
    }

    /// Apply a parsed control command
    pub async fn apply(&self, command: ControlCommand) -> Result<(), ValidationError> {
        match command {
            ControlCommand::Color { r, g, b } => self.set_color(r, g, b).await.map(|_| ()),
            ControlCommand::Intensity(x) => {
                self.set_intensity(x).await;
                Ok(())
            }
            ControlCommand::Blur(n) => {
                self.set_blur(n).await;
                Ok(())
            }
        }
    }

    /// Consistent copy of all parameters
    pub async fn snapshot(&self) -> ProcessingParams {
        *self.params.read().await
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn test_set_color_roundtrip() {
        let store = ParameterStore::new();
        for &(r, g, b) in &[(0, 0, 0), (255, 255, 255), (12, 200, 99)] {
            store.set_color(r, g, b).await.unwrap();
            let color = store.snapshot().await.color;
            assert_eq!((color.r as i64, color.g as i64, color.b as i64), (r, g, b));
        }
    }

    #[tokio::test]
    async fn test_invalid_color_leaves_store_unchanged() {
        let store = ParameterStore::new();
        let before = store.snapshot().await;

        let result = store.set_color(300, 10, 10).await;
        assert!(matches!(
            result,
            Err(ValidationError::ChannelOutOfRange { value: 300, .. })
        ));
        assert_eq!(store.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_intensity_is_clamped() {
        let store = ParameterStore::new();
        for &x in &[-5.0, -0.0001, 0.0, 0.3, 1.0, 1.5, 1e9] {
            store.set_intensity(x).await;
            assert_eq!(store.snapshot().await.intensity, x.clamp(0.0, 1.0));
        }
    }

    #[tokio::test]
    async fn test_nan_intensity_stored_as_full() {
        let store = ParameterStore::new();
        store.set_intensity(0.3).await;

        assert_eq!(store.set_intensity(f64::NAN).await, 1.0);
        assert_eq!(store.snapshot().await.intensity, 1.0);
    }

    #[tokio::test]
    async fn test_inverted_blur_bounds_are_reordered() {
        let store = ParameterStore::with_params(ProcessingParams::default(), BlurBounds::new(10, 2));

        assert_eq!(store.blur_bounds(), BlurBounds::new(2, 10));
        assert_eq!(store.set_blur(7).await, 7);
        assert_eq!(store.set_blur(i64::MAX).await, 10);
    }

    #[tokio::test]
    async fn test_blur_is_clamped() {
        let store = ParameterStore::with_params(ProcessingParams::default(), BlurBounds::new(5, 50));
        for &n in &[-100i64, 0, 5, 17, 50, 51, 10_000] {
            store.set_blur(n).await;
            assert_eq!(store.snapshot().await.blur as i64, n.clamp(5, 50));
        }
    }

    #[tokio::test]
    async fn test_initial_values_are_clamped() {
        let initial = ProcessingParams {
            intensity: 4.0,
            blur: 1,
            ..ProcessingParams::default()
        };
        let store = ParameterStore::with_params(initial, BlurBounds::new(5, 50));
        let params = store.snapshot().await;

        assert_eq!(params.intensity, 1.0);
        assert_eq!(params.blur, 5);
    }

    #[tokio::test]
    async fn test_apply_commands() {
        let store = ParameterStore::new();

        store
            .apply(ControlCommand::Color { r: 1, g: 2, b: 3 })
            .await
            .unwrap();
        store.apply(ControlCommand::Intensity(1.5)).await.unwrap();
        store.apply(ControlCommand::Blur(99)).await.unwrap();
        assert!(store
            .apply(ControlCommand::Color { r: 0, g: 256, b: 0 })
            .await
            .is_err());

        let params = store.snapshot().await;
        assert_eq!(params.color, Color::new(1, 2, 3));
        assert_eq!(params.intensity, 1.0);
        assert_eq!(params.blur, 50);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_snapshots_are_never_torn() {
        // Writers only ever store matching pairs; a reader must never see a mix
        let store = Arc::new(ParameterStore::new());
        let a = ProcessingParams {
            color: Color::new(0, 0, 0),
            intensity: 0.0,
            blur: 5,
        };
        let b = ProcessingParams {
            color: Color::new(255, 255, 255),
            intensity: 1.0,
            blur: 50,
        };

        let writer = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for i in 0..2000 {
                    store.replace(if i % 2 == 0 { a } else { b }).await;
                }
            })
        };

        for _ in 0..2000 {
            let snap = store.snapshot().await;
            assert!(snap == a || snap == b || snap == ProcessingParams::default());
        }
        writer.await.unwrap();
    }
}
