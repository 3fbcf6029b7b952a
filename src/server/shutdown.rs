//! Shared running flag

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable flag every worker checks at the top of its loop
///
/// Workers block for at most one receive timeout or one frame interval, so
/// clearing the flag stops all of them within that bound.
#[derive(Debug, Clone)]
pub struct RunFlag(Arc<AtomicBool>);

impl RunFlag {
    /// A flag in the running state
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Ask every worker sharing this flag to stop
    pub fn stop(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for RunFlag {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_is_shared() {
        let flag = RunFlag::new();
        let clone = flag.clone();
        assert!(clone.is_running());

        flag.stop();
        assert!(!clone.is_running());
    }
}
