use std::time::{Duration, Instant};

pub const DEFAULT_DOUBLE_ACTIVATION_WINDOW: Duration = Duration::from_millis(300);

/// Detects two activations in quick succession.
#[derive(Debug, Clone)]
pub struct DoubleActivation {
    window: Duration,
    last: Option<Instant>,
}

impl DoubleActivation {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Records an activation at `now`. Returns true when the previous one
    /// happened less than `window` ago.
    pub fn activate(&mut self, now: Instant) -> bool {
        let double = self
            .last
            .map(|last| now.saturating_duration_since(last) < self.window)
            .unwrap_or(false);
        self.last = Some(now);
        double
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

impl Default for DoubleActivation {
    fn default() -> Self {
        Self::new(DEFAULT_DOUBLE_ACTIVATION_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_activation_within_window() {
        let mut detector = DoubleActivation::default();
        let start = Instant::now();
        assert!(!detector.activate(start));
        assert!(detector.activate(start + Duration::from_millis(120)));
    }

    #[test]
    fn test_slow_activations_are_single() {
        let mut detector = DoubleActivation::default();
        let start = Instant::now();
        assert!(!detector.activate(start));
        assert!(!detector.activate(start + Duration::from_millis(300)));
        assert!(!detector.activate(start + Duration::from_millis(700)));
    }

    #[test]
    fn test_reset_forgets_last_activation() {
        let mut detector = DoubleActivation::default();
        let start = Instant::now();
        detector.activate(start);
        detector.reset();
        assert!(!detector.activate(start + Duration::from_millis(10)));
    }
}
