use std::time::Duration;

/// Spacing between deliveries.
///
/// Only there to stay under the target's rate limits; ordering never depends
/// on it.
pub trait PacingPolicy: Send + Sync {
    /// Delay after the `dispatched`-th successful delivery of a route (1-based).
    fn delay_after(&self, dispatched: usize) -> Duration;
}

/// Same delay after every delivery.
#[derive(Clone, Copy, Debug)]
pub struct FixedPacing(pub Duration);

impl FixedPacing {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(200);
}

impl Default for FixedPacing {
    fn default() -> Self {
        Self(Self::DEFAULT_INTERVAL)
    }
}

impl PacingPolicy for FixedPacing {
    fn delay_after(&self, _dispatched: usize) -> Duration {
        self.0
    }
}

/// No delay at all (tests, dry runs).
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPacing;

impl PacingPolicy for NoPacing {
    fn delay_after(&self, _dispatched: usize) -> Duration {
        Duration::ZERO
    }
}
