//! Monotonic time source used for the resync and idle windows.
use embassy_time::Instant;

/// Anything able to tell the current monotonic time.
pub trait BusClock {
    fn now(&self) -> Instant;
}

/// Clock backed by the global `embassy-time` driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

impl BusClock for EmbassyClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}
