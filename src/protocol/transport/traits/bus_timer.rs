//! Asynchronous timer abstraction used by consumers waiting for frames with
//! a deadline.

/// Timer trait abstraction; must remain thread-safe when applicable.
pub trait BusTimer {
    /// Asynchronously wait for `millis` milliseconds.
    fn delay_ms<'a>(&'a mut self, millis: u32) -> impl core::future::Future<Output = ()> + 'a;
}

/// Timer backed by `embassy_time::Timer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyTimer;

impl BusTimer for EmbassyTimer {
    async fn delay_ms(&mut self, millis: u32) {
        embassy_time::Timer::after_millis(millis as u64).await
    }
}
