//! Consumer side: waits for the byte pump and drains the receive slots.
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::signal::Signal;
use futures_util::{
    future::{select, Either},
    pin_mut,
};

use crate::core::RX_SLOT_COUNT;
use crate::protocol::topic::is_valid_topic;
use crate::protocol::transport::rx_pool::RxPool;
use crate::protocol::transport::traits::bus_timer::BusTimer;
use crate::protocol::transport::traits::frame_sink::FrameSink;

/// Single consumer of decoded frames, obtained through
/// [`FurBus::receiver`](super::FurBus::receiver).
///
/// Wake-ups coalesce: one signal may stand for several frames, so every
/// wake drains all unread slots in bus order.
pub struct FrameReceiver<'a, M: RawMutex> {
    pool: &'a RxPool,
    signal: &'a Signal<M, ()>,
    next_read: usize,
    rejected: u32,
}

impl<'a, M: RawMutex> FrameReceiver<'a, M> {
    pub(super) fn new(pool: &'a RxPool, signal: &'a Signal<M, ()>) -> Self {
        Self {
            pool,
            signal,
            next_read: 0,
            rejected: 0,
        }
    }

    /// Frames dropped because their topic was not valid UTF-8 or contained
    /// forbidden characters.
    pub fn rejected(&self) -> u32 {
        self.rejected
    }

    /// Deliver every frame already available, without waiting. Returns the
    /// number of frames handed to `sink`.
    pub fn drain<S: FrameSink + ?Sized>(&mut self, sink: &mut S) -> usize {
        let mut delivered = 0;
        while let Some(accepted) = self.pool.consume(self.next_read, |topic, payload| {
            match core::str::from_utf8(topic) {
                Ok(topic) if is_valid_topic(topic) => {
                    sink.on_frame(topic, payload);
                    true
                }
                _ => false,
            }
        }) {
            self.next_read = (self.next_read + 1) % RX_SLOT_COUNT;
            if accepted {
                delivered += 1;
            } else {
                #[cfg(feature = "defmt")]
                defmt::warn!("Dropping frame with invalid topic");

                self.rejected = self.rejected.wrapping_add(1);
            }
        }
        delivered
    }

    /// Wait until at least one frame was delivered to `sink`.
    pub async fn receive<S: FrameSink + ?Sized>(&mut self, sink: &mut S) -> usize {
        loop {
            let delivered = self.drain(sink);
            if delivered > 0 {
                return delivered;
            }
            self.signal.wait().await;
        }
    }

    /// Like [`receive`](Self::receive) but gives up after `timeout_ms`.
    /// Returns 0 on timeout.
    pub async fn receive_timeout<S, T>(&mut self, sink: &mut S, timer: &mut T, timeout_ms: u32) -> usize
    where
        S: FrameSink + ?Sized,
        T: BusTimer,
    {
        let delivered = self.drain(sink);
        if delivered > 0 {
            return delivered;
        }

        {
            let wake = self.signal.wait();
            let delay = timer.delay_ms(timeout_ms);
            pin_mut!(wake);
            pin_mut!(delay);

            match select(wake, delay).await {
                Either::Left(_) => {}
                Either::Right(_) => return 0,
            }
        }

        self.drain(sink)
    }

    /// Consumer loop: forward frames to `sink` forever.
    pub async fn run<S: FrameSink + ?Sized>(&mut self, sink: &mut S) {
        loop {
            self.receive(sink).await;
        }
    }
}
