//! Shared bus handle tying the byte pump, producers and the consumer together.
//!
//! [`FurBus`] owns the [`LinkEngine`] behind a blocking mutex (a critical
//! section on single-core targets) so that the UART interrupt and the tasks
//! can reach it from a shared reference:
//!
//! * the interrupt forwards bytes with [`FurBus::on_byte_received`] and
//!   transmit slots with [`FurBus::on_transmit_ready`];
//! * producers compose frames through [`FurBus::start_packet`], which holds
//!   an async mutex (the producer gate) for the lifetime of the returned
//!   [`PacketWriter`];
//! * the single consumer waits on a [`Signal`] through a [`FrameReceiver`].
//!
//! Firmware decides where the bus lives (a `static` via `StaticCell`, a
//! task-local, ...). No allocation is performed.
use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::mutex::Mutex as AsyncMutex;
use embassy_sync::signal::Signal;

use crate::core::{HandlerState, LinkStats, RxOutcome, RX_SLOT_CAPACITY};
use crate::error::{BusError, ConfigError, WriteError};
use crate::protocol::engine::LinkEngine;
use crate::protocol::topic::validate_topic;
use crate::protocol::transport::rx_pool::RxPool;
use crate::protocol::transport::traits::bus_clock::BusClock;
use crate::protocol::transport::traits::byte_transport::ByteTransport;

pub mod config;
pub mod receiver;
pub mod writer;

use config::BusConfig;
pub use receiver::FrameReceiver;
pub use writer::PacketWriter;

struct Link<T> {
    engine: LinkEngine,
    transport: T,
    receiver_taken: bool,
}

//==================================================================================FUR_BUS
/// One node on the bus.
pub struct FurBus<M: RawMutex, T: ByteTransport, C: BusClock> {
    link: Mutex<M, RefCell<Link<T>>>,
    producer: AsyncMutex<M, ()>,
    rx_pool: RxPool,
    rx_signal: Signal<M, ()>,
    clock: C,
}

impl<M: RawMutex, T: ByteTransport, C: BusClock> FurBus<M, T, C> {
    pub fn new(config: BusConfig, transport: T, clock: C) -> Self {
        #[cfg(feature = "defmt")]
        defmt::info!(
            "Bus node chip_id={=u16:#x} priority={}",
            config.identity.chip_id(),
            config.identity.priority()
        );

        Self {
            link: Mutex::new(RefCell::new(Link {
                engine: LinkEngine::new(config),
                transport,
                receiver_taken: false,
            })),
            producer: AsyncMutex::new(()),
            rx_pool: RxPool::new(),
            rx_signal: Signal::new(),
            clock,
        }
    }

    /// Run `f` with exclusive access to the engine and the transport.
    fn with_link<R>(&self, f: impl FnOnce(&mut LinkEngine, &mut T) -> R) -> R {
        self.link.lock(|cell| {
            let mut link = cell.borrow_mut();
            let Link {
                engine, transport, ..
            } = &mut *link;
            f(engine, transport)
        })
    }

    //==============================================================================BYTE_PUMP
    /// Interrupt entry point: a byte was read from the bus.
    pub fn on_byte_received(&self, byte: u8) -> RxOutcome {
        let now = self.clock.now();
        let outcome = self.with_link(|engine, transport| {
            engine.on_byte_received(byte, now, transport, &self.rx_pool)
        });
        if outcome == RxOutcome::FrameReady {
            self.rx_signal.signal(());
        }
        outcome
    }

    /// Interrupt entry point: the transmitter can take a byte.
    pub fn on_transmit_ready(&self) {
        self.with_link(|engine, transport| engine.on_transmit_ready(transport));
    }

    //==============================================================================PRODUCERS
    /// Wait for the producer gate and open a frame on `topic`.
    pub async fn start_packet(&self, topic: &str) -> Result<PacketWriter<'_, M, T, C>, WriteError> {
        Self::check_topic(topic)?;
        let gate = self.producer.lock().await;
        PacketWriter::open(self, gate, topic)
    }

    /// Like [`start_packet`](Self::start_packet) but fails with
    /// [`WriteError::ProducerBusy`] instead of waiting.
    pub fn try_start_packet(&self, topic: &str) -> Result<PacketWriter<'_, M, T, C>, WriteError> {
        Self::check_topic(topic)?;
        let gate = self
            .producer
            .try_lock()
            .map_err(|_| WriteError::ProducerBusy)?;
        PacketWriter::open(self, gate, topic)
    }

    /// Queue a complete frame in one call.
    pub async fn send_packet(&self, topic: &str, payload: &[u8]) -> Result<(), WriteError> {
        let mut writer = self.start_packet(topic).await?;
        writer.add_packet_data(payload)?;
        writer.close_packet()
    }

    fn check_topic(topic: &str) -> Result<(), WriteError> {
        validate_topic(topic)?;
        let len = topic.len() + 1;
        if len > RX_SLOT_CAPACITY {
            return Err(WriteError::FrameTooLong {
                len,
                max: RX_SLOT_CAPACITY,
            });
        }
        Ok(())
    }

    //==============================================================================CONSUMER
    /// Hand out the consumer handle. Only one exists per bus.
    pub fn receiver(&self) -> Result<FrameReceiver<'_, M>, BusError> {
        let taken = self.link.lock(|cell| {
            let mut link = cell.borrow_mut();
            core::mem::replace(&mut link.receiver_taken, true)
        });
        if taken {
            return Err(BusError::ReceiverTaken);
        }
        Ok(FrameReceiver::new(&self.rx_pool, &self.rx_signal))
    }

    //==============================================================================MONITOR
    /// `true` when no round is running on the bus.
    pub fn is_idle(&self) -> bool {
        let now = self.clock.now();
        self.with_link(|engine, _| engine.is_idle(now))
    }

    /// Start a round when frames are waiting and the bus went quiet.
    ///
    /// Closing a frame only kicks an idle bus; frames closed while a round
    /// was running and left behind by a silent bus need this call (typically
    /// from a periodic task). Returns `true` when a round was kicked.
    pub fn kick_if_idle(&self) -> bool {
        let now = self.clock.now();
        self.with_link(|engine, transport| {
            if engine.pending_frames() > 0 && engine.is_idle(now) {
                engine.kick_arbitration(now, transport);
                true
            } else {
                false
            }
        })
    }

    pub fn set_chip_id(&self, chip_id: u16) -> Result<(), ConfigError> {
        self.with_link(|engine, _| engine.identity_mut().set_chip_id(chip_id))
    }

    pub fn set_priority(&self, priority: i8) {
        self.with_link(|engine, _| engine.identity_mut().set_priority(priority));
    }

    pub fn state(&self) -> HandlerState {
        self.with_link(|engine, _| engine.state())
    }

    pub fn stats(&self) -> LinkStats {
        self.with_link(|engine, _| engine.stats())
    }

    /// Closed frames not yet fully sent.
    pub fn pending_frames(&self) -> usize {
        self.with_link(|engine, _| engine.pending_frames())
    }

    /// Access the transport (driver setup, test inspection).
    pub fn with_transport<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        self.with_link(|_, transport| f(transport))
    }
}
