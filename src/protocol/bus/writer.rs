//! Frame composition under the producer gate.
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::MutexGuard;

use crate::core::RX_SLOT_CAPACITY;
use crate::error::WriteError;
use crate::protocol::bus::FurBus;
use crate::protocol::transport::traits::bus_clock::BusClock;
use crate::protocol::transport::traits::byte_transport::ByteTransport;

/// Frame being composed. Holds the producer gate until closed or dropped.
///
/// Bytes are escaped straight into the transmit ring but stay invisible to
/// the byte pump until [`close_packet`](Self::close_packet). Dropping the
/// writer without closing discards everything written since
/// [`FurBus::start_packet`].
pub struct PacketWriter<'a, M: RawMutex, T: ByteTransport, C: BusClock> {
    bus: &'a FurBus<M, T, C>,
    _gate: MutexGuard<'a, M, ()>,
    decoded_len: usize,
    closed: bool,
}

impl<'a, M: RawMutex, T: ByteTransport, C: BusClock> PacketWriter<'a, M, T, C> {
    /// Write the topic and its separator. On error the writer is dropped,
    /// which rolls the ring back and releases the gate.
    pub(super) fn open(
        bus: &'a FurBus<M, T, C>,
        gate: MutexGuard<'a, M, ()>,
        topic: &str,
    ) -> Result<Self, WriteError> {
        let mut writer = Self {
            bus,
            _gate: gate,
            decoded_len: 0,
            closed: false,
        };
        writer.add_packet_data(topic.as_bytes())?;
        writer.add_packet_data(&[0x00])?;
        Ok(writer)
    }

    /// Decoded length of the frame so far (topic, separator and payload).
    pub fn len(&self) -> usize {
        self.decoded_len
    }

    pub fn is_empty(&self) -> bool {
        self.decoded_len == 0
    }

    /// Append payload bytes. Nothing is written when the call fails.
    pub fn add_packet_data(&mut self, data: &[u8]) -> Result<(), WriteError> {
        let len = self.decoded_len + data.len();
        if len > RX_SLOT_CAPACITY {
            return Err(WriteError::FrameTooLong {
                len,
                max: RX_SLOT_CAPACITY,
            });
        }
        self.bus
            .with_link(|engine, _| engine.tx_queue_mut().push_escaped(data))?;
        self.decoded_len = len;
        Ok(())
    }

    /// Terminate the frame, hand it to the byte pump and release the gate.
    /// Kicks an arbitration round when the bus is idle.
    pub fn close_packet(mut self) -> Result<(), WriteError> {
        let now = self.bus.clock.now();
        self.bus.with_link(|engine, transport| {
            engine.tx_queue_mut().commit_frame()?;
            if engine.is_idle(now) {
                engine.kick_arbitration(now, transport);
            }
            Ok::<(), WriteError>(())
        })?;
        self.closed = true;

        #[cfg(feature = "defmt")]
        defmt::debug!("Frame queued ({} bytes)", self.decoded_len);

        Ok(())
    }
}

impl<M: RawMutex, T: ByteTransport, C: BusClock> Drop for PacketWriter<'_, M, T, C> {
    fn drop(&mut self) {
        if !self.closed {
            #[cfg(feature = "defmt")]
            defmt::debug!("Frame abandoned, rolling back");

            self.bus
                .with_link(|engine, _| engine.tx_queue_mut().rollback());
        }
    }
}
