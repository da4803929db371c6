//! Byte-level access to the half-duplex UART the bus runs on.
//!
//! The engine never blocks on the transport: it pushes one byte when the
//! hardware reports a free transmit slot and toggles the "transmit ready"
//! interrupt to say whether it wants to be called again.

/// Contract implemented by the firmware UART driver (or a test double).
pub trait ByteTransport {
    /// Put one byte into the transmit register / FIFO.
    fn send(&mut self, byte: u8);
    /// Ask to be notified (through `on_transmit_ready`) when a byte can be sent.
    fn enable_tx_interrupt(&mut self);
    /// Stop transmit-ready notifications.
    fn disable_tx_interrupt(&mut self);
}

impl<T: ByteTransport + ?Sized> ByteTransport for &mut T {
    fn send(&mut self, byte: u8) {
        (**self).send(byte)
    }

    fn enable_tx_interrupt(&mut self) {
        (**self).enable_tx_interrupt()
    }

    fn disable_tx_interrupt(&mut self) {
        (**self).disable_tx_interrupt()
    }
}
