//! Error definitions shared across library modules.
//! Each type models a specific failure scenario (frame composition,
//! configuration, codec misuse, consumer setup, topic routing).
use thiserror_no_std::Error;

//==================================================================================WRITE_ERROR
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Errors raised while composing a frame through a `PacketWriter`.
pub enum WriteError {
    /// Topic contains characters outside `[A-Za-z0-9_/ whitespace]` or is empty.
    #[error("Invalid topic")]
    InvalidTopic,
    /// Decoded frame would not fit in a receiver slot.
    #[error("Frame too long: {len} bytes, max {max}")]
    FrameTooLong { len: usize, max: usize },
    /// Not enough room left in the transmit ring.
    #[error("TX queue full: needed {needed}, available {available}")]
    QueueFull { needed: usize, available: usize },
    /// Another producer currently holds the gate.
    #[error("Producer gate busy")]
    ProducerBusy,
}

//==================================================================================CONFIG_ERROR
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Invalid node or bus configuration.
pub enum ConfigError {
    /// Chip identifiers are limited to 14 bits.
    #[error("Chip id {chip_id:#X} exceeds 14 bits")]
    InvalidChipId { chip_id: u16 },
    /// The resync window must be strictly shorter than the idle window.
    #[error("Resync window must be shorter than the idle window")]
    InvalidWindows,
    /// Self-receive needs the handler to wait for its own terminator echo.
    #[error("Loopback requires waiting for the own terminator")]
    LoopbackRequiresTerminatorWait,
}

//==================================================================================BUS_ERROR
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Misuse of the bus handle itself.
pub enum BusError {
    /// The single consumer handle was already handed out.
    #[error("Frame receiver already taken")]
    ReceiverTaken,
}

//==================================================================================CODEC_ERROR
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Escape sequence violations seen by the incremental decoder.
pub enum DecodeError {
    /// `ESCAPE` followed by a byte that is neither `ESC_END` nor `ESC_ESC`.
    #[error("Invalid escape sequence: 0xDB {byte:#04X}")]
    InvalidEscape { byte: u8 },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Issues encountered while escaping into a caller buffer.
pub enum EncodeError {
    /// Output buffer cannot hold the escaped bytes.
    #[error("Buffer too small: needed {needed}, available {available}")]
    BufferTooSmall { needed: usize, available: usize },
}

//==================================================================================ROUTER_ERROR
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Topic router registration failures.
pub enum RouterError {
    /// Every subscription slot is in use.
    #[error("No subscription slot left")]
    Full,
}
