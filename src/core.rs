//! Wire-level constants and shared data types used by the codec, the
//! arbitration logic and the byte-pump engine.
//!
//! Everything that has to agree bit-for-bit between two nodes on the bus
//! lives here: the four framing symbols, the arbitration header layout and
//! the default timing windows.

use embassy_time::Duration;

//==================================================================================FRAMING
/// Raw transaction separator. Only ever appears unescaped on the wire as a
/// frame terminator / round start; payload zeros are escaped.
pub const END: u8 = 0x00;
/// Escape prefix.
pub const ESCAPE: u8 = 0xDB;
/// Follows [`ESCAPE`] to encode a literal `0x00`.
pub const ESC_END: u8 = 0xDC;
/// Follows [`ESCAPE`] to encode a literal `0xDB`.
pub const ESC_ESC: u8 = 0xDD;

//==================================================================================ARBITRATION
/// Number of bytes exchanged during one arbitration round:
/// `priority, chip_id[0], chip_id[1], latency_a, map[0], map[1], map[2], latency_b`.
pub const ARBITRATION_HEADER_LEN: usize = 8;
/// Header bytes compared bit by bit against the bus (priority + chip id).
pub const ARBITRATION_COMPARED_LEN: usize = 3;
/// Index of the first collision-map byte inside the header.
pub const COLLISION_MAP_OFFSET: usize = 4;
/// Collision map width in bytes.
pub const COLLISION_MAP_LEN: usize = 3;
/// Filler sent in the two latency slots. It gives the UART pipeline time to
/// react to what was just received.
pub const LATENCY_SENTINEL: u8 = 0xFF;

/// Lowest priority accepted before saturation (highest urgency).
pub const PRIORITY_MIN: i8 = -60;
/// Highest priority accepted before saturation (lowest urgency).
pub const PRIORITY_MAX: i8 = 60;
/// Largest chip identifier (14 bits).
pub const CHIP_ID_MAX: u16 = 0x3FFF;

//==================================================================================BUFFERS
/// Capacity of one decoded receive slot (`topic\0payload`).
pub const RX_SLOT_CAPACITY: usize = 256;
/// Capacity of the encoded transmit ring: a slot-sized frame made only of
/// escaped bytes, its terminator and the one byte the ring keeps free.
pub const TX_QUEUE_CAPACITY: usize = 2 * RX_SLOT_CAPACITY + 2;
/// Number of receive slots handed round-robin to the consumer.
pub const RX_SLOT_COUNT: usize = 2;

//==================================================================================TIMING
/// Silence after which an incoming END forces the handler back to `Idle`
/// before processing it.
pub const DEFAULT_RESYNC_WINDOW: Duration = Duration::from_millis(5);
/// Silence after which the bus is reported idle regardless of handler state.
pub const DEFAULT_IDLE_WINDOW: Duration = Duration::from_millis(10);

//==================================================================================STATE
/// State of the byte-pump handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HandlerState {
    /// No known bus owner; only an END byte has any effect.
    Idle,
    /// Racing other transmitters through the arbitration header.
    ParticipatingArbitration,
    /// Listening to an arbitration round this node does not take part in (or lost).
    WaitingArbitration,
    /// Decoding a frame sent by the round winner.
    Receiving,
    /// Owning the bus and draining the TX queue.
    Sending,
    /// Frame fully handed to the transport, waiting for its own terminator echo.
    SendingComplete,
}

/// Result of feeding one received byte to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxOutcome {
    /// Byte absorbed; nothing for the consumer.
    Consumed,
    /// A frame was published in the RX slot pool.
    FrameReady,
}

/// Protocol counters kept by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkStats {
    /// Frames fully handed to the transport.
    pub frames_sent: u32,
    /// Frames published to the RX slot pool.
    pub frames_received: u32,
    /// Arbitration rounds won.
    pub arbitration_wins: u32,
    /// Arbitration rounds lost.
    pub arbitration_losses: u32,
    /// Escape byte followed by something other than `ESC_END`/`ESC_ESC`.
    pub decode_errors: u32,
    /// Frames longer than an RX slot.
    pub rx_overflows: u32,
    /// Frames dropped because the next RX slot was still unread.
    pub rx_dropped: u32,
    /// END bytes that arrived after the resync window and reset the handler.
    pub resyncs: u32,
    /// Transmissions cut short by a foreign END.
    pub aborted_transmissions: u32,
    /// Body bytes that came back from the bus different from what was sent
    /// (another node kept talking after arbitration).
    pub echo_mismatches: u32,
}
