//! Bus transport layer: the encoded transmit ring, the receive slot pool and
//! the collaborator traits the firmware implements.
//!
//! ## Bus timing
//!
//! The protocol has no explicit start-of-frame marker. A raw `0x00` both ends
//! a frame and opens the next arbitration round, so every node has to agree
//! on when a `0x00` is fresh and when it follows a long silence.
//!
//! - **Resync window** ([`DEFAULT_RESYNC_WINDOW`], 5 ms): an END received
//!   after a longer silence first forces the handler back to `Idle`. A node
//!   that missed bytes (noise, reset, late power-up) is realigned by the next
//!   terminator instead of decoding garbage.
//! - **Idle window** ([`DEFAULT_IDLE_WINDOW`], 10 ms): without any byte for
//!   that long the bus is considered idle and a node holding a closed frame
//!   may start a round on its own by sending an END.
//!
//! Both windows are configurable through
//! [`BusConfig`](crate::protocol::bus::config::BusConfig); the resync window
//! must stay shorter than the idle window, otherwise a node could start a
//! round that its peers would discard as stale.
//!
//! [`DEFAULT_RESYNC_WINDOW`]: crate::core::DEFAULT_RESYNC_WINDOW
//! [`DEFAULT_IDLE_WINDOW`]: crate::core::DEFAULT_IDLE_WINDOW

pub mod rx_pool;
pub mod traits;
pub mod tx_queue;
