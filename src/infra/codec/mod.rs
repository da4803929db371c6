//! Stateless (or nearly stateless) codecs used by the engine.
/// Bit-level helpers for the arbitration header.
pub mod bits;
/// SLIP-like escape codec for frame bodies.
pub mod slip;
