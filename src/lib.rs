//! `furcoms` library: a multi-master protocol engine for a single shared
//! UART wire pair, in a `no_std` environment. Nodes arbitrate bit by bit
//! for the bus (lowest priority value, then lowest chip id wins) and send
//! short `topic\0payload` frames in a SLIP-like framing. The crate exposes
//! the wire codecs, the byte-pump state machine and the task-level glue
//! (producer gate, consumer handle) built on `embassy-sync`.
#![no_std]
//==================================================================================
/// Wire constants, buffer capacities, timing defaults and shared state types.
pub mod core;
/// Errors raised by producers, configuration, codecs and topic routing.
pub mod error;
/// Pure codecs: SLIP-like escaping and arbitration bit math.
pub mod infra;
/// Arbitration, state machine, transport buffers and the shared bus handle.
pub mod protocol;
//==================================================================================
