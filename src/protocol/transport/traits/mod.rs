//! Collaborator traits: byte transport, clock, timer and frame sink.
pub mod bus_clock;
pub mod bus_timer;
pub mod byte_transport;
pub mod frame_sink;
