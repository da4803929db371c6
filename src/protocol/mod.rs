//! Bus protocol: arbitration, the byte-pump engine, transport buffers and
//! traits, the shared bus handle and topic dispatch.
pub mod arbitration;
pub mod bus;
pub mod engine;
pub mod topic;
pub mod transport;
