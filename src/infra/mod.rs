//! Low-level building blocks with no protocol state: byte escaping and the
//! bit math behind arbitration.
pub mod codec;
