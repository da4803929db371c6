//! Destination of decoded frames on the consumer side.

/// Receives every frame the consumer drains, in bus order.
pub trait FrameSink {
    fn on_frame(&mut self, topic: &str, payload: &[u8]);
}

impl<F: FnMut(&str, &[u8])> FrameSink for F {
    fn on_frame(&mut self, topic: &str, payload: &[u8]) {
        self(topic, payload)
    }
}
