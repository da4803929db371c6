//! Topic validation and topic-filtered frame dispatch.
//!
//! A topic is a short ASCII label (`sensors/temp`, `led 3`) sent in front of
//! every payload. Only alphanumerics, `_`, `/` and ASCII whitespace are
//! allowed, which keeps the separator byte out of topics.
use crate::error::{RouterError, WriteError};
use crate::protocol::transport::traits::frame_sink::FrameSink;

//==================================================================================VALIDATION
/// `true` for a non-empty topic made only of allowed characters.
pub fn is_valid_topic(topic: &str) -> bool {
    !topic.is_empty()
        && topic
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'/' || b.is_ascii_whitespace())
}

/// Producer-side check.
pub fn validate_topic(topic: &str) -> Result<(), WriteError> {
    if is_valid_topic(topic) {
        Ok(())
    } else {
        Err(WriteError::InvalidTopic)
    }
}

//==================================================================================FILTER
/// Which topics a subscription wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicFilter<'a> {
    /// Every frame.
    Any,
    /// Exactly this topic.
    Exact(&'a str),
    /// Topics starting with this prefix (`sensors/` matches `sensors/temp`).
    Prefix(&'a str),
}

impl TopicFilter<'_> {
    pub fn matches(&self, topic: &str) -> bool {
        match self {
            TopicFilter::Any => true,
            TopicFilter::Exact(expected) => topic == *expected,
            TopicFilter::Prefix(prefix) => topic.starts_with(prefix),
        }
    }
}

//==================================================================================ROUTER
struct Subscription<'a> {
    filter: TopicFilter<'a>,
    sink: &'a mut dyn FrameSink,
}

/// Fixed-capacity dispatcher: forwards each frame to every subscription
/// whose filter matches, in registration order.
pub struct TopicRouter<'a, const N: usize> {
    subscriptions: [Option<Subscription<'a>>; N],
    unmatched: u32,
}

impl<const N: usize> Default for TopicRouter<'_, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, const N: usize> TopicRouter<'a, N> {
    pub fn new() -> Self {
        Self {
            subscriptions: [const { None }; N],
            unmatched: 0,
        }
    }

    /// Register `sink` for topics matching `filter`.
    pub fn subscribe(
        &mut self,
        filter: TopicFilter<'a>,
        sink: &'a mut dyn FrameSink,
    ) -> Result<(), RouterError> {
        let slot = self
            .subscriptions
            .iter_mut()
            .find(|s| s.is_none())
            .ok_or(RouterError::Full)?;
        *slot = Some(Subscription { filter, sink });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.subscriptions.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Frames no subscription wanted.
    pub fn unmatched(&self) -> u32 {
        self.unmatched
    }
}

impl<const N: usize> FrameSink for TopicRouter<'_, N> {
    fn on_frame(&mut self, topic: &str, payload: &[u8]) {
        let mut delivered = false;
        for subscription in self.subscriptions.iter_mut().flatten() {
            if subscription.filter.matches(topic) {
                subscription.sink.on_frame(topic, payload);
                delivered = true;
            }
        }
        if !delivered {
            self.unmatched = self.unmatched.wrapping_add(1);
        }
    }
}
