//! Transmit ring holding escaped frames waiting for the bus.
//!
//! ```text
//!   echo_tail        tail            committed           head
//!    |   in flight    |  closed frames  |  frame in progress  |     free     |
//! ```
//!
//! The byte pump only ever reads `tail..committed`; producers only write
//! past `head`. A frame becomes visible to the pump once it is closed with a
//! raw terminator. Bytes already handed to the transport stay in
//! `echo_tail..tail` until their echo has been compared or the round ends.
//! One byte of the ring always stays unused so that a full ring can be told
//! apart from an empty one.
use crate::core::{END, TX_QUEUE_CAPACITY};
use crate::error::WriteError;
use crate::infra::codec::slip::{encoded_len, SlipEncoder};

/// Ring buffer of escaped frames plus the count of closed frames not yet sent.
#[derive(Debug, Clone)]
pub struct TxQueue {
    buffer: [u8; TX_QUEUE_CAPACITY],
    echo_tail: usize,
    tail: usize,
    committed: usize,
    head: usize,
    pending_frames: usize,
}

impl Default for TxQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TxQueue {
    pub const fn new() -> Self {
        Self {
            buffer: [0; TX_QUEUE_CAPACITY],
            echo_tail: 0,
            tail: 0,
            committed: 0,
            head: 0,
            pending_frames: 0,
        }
    }

    #[inline]
    const fn advance(index: usize, by: usize) -> usize {
        (index + by) % TX_QUEUE_CAPACITY
    }

    #[inline]
    const fn distance(from: usize, to: usize) -> usize {
        (to + TX_QUEUE_CAPACITY - from) % TX_QUEUE_CAPACITY
    }

    /// Bytes that can still be written, terminator included.
    pub fn free_space(&self) -> usize {
        TX_QUEUE_CAPACITY - 1 - Self::distance(self.echo_tail, self.head)
    }

    /// Bytes handed to the transport whose echo has not been checked yet.
    pub fn in_flight(&self) -> usize {
        Self::distance(self.echo_tail, self.tail)
    }

    /// Bytes of closed frames not yet handed to the transport.
    pub fn committed_len(&self) -> usize {
        Self::distance(self.tail, self.committed)
    }

    /// Bytes of the frame currently being composed.
    pub fn uncommitted_len(&self) -> usize {
        Self::distance(self.committed, self.head)
    }

    /// Closed frames not yet fully sent.
    pub fn pending_frames(&self) -> usize {
        self.pending_frames
    }

    /// `true` when no closed byte is waiting for the transport.
    pub fn is_drained(&self) -> bool {
        self.tail == self.committed
    }

    /// Escape `data` and append it to the frame in progress.
    ///
    /// All or nothing: when the escaped bytes plus a terminator do not fit,
    /// the ring is left untouched.
    pub fn push_escaped(&mut self, data: &[u8]) -> Result<(), WriteError> {
        let needed = encoded_len(data);
        let available = self.free_space().saturating_sub(1);
        if needed > available {
            return Err(WriteError::QueueFull { needed, available });
        }

        for byte in SlipEncoder::new(data) {
            self.buffer[self.head] = byte;
            self.head = Self::advance(self.head, 1);
        }
        Ok(())
    }

    /// Terminate the frame in progress and make it visible to the pump.
    pub fn commit_frame(&mut self) -> Result<(), WriteError> {
        if self.free_space() == 0 {
            return Err(WriteError::QueueFull {
                needed: 1,
                available: 0,
            });
        }
        self.buffer[self.head] = END;
        self.head = Self::advance(self.head, 1);
        self.committed = self.head;
        self.pending_frames += 1;
        Ok(())
    }

    /// Forget everything written since the last commit.
    pub fn rollback(&mut self) {
        self.head = self.committed;
    }

    /// Next closed byte for the transport.
    pub fn pop(&mut self) -> Option<u8> {
        if self.is_drained() {
            return None;
        }
        let byte = self.buffer[self.tail];
        self.tail = Self::advance(self.tail, 1);
        Some(byte)
    }

    /// Compare an echoed body byte with the oldest byte in flight. Returns
    /// `false` when the bus carried something else or nothing was in flight.
    pub fn confirm_echo(&mut self, byte: u8) -> bool {
        if self.echo_tail == self.tail {
            return false;
        }
        let sent = self.buffer[self.echo_tail];
        self.echo_tail = Self::advance(self.echo_tail, 1);
        sent == byte
    }

    /// Stop waiting for echoes; their space becomes free again.
    pub fn release_in_flight(&mut self) {
        self.echo_tail = self.tail;
    }

    /// The frame at the front was fully sent.
    pub fn complete_frame(&mut self) {
        self.pending_frames = self.pending_frames.saturating_sub(1);
    }

    /// Drop the remainder of the frame at the front (up to and including its
    /// terminator). Returns the number of bytes discarded.
    pub fn skip_frame(&mut self) -> usize {
        let mut skipped = 0;
        while let Some(byte) = self.pop() {
            skipped += 1;
            if byte == END {
                break;
            }
        }
        self.complete_frame();
        skipped
    }
}
