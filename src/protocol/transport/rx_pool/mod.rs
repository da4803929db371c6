//! Receive slots shared between the byte pump and the consumer task.
//!
//! Each slot holds one decoded frame (`topic\0payload`). Ownership of a slot
//! flips with its `available` flag:
//!
//! * `available == false`: the byte pump may write it; the consumer ignores it.
//! * `available == true`: the consumer may read it; the pump leaves it alone.
//!
//! The pump fills slots strictly round-robin. When the next slot is still
//! unread the incoming frame is dropped rather than overwriting it, so the
//! consumer always sees frames in bus order.
//!
//! Pools are only created inside the crate: each `FurBus` owns one, written
//! by its engine under the link lock and read by its single `FrameReceiver`.
//! Outside code can neither build a pool nor attach a writer to one:
//!
//! ```compile_fail
//! let pool = furcoms::protocol::transport::rx_pool::RxPool::new();
//! ```
//!
//! ```compile_fail
//! let writer = furcoms::protocol::transport::rx_pool::RxWriter::new();
//! ```
use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::core::{END, RX_SLOT_CAPACITY, RX_SLOT_COUNT};

//==================================================================================SLOT
#[derive(Debug, Clone, Copy, Default)]
struct SlotMeta {
    len: usize,
    topic_len: usize,
}

/// One frame buffer plus its handoff flag.
pub struct RxSlot {
    buffer: UnsafeCell<[u8; RX_SLOT_CAPACITY]>,
    meta: UnsafeCell<SlotMeta>,
    available: AtomicBool,
}

impl RxSlot {
    const fn new() -> Self {
        Self {
            buffer: UnsafeCell::new([0; RX_SLOT_CAPACITY]),
            meta: UnsafeCell::new(SlotMeta {
                len: 0,
                topic_len: 0,
            }),
            available: AtomicBool::new(false),
        }
    }
}

/// Fixed pool of receive slots.
pub struct RxPool {
    slots: [RxSlot; RX_SLOT_COUNT],
}

// Safety: a pool is only constructed by `FurBus`, whose engine owns the one
// `RxWriter` and only drives it under the link lock; `FurBus::receiver` hands
// out the one reader. A slot's buffer and metadata are written while
// `available` is false and read while it is true. The flag is published with
// Release and observed with Acquire.
unsafe impl Sync for RxPool {}

impl RxPool {
    pub(crate) const fn new() -> Self {
        Self {
            slots: [const { RxSlot::new() }; RX_SLOT_COUNT],
        }
    }

    /// `true` when slot `index` holds an unread frame.
    pub fn is_available(&self, index: usize) -> bool {
        self.slots[index].available.load(Ordering::Acquire)
    }

    /// Number of unread frames.
    pub fn unread(&self) -> usize {
        (0..RX_SLOT_COUNT).filter(|&i| self.is_available(i)).count()
    }

    fn store(&self, index: usize, at: usize, byte: u8) {
        let slot = &self.slots[index];
        debug_assert!(!slot.available.load(Ordering::Relaxed));
        // Safety: only the writer calls this, and only while the slot is not
        // available, so the reader holds no reference into the buffer.
        unsafe { (*slot.buffer.get())[at] = byte };
    }

    fn publish(&self, index: usize, len: usize, topic_len: usize) {
        let slot = &self.slots[index];
        // Safety: same ownership rule as `store`.
        unsafe { *slot.meta.get() = SlotMeta { len, topic_len } };
        slot.available.store(true, Ordering::Release);
    }

    /// Hand the frame in slot `index` to `f` and give the slot back to the
    /// writer. Returns `None` when the slot holds no frame.
    ///
    /// `f` receives the raw topic bytes and the payload.
    pub(crate) fn consume<R>(&self, index: usize, f: impl FnOnce(&[u8], &[u8]) -> R) -> Option<R> {
        let slot = &self.slots[index];
        if !slot.available.load(Ordering::Acquire) {
            return None;
        }

        // Safety: the slot is available, so the writer will not touch it
        // until the flag is cleared below, after the borrows end.
        let result = unsafe {
            let meta = *slot.meta.get();
            let buffer = &*slot.buffer.get();
            let payload_start = (meta.topic_len + 1).min(meta.len);
            f(&buffer[..meta.topic_len], &buffer[payload_start..meta.len])
        };

        slot.available.store(false, Ordering::Release);
        Some(result)
    }
}

//==================================================================================WRITER
/// Outcome of appending one decoded byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PushOutcome {
    Stored,
    /// No frame in progress (slot busy or never claimed); byte dropped.
    Ignored,
    /// The frame no longer fits; it will be discarded at its terminator.
    Overflow,
}

/// Outcome of closing the frame in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FinishOutcome {
    /// Frame handed to the consumer.
    Published,
    /// Nothing was decoded; slot released.
    Empty,
    /// Frame overflowed; slot released.
    Invalid,
    /// No slot had been claimed for this frame.
    Unclaimed,
}

#[derive(Debug, Clone, Copy)]
struct ActiveFrame {
    slot: usize,
    len: usize,
    topic_len: Option<usize>,
    overflowed: bool,
}

/// Byte-pump side of the pool: claims slots in order and fills them.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RxWriter {
    next_slot: usize,
    active: Option<ActiveFrame>,
}

impl RxWriter {
    pub(crate) const fn new() -> Self {
        Self {
            next_slot: 0,
            active: None,
        }
    }

    /// Slot the next frame will be written to.
    #[cfg_attr(not(feature = "defmt"), allow(dead_code))]
    pub(crate) fn next_slot(&self) -> usize {
        self.next_slot
    }

    /// Claim the next slot for a new frame. Returns `false` (and drops the
    /// frame) when that slot is still unread.
    pub(crate) fn begin(&mut self, pool: &RxPool) -> bool {
        if pool.is_available(self.next_slot) {
            self.active = None;
            return false;
        }
        self.active = Some(ActiveFrame {
            slot: self.next_slot,
            len: 0,
            topic_len: None,
            overflowed: false,
        });
        true
    }

    /// Append one decoded byte. The first `0x00` splits topic from payload.
    pub(crate) fn push(&mut self, pool: &RxPool, byte: u8) -> PushOutcome {
        let Some(frame) = self.active.as_mut() else {
            return PushOutcome::Ignored;
        };
        if frame.overflowed {
            return PushOutcome::Ignored;
        }
        if frame.len >= RX_SLOT_CAPACITY {
            frame.overflowed = true;
            return PushOutcome::Overflow;
        }

        pool.store(frame.slot, frame.len, byte);
        if byte == END && frame.topic_len.is_none() {
            frame.topic_len = Some(frame.len);
        }
        frame.len += 1;
        PushOutcome::Stored
    }

    /// Close the frame in progress.
    pub(crate) fn finish(&mut self, pool: &RxPool) -> FinishOutcome {
        let Some(frame) = self.active.take() else {
            return FinishOutcome::Unclaimed;
        };
        if frame.overflowed {
            return FinishOutcome::Invalid;
        }
        if frame.len == 0 {
            return FinishOutcome::Empty;
        }

        pool.publish(frame.slot, frame.len, frame.topic_len.unwrap_or(frame.len));
        self.next_slot = (self.next_slot + 1) % RX_SLOT_COUNT;
        FinishOutcome::Published
    }

    /// Abandon the frame in progress without publishing it.
    pub(crate) fn discard(&mut self) {
        self.active = None;
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
