//! Bit helpers for the arbitration header.
//!
//! The bus behaves as a wired-AND: a `0` bit driven by any node overrides a
//! `1`. Arbitration therefore compares what a node sent with what it read
//! back and records the first bit where the two disagree.
//!
//! # Linear bit positions
//!
//! The three compared header bytes form a 24-bit span. Positions count from
//! the least significant bit of the last byte (1) up to the most significant
//! bit of the first byte (24); 0 means "never mismatched".
//!
//! ```text
//! byte index   0 (priority)   1 (chip id)   2 (chip id)
//! positions    24 ......17    16 ......9    8 .......1
//! ```
use crate::core::{ARBITRATION_COMPARED_LEN, CHIP_ID_MAX, PRIORITY_MAX, PRIORITY_MIN};

/// Mask covering the 24 bits of the collision map.
pub const COLLISION_MAP_MASK: u32 = 0x00FF_FFFF;

/// Position of the first differing bit between `a` and `b`, scanning from the
/// MSB: 8 when the MSB differs, 1 when only the LSB differs, 0 when equal.
#[inline]
pub const fn mismatch_position(a: u8, b: u8) -> u8 {
    let diff = a ^ b;
    if diff == 0 {
        0
    } else {
        8 - diff.leading_zeros() as u8
    }
}

/// Bias a per-byte mismatch position by the bytes that follow it in the
/// compared span, producing a linear position in `1..=24`.
#[inline]
pub const fn linear_position(byte_index: usize, bit_position: u8) -> u8 {
    if bit_position == 0 {
        return 0;
    }
    bit_position + 8 * (ARBITRATION_COMPARED_LEN - 1 - byte_index) as u8
}

/// Map a signed priority onto the wire byte. Lower bytes win arbitration.
///
/// The result always has bit 0 set so it can never be mistaken for `END`.
#[inline]
pub const fn priority_byte(priority: i8) -> u8 {
    if priority < PRIORITY_MIN {
        0x01
    } else if priority > PRIORITY_MAX {
        0xFF
    } else {
        1 | (((priority as i16 + 64) as u8) << 1)
    }
}

/// Spread a 14-bit chip id over two bytes, seven bits each, most significant
/// half first. Bit 0 of both bytes stays set.
#[inline]
pub const fn spread_chip_id(chip_id: u16) -> [u8; 2] {
    let id = chip_id & CHIP_ID_MAX;
    [
        ((((id >> 7) & 0x7F) as u8) << 1) | 1,
        (((id & 0x7F) as u8) << 1) | 1,
    ]
}

/// Inverse of [`spread_chip_id`].
#[inline]
pub const fn gather_chip_id(bytes: [u8; 2]) -> u16 {
    (((bytes[0] >> 1) as u16) << 7) | ((bytes[1] >> 1) as u16)
}

/// Collision map broadcast by a node whose first mismatch was at `loss_position`:
/// all ones except that bit, little-endian over three bytes.
#[inline]
pub const fn collision_map(loss_position: u8) -> [u8; 3] {
    let map = if loss_position < 24 {
        !(1u32 << loss_position) & COLLISION_MAP_MASK
    } else {
        COLLISION_MAP_MASK
    };
    let bytes = map.to_le_bytes();
    [bytes[0], bytes[1], bytes[2]]
}

/// Bits strictly below `loss_position`. A peer clearing any of them survived
/// longer than this node.
#[inline]
pub const fn exclusion_mask(loss_position: u8) -> u32 {
    if loss_position == 0 {
        0
    } else if loss_position >= 24 {
        COLLISION_MAP_MASK
    } else {
        COLLISION_MAP_MASK >> (24 - loss_position)
    }
}

/// `true` when the observed collision-map byte at `map_index` (0..3) shows a
/// peer with a lower loss position than `loss_position`.
#[inline]
pub const fn is_excluded(observed: u8, map_index: usize, loss_position: u8) -> bool {
    let cleared = ((!observed) as u32) << (8 * map_index);
    cleared & exclusion_mask(loss_position) != 0
}
