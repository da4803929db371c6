//! Priority arbitration over a wired-AND serial bus.
//!
//! Every node with a pending frame sends the same eight-byte header after a
//! round starts:
//!
//! ```text
//! index  0         1-2        3          4-6              7
//!        priority  chip id    latency_a  collision map    latency_b
//! ```
//!
//! Bytes 0-2 are compared against the bus echo to find the first bit this
//! node lost. Bytes 4-6 carry every participant's collision map; because the
//! bus ANDs them, each node sees the union of all cleared bits and can tell
//! whether someone survived longer than it did. The two latency slots are
//! never interpreted: they absorb the UART pipeline delay between reading a
//! byte and being able to influence the next one.
//!
//! Two contenders are always separated. With three or more, a node that
//! already lost keeps driving its remaining header bits; its zeros can make
//! two survivors record the same loss position, and the header alone cannot
//! tell them apart.
use crate::core::{
    ARBITRATION_COMPARED_LEN, ARBITRATION_HEADER_LEN, CHIP_ID_MAX, COLLISION_MAP_LEN,
    COLLISION_MAP_OFFSET, LATENCY_SENTINEL,
};
use crate::error::ConfigError;
use crate::infra::codec::bits::{
    collision_map, is_excluded, linear_position, mismatch_position, priority_byte,
    spread_chip_id,
};

//==================================================================================NODE_IDENTITY
/// Static identity a node arbitrates with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NodeIdentity {
    chip_id: u16,
    priority: i8,
}

impl Default for NodeIdentity {
    fn default() -> Self {
        Self {
            chip_id: 0x0FFF,
            priority: i8::MAX,
        }
    }
}

impl NodeIdentity {
    /// Build an identity; `chip_id` must fit in 14 bits.
    pub const fn new(chip_id: u16, priority: i8) -> Result<Self, ConfigError> {
        if chip_id > CHIP_ID_MAX {
            return Err(ConfigError::InvalidChipId { chip_id });
        }
        Ok(Self { chip_id, priority })
    }

    pub const fn chip_id(&self) -> u16 {
        self.chip_id
    }

    /// Priority as configured (before clamping).
    pub const fn priority(&self) -> i8 {
        self.priority
    }

    pub fn set_chip_id(&mut self, chip_id: u16) -> Result<(), ConfigError> {
        if chip_id > CHIP_ID_MAX {
            return Err(ConfigError::InvalidChipId { chip_id });
        }
        self.chip_id = chip_id;
        Ok(())
    }

    /// Any value is accepted; it saturates to [-60, 60] on the wire.
    pub fn set_priority(&mut self, priority: i8) {
        self.priority = priority;
    }
}

//==================================================================================PACKET
/// Header image for one round. Rebuilt from the identity every time the
/// node joins a round; the collision map is filled in once bytes 0-2 are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArbitrationPacket {
    pub priority: u8,
    pub chip_id: [u8; 2],
    pub collision_map: [u8; COLLISION_MAP_LEN],
}

impl ArbitrationPacket {
    pub const fn new(identity: &NodeIdentity) -> Self {
        Self {
            priority: priority_byte(identity.priority),
            chip_id: spread_chip_id(identity.chip_id),
            collision_map: [0xFF; COLLISION_MAP_LEN],
        }
    }

    /// Header byte at `index` in wire order.
    pub const fn byte(&self, index: usize) -> u8 {
        match index {
            0 => self.priority,
            1 => self.chip_id[0],
            2 => self.chip_id[1],
            4..=6 => self.collision_map[index - COLLISION_MAP_OFFSET],
            _ => LATENCY_SENTINEL,
        }
    }

    /// Full header in wire order.
    pub fn to_bytes(&self) -> [u8; ARBITRATION_HEADER_LEN] {
        let mut out = [LATENCY_SENTINEL; ARBITRATION_HEADER_LEN];
        for (index, slot) in out.iter_mut().enumerate() {
            *slot = self.byte(index);
        }
        out
    }
}

//==================================================================================ROUND
/// Verdict after observing one header byte while participating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ArbitrationStep {
    /// Round still undecided for this node.
    Continue,
    /// A peer survived longer; stop competing and listen.
    Lost,
    /// Header complete without exclusion: the bus is ours.
    Won,
}

/// What the transmit side of a round wants to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderTx {
    /// Put this byte on the wire.
    Byte(u8),
    /// Collision map not computed yet; wait for more echoes.
    Stalled,
    /// Nothing left (header fully sent, or not participating).
    Done,
}

/// Per-round bookkeeping shared by participants and listeners.
///
/// The receive index and the transmit cursor advance independently: the
/// transport may hold a byte or two in flight, so a node usually transmits
/// ahead of what it has already read back.
#[derive(Debug, Clone, Copy)]
pub struct ArbitrationRound {
    packet: ArbitrationPacket,
    rx_index: usize,
    tx_cursor: usize,
    transmitting: bool,
    loss_position: u8,
    map_ready: bool,
}

impl Default for ArbitrationRound {
    fn default() -> Self {
        Self::idle()
    }
}

impl ArbitrationRound {
    /// A round this node only listens to.
    pub const fn idle() -> Self {
        Self {
            packet: ArbitrationPacket::new(&NodeIdentity {
                chip_id: 0,
                priority: 0,
            }),
            rx_index: 0,
            tx_cursor: ARBITRATION_HEADER_LEN,
            transmitting: false,
            loss_position: 0,
            map_ready: false,
        }
    }

    /// Start listening to a new round.
    pub fn listen(&mut self) {
        *self = Self::idle();
    }

    /// Start a new round as a participant.
    pub fn participate(&mut self, identity: &NodeIdentity) {
        *self = Self {
            packet: ArbitrationPacket::new(identity),
            rx_index: 0,
            tx_cursor: 0,
            transmitting: true,
            loss_position: 0,
            map_ready: false,
        };
    }

    /// Stop putting header bytes on the wire but keep counting the round.
    pub fn withdraw(&mut self) {
        self.transmitting = false;
    }

    /// `true` while this node is still driving header bytes in this round.
    pub fn is_participant(&self) -> bool {
        self.transmitting
    }

    /// `true` once the collision map has been computed.
    pub fn map_ready(&self) -> bool {
        self.map_ready
    }

    /// Number of header bytes observed so far.
    pub fn rx_index(&self) -> usize {
        self.rx_index
    }

    /// Linear position of the first lost bit (0 = none).
    pub fn loss_position(&self) -> u8 {
        self.loss_position
    }

    pub fn packet(&self) -> &ArbitrationPacket {
        &self.packet
    }

    /// `true` once all header bytes went past on the bus.
    pub fn header_complete(&self) -> bool {
        self.rx_index >= ARBITRATION_HEADER_LEN
    }

    /// `true` while this node still has header bytes to put on the wire.
    pub fn has_tx_pending(&self) -> bool {
        self.transmitting && self.tx_cursor < ARBITRATION_HEADER_LEN
    }

    /// Count a header byte without interpreting it. Returns `true` exactly
    /// once: on the last header byte.
    pub fn observe_passive(&mut self) -> bool {
        let index = self.rx_index;
        self.rx_index = self.rx_index.saturating_add(1);
        index == ARBITRATION_HEADER_LEN - 1
    }

    /// Feed the echo of header byte `rx_index` while participating.
    pub fn observe(&mut self, seen: u8) -> ArbitrationStep {
        let index = self.rx_index;
        self.rx_index = self.rx_index.saturating_add(1);

        match index {
            0..=2 => {
                let sent = self.packet.byte(index);
                if sent != seen && self.loss_position == 0 {
                    self.loss_position = linear_position(index, mismatch_position(sent, seen));
                }
                if index == ARBITRATION_COMPARED_LEN - 1 {
                    self.packet.collision_map = collision_map(self.loss_position);
                    self.map_ready = true;
                }
                ArbitrationStep::Continue
            }
            4..=6 => {
                if is_excluded(seen, index - COLLISION_MAP_OFFSET, self.loss_position) {
                    ArbitrationStep::Lost
                } else if index == COLLISION_MAP_OFFSET + COLLISION_MAP_LEN - 1 {
                    ArbitrationStep::Won
                } else {
                    ArbitrationStep::Continue
                }
            }
            _ => ArbitrationStep::Continue,
        }
    }

    /// Next header byte to transmit, if any.
    pub fn next_tx(&mut self) -> HeaderTx {
        if !self.has_tx_pending() {
            return HeaderTx::Done;
        }
        if self.tx_cursor >= COLLISION_MAP_OFFSET && !self.map_ready {
            return HeaderTx::Stalled;
        }
        let byte = self.packet.byte(self.tx_cursor);
        self.tx_cursor += 1;
        HeaderTx::Byte(byte)
    }
}
