//! Byte-pump state machine.
//!
//! [`LinkEngine`] is driven by two events coming from the UART interrupt:
//! a byte was received ([`LinkEngine::on_byte_received`]) and the transmitter
//! can take a byte ([`LinkEngine::on_transmit_ready`]). Because the bus is
//! half-duplex and shared, every byte this node sends also comes back as a
//! received byte; the engine relies on that echo to arbitrate and to know
//! when its own frame is over.
//!
//! ```text
//!                END (frames pending)          lost
//!   Idle ──END──► ParticipatingArbitration ───────────► WaitingArbitration
//!                        │ won                                │ header byte 7
//!                        ▼                                    ▼
//!                     Sending ──own END sent──► SendingComplete   Receiving
//! ```
//!
//! A raw END is handled the same way in every state: it closes whatever was
//! in progress and opens the next arbitration round.
use embassy_time::Instant;

use crate::core::{HandlerState, LinkStats, RxOutcome, END};
use crate::infra::codec::slip::{Decoded, SlipDecoder};
use crate::protocol::arbitration::{ArbitrationRound, ArbitrationStep, HeaderTx, NodeIdentity};
use crate::protocol::bus::config::BusConfig;
use crate::protocol::transport::rx_pool::{FinishOutcome, PushOutcome, RxPool, RxWriter};
use crate::protocol::transport::traits::byte_transport::ByteTransport;
use crate::protocol::transport::tx_queue::TxQueue;

//==================================================================================ENGINE
/// Protocol state of one node: arbitration, framing, queues and counters.
#[derive(Debug, Clone)]
pub struct LinkEngine {
    config: BusConfig,
    state: HandlerState,
    round: ArbitrationRound,
    decoder: SlipDecoder,
    rx: RxWriter,
    tx_queue: TxQueue,
    tx_stalled: bool,
    last_activity: Option<Instant>,
    stats: LinkStats,
}

impl LinkEngine {
    pub fn new(config: BusConfig) -> Self {
        Self {
            config,
            state: HandlerState::Idle,
            round: ArbitrationRound::idle(),
            decoder: SlipDecoder::new(),
            rx: RxWriter::new(),
            tx_queue: TxQueue::new(),
            tx_stalled: false,
            last_activity: None,
            stats: LinkStats::default(),
        }
    }

    pub fn state(&self) -> HandlerState {
        self.state
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Identity used from the next round on.
    pub fn identity_mut(&mut self) -> &mut NodeIdentity {
        &mut self.config.identity
    }

    pub fn tx_queue(&self) -> &TxQueue {
        &self.tx_queue
    }

    pub fn tx_queue_mut(&mut self) -> &mut TxQueue {
        &mut self.tx_queue
    }

    pub fn pending_frames(&self) -> usize {
        self.tx_queue.pending_frames()
    }

    /// Timestamp of the last received byte (or arbitration kick).
    pub fn last_activity(&self) -> Option<Instant> {
        self.last_activity
    }

    /// `true` when no round is running: the handler is `Idle` or the bus
    /// has been silent for longer than the idle window.
    pub fn is_idle(&self, now: Instant) -> bool {
        if self.state == HandlerState::Idle {
            return true;
        }
        match self.last_activity {
            None => true,
            Some(last) => now.saturating_duration_since(last) > self.config.idle_window,
        }
    }

    /// Open a round on a quiet bus by sending a raw END. The round itself
    /// starts when that END comes back.
    pub fn kick_arbitration<T: ByteTransport>(&mut self, now: Instant, transport: &mut T) {
        #[cfg(feature = "defmt")]
        defmt::debug!("Bus idle, kicking arbitration");

        transport.send(END);
        self.round.listen();
        self.transition(HandlerState::ParticipatingArbitration);
        self.last_activity = Some(now);
    }

    //==============================================================================RECEIVE
    /// Feed one byte read from the bus.
    pub fn on_byte_received<T: ByteTransport>(
        &mut self,
        byte: u8,
        now: Instant,
        transport: &mut T,
        pool: &RxPool,
    ) -> RxOutcome {
        let stale = self.last_activity.map_or(true, |last| {
            now.saturating_duration_since(last) > self.config.resync_window
        });
        self.last_activity = Some(now);

        if byte == END {
            return self.on_terminator(stale, transport, pool);
        }

        let next = match self.state {
            HandlerState::Idle => HandlerState::Idle,
            HandlerState::ParticipatingArbitration => self.on_header_byte(byte, transport, pool),
            HandlerState::WaitingArbitration => self.on_foreign_header_byte(pool),
            HandlerState::Receiving => {
                self.decode_into_slot(byte, pool);
                HandlerState::Receiving
            }
            HandlerState::Sending | HandlerState::SendingComplete => self.on_own_echo(byte, pool),
        };
        self.transition(next);
        RxOutcome::Consumed
    }

    /// Raw END: resync if stale, complete the current state, start a round.
    fn on_terminator<T: ByteTransport>(
        &mut self,
        stale: bool,
        transport: &mut T,
        pool: &RxPool,
    ) -> RxOutcome {
        if stale && self.state != HandlerState::Idle {
            #[cfg(feature = "defmt")]
            defmt::warn!("Stale END in {}, resynchronising", self.state);

            self.stats.resyncs = self.stats.resyncs.wrapping_add(1);
            if self.state == HandlerState::Sending {
                self.abort_transmission(transport);
            }
            self.rx.discard();
            self.transition(HandlerState::Idle);
        }

        let outcome = match self.state {
            HandlerState::Receiving => self.finish_frame(pool),
            HandlerState::SendingComplete if self.config.loopback => self.finish_frame(pool),
            HandlerState::Sending => {
                self.abort_transmission(transport);
                RxOutcome::Consumed
            }
            HandlerState::Idle
            | HandlerState::ParticipatingArbitration
            | HandlerState::WaitingArbitration
            | HandlerState::SendingComplete => {
                self.rx.discard();
                RxOutcome::Consumed
            }
        };

        self.tx_queue.release_in_flight();
        self.decoder.reset();
        self.start_round(transport);
        outcome
    }

    /// Every END opens a round; join it when a closed frame is waiting.
    fn start_round<T: ByteTransport>(&mut self, transport: &mut T) {
        self.tx_stalled = false;
        if self.tx_queue.pending_frames() > 0 {
            self.round.participate(&self.config.identity);
            self.transition(HandlerState::ParticipatingArbitration);
            transport.enable_tx_interrupt();
        } else {
            self.round.listen();
            self.transition(HandlerState::WaitingArbitration);
        }
    }

    fn on_header_byte<T: ByteTransport>(
        &mut self,
        byte: u8,
        transport: &mut T,
        pool: &RxPool,
    ) -> HandlerState {
        // Kicked, but the opening END has not come back yet.
        if !self.round.is_participant() {
            return HandlerState::ParticipatingArbitration;
        }

        match self.round.observe(byte) {
            ArbitrationStep::Continue => {
                if self.tx_stalled && self.round.map_ready() {
                    self.tx_stalled = false;
                    transport.enable_tx_interrupt();
                }
                HandlerState::ParticipatingArbitration
            }
            ArbitrationStep::Lost => {
                #[cfg(feature = "defmt")]
                defmt::debug!(
                    "Arbitration lost at position {}",
                    self.round.loss_position()
                );

                self.stats.arbitration_losses = self.stats.arbitration_losses.wrapping_add(1);
                self.round.withdraw();
                self.tx_stalled = false;
                transport.disable_tx_interrupt();
                HandlerState::WaitingArbitration
            }
            ArbitrationStep::Won => {
                #[cfg(feature = "defmt")]
                defmt::debug!("Arbitration won");

                self.stats.arbitration_wins = self.stats.arbitration_wins.wrapping_add(1);
                if self.config.loopback {
                    self.claim_slot(pool);
                }
                transport.enable_tx_interrupt();
                HandlerState::Sending
            }
        }
    }

    fn on_foreign_header_byte(&mut self, pool: &RxPool) -> HandlerState {
        if self.round.observe_passive() {
            self.claim_slot(pool);
            HandlerState::Receiving
        } else {
            HandlerState::WaitingArbitration
        }
    }

    fn on_own_echo(&mut self, byte: u8, pool: &RxPool) -> HandlerState {
        if !self.round.header_complete() {
            self.round.observe_passive();
            return self.state;
        }

        if !self.tx_queue.confirm_echo(byte) {
            #[cfg(feature = "defmt")]
            defmt::warn!("Echo mismatch: bus carried {=u8:#x}", byte);

            self.stats.echo_mismatches = self.stats.echo_mismatches.wrapping_add(1);
        }
        if self.config.loopback {
            self.decode_into_slot(byte, pool);
        }
        self.state
    }

    fn claim_slot(&mut self, pool: &RxPool) {
        self.decoder.reset();
        if !self.rx.begin(pool) {
            #[cfg(feature = "defmt")]
            defmt::warn!("RX slot {} still unread, dropping frame", self.rx.next_slot());

            self.stats.rx_dropped = self.stats.rx_dropped.wrapping_add(1);
        }
    }

    fn decode_into_slot(&mut self, byte: u8, pool: &RxPool) {
        match self.decoder.feed(byte) {
            Ok(Decoded::Byte(b)) => {
                if self.rx.push(pool, b) == PushOutcome::Overflow {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("RX frame overflow, discarding");

                    self.stats.rx_overflows = self.stats.rx_overflows.wrapping_add(1);
                }
            }
            Ok(Decoded::Pending) | Ok(Decoded::Terminator) => {}
            Err(_err) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("Decode error: {}", _err);

                self.stats.decode_errors = self.stats.decode_errors.wrapping_add(1);
            }
        }
    }

    fn finish_frame(&mut self, pool: &RxPool) -> RxOutcome {
        match self.rx.finish(pool) {
            FinishOutcome::Published => {
                #[cfg(feature = "defmt")]
                defmt::trace!("Frame published");

                self.stats.frames_received = self.stats.frames_received.wrapping_add(1);
                RxOutcome::FrameReady
            }
            FinishOutcome::Empty | FinishOutcome::Invalid | FinishOutcome::Unclaimed => {
                RxOutcome::Consumed
            }
        }
    }

    fn abort_transmission<T: ByteTransport>(&mut self, transport: &mut T) {
        #[cfg(feature = "defmt")]
        defmt::warn!("Transmission aborted by foreign END");

        self.tx_queue.skip_frame();
        self.rx.discard();
        self.stats.aborted_transmissions = self.stats.aborted_transmissions.wrapping_add(1);
        transport.disable_tx_interrupt();
    }

    //==============================================================================TRANSMIT
    /// The transport can take one more byte.
    pub fn on_transmit_ready<T: ByteTransport>(&mut self, transport: &mut T) {
        if self.round.has_tx_pending() {
            match self.round.next_tx() {
                HeaderTx::Byte(byte) => transport.send(byte),
                HeaderTx::Stalled => {
                    self.tx_stalled = true;
                    transport.disable_tx_interrupt();
                }
                HeaderTx::Done => transport.disable_tx_interrupt(),
            }
            return;
        }

        match self.state {
            HandlerState::Sending => self.send_body_byte(transport),
            HandlerState::Idle
            | HandlerState::ParticipatingArbitration
            | HandlerState::WaitingArbitration
            | HandlerState::Receiving
            | HandlerState::SendingComplete => transport.disable_tx_interrupt(),
        }
    }

    fn send_body_byte<T: ByteTransport>(&mut self, transport: &mut T) {
        match self.tx_queue.pop() {
            Some(END) => {
                transport.send(END);
                self.complete_transmission(transport);
            }
            Some(byte) => transport.send(byte),
            None => self.complete_transmission(transport),
        }
    }

    fn complete_transmission<T: ByteTransport>(&mut self, transport: &mut T) {
        self.tx_queue.complete_frame();
        self.stats.frames_sent = self.stats.frames_sent.wrapping_add(1);
        transport.disable_tx_interrupt();

        let next = if self.config.await_own_terminator {
            HandlerState::SendingComplete
        } else {
            HandlerState::Idle
        };
        self.transition(next);
    }

    fn transition(&mut self, next: HandlerState) {
        if next != self.state {
            #[cfg(feature = "defmt")]
            defmt::trace!("{} -> {}", self.state, next);

            self.state = next;
        }
    }
}
