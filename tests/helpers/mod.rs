/// Test doubles: a simulated wired-AND bus shared by several `FurBus` nodes,
/// a manually advanced clock and a tokio-backed timer.
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Instant;
use furcoms::protocol::bus::{config::BusConfig, FurBus};
use furcoms::protocol::transport::traits::{
    bus_clock::BusClock, bus_timer::BusTimer, byte_transport::ByteTransport,
    frame_sink::FrameSink,
};
use tokio::time::{sleep, Duration};

//==================================================================================CLOCK
#[derive(Clone, Default)]
#[allow(dead_code)]
/// Shared millisecond counter; every node of a simulation reads the same one.
pub struct ManualClock(Arc<AtomicU64>);

#[allow(dead_code)]
impl ManualClock {
    pub fn advance(&self, millis: u64) {
        self.0.fetch_add(millis, Ordering::SeqCst);
    }

    pub fn now_ms(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

impl BusClock for ManualClock {
    fn now(&self) -> Instant {
        Instant::from_millis(self.now_ms())
    }
}

//==================================================================================TRANSPORT
#[derive(Default)]
#[allow(dead_code)]
/// UART double: a transmit FIFO and the TX interrupt enable bit.
pub struct SimTransport {
    pub fifo: VecDeque<u8>,
    pub tx_enabled: bool,
}

impl ByteTransport for SimTransport {
    fn send(&mut self, byte: u8) {
        self.fifo.push_back(byte);
    }

    fn enable_tx_interrupt(&mut self) {
        self.tx_enabled = true;
    }

    fn disable_tx_interrupt(&mut self) {
        self.tx_enabled = false;
    }
}

#[allow(dead_code)]
pub type Node = FurBus<CriticalSectionRawMutex, SimTransport, ManualClock>;

//==================================================================================BUS
#[allow(dead_code)]
/// Half-duplex bus where a `0` bit from any node wins (wired-AND).
///
/// One [`tick`](SimBus::tick) is one byte time: nodes with the TX interrupt
/// enabled and an empty FIFO get a transmit slot, the front bytes of every
/// FIFO are ANDed together and the result is delivered to every node,
/// senders included.
pub struct SimBus {
    pub nodes: Vec<Node>,
    pub clock: ManualClock,
    wire: Mutex<Vec<u8>>,
}

#[allow(dead_code)]
impl SimBus {
    pub fn new(configs: &[BusConfig]) -> Self {
        let clock = ManualClock::default();
        clock.advance(1_000);
        let nodes = configs
            .iter()
            .map(|config| FurBus::new(*config, SimTransport::default(), clock.clone()))
            .collect();
        Self {
            nodes,
            clock,
            wire: Mutex::new(Vec::new()),
        }
    }

    pub fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    /// Every byte that went over the bus so far.
    pub fn wire(&self) -> Vec<u8> {
        self.wire.lock().unwrap().clone()
    }

    pub fn tick(&self) -> bool {
        self.clock.advance(1);

        for node in &self.nodes {
            if node.with_transport(|t| t.tx_enabled && t.fifo.is_empty()) {
                node.on_transmit_ready();
            }
        }

        let mut bus: Option<u8> = None;
        for node in &self.nodes {
            if let Some(byte) = node.with_transport(|t| t.fifo.pop_front()) {
                bus = Some(bus.map_or(byte, |level| level & byte));
            }
        }

        match bus {
            Some(byte) => {
                self.inject(byte);
                true
            }
            None => false,
        }
    }

    /// Put a byte on the bus as if an unseen node had sent it.
    pub fn inject(&self, byte: u8) {
        self.wire.lock().unwrap().push(byte);
        for node in &self.nodes {
            node.on_byte_received(byte);
        }
    }

    fn transmitting(&self) -> bool {
        self.nodes
            .iter()
            .any(|node| node.with_transport(|t| t.tx_enabled || !t.fifo.is_empty()))
    }

    /// Tick until the bus goes quiet. Returns the number of bytes exchanged.
    pub fn run(&self) -> usize {
        let mut bytes = 0;
        for _ in 0..20_000 {
            if self.tick() {
                bytes += 1;
            } else if !self.transmitting() {
                return bytes;
            }
        }
        panic!("bus never went quiet");
    }

    /// Run, then let the idle window expire and kick stalled nodes, until
    /// nothing is pending anywhere.
    pub fn settle(&self) {
        for _ in 0..16 {
            self.run();
            if self.nodes.iter().all(|node| node.pending_frames() == 0) {
                return;
            }
            self.clock.advance(20);
            for node in &self.nodes {
                node.kick_if_idle();
            }
        }
        panic!("frames still pending");
    }
}

//==================================================================================SINKS
#[derive(Default)]
#[allow(dead_code)]
/// Records every delivered frame.
pub struct RecordingSink {
    pub frames: Vec<(String, Vec<u8>)>,
}

impl FrameSink for RecordingSink {
    fn on_frame(&mut self, topic: &str, payload: &[u8]) {
        self.frames.push((topic.to_string(), payload.to_vec()));
    }
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn topics(&self) -> Vec<&str> {
        self.frames.iter().map(|(topic, _)| topic.as_str()).collect()
    }
}

#[allow(dead_code)]
/// Timer based on `tokio::time::sleep` to drive delays in tests.
pub struct MockTimer;

impl BusTimer for MockTimer {
    async fn delay_ms(&mut self, millis: u32) {
        sleep(Duration::from_millis(millis as u64)).await;
    }
}

#[allow(dead_code)]
pub fn config(chip_id: u16, priority: i8) -> BusConfig {
    BusConfig::builder()
        .chip_id(chip_id)
        .priority(priority)
        .build()
        .unwrap()
}

#[allow(dead_code)]
/// Synchronously queue a frame (the gate is never contended in these tests).
pub fn queue(node: &Node, topic: &str, payload: &[u8]) {
    let mut writer = node.try_start_packet(topic).unwrap();
    writer.add_packet_data(payload).unwrap();
    writer.close_packet().unwrap();
}
