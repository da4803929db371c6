//! # Quickstart Example
//!
//! Three furcoms nodes sharing a simulated wired-AND serial line:
//! - two producers publish on different topics with different priorities
//! - a consumer fans frames out by topic with a `TopicRouter`
//! - a bus task plays the UART interrupt for every node
//!
//! This example uses `std` (tokio and the embassy-time std driver) for a
//! quick trial run on the host.
//!
//! ```bash
//! cargo run --example quickstart
//! ```

use std::collections::VecDeque;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Duration as EmbassyDuration;
use furcoms::error::WriteError;
use furcoms::protocol::bus::{config::BusConfig, FurBus};
use furcoms::protocol::topic::{TopicFilter, TopicRouter};
use furcoms::protocol::transport::traits::{
    bus_clock::EmbassyClock, bus_timer::EmbassyTimer, byte_transport::ByteTransport,
};
use static_cell::StaticCell;
use tokio::time::{sleep, Duration};

/// In-memory UART: the bytes a node wants on the line plus its TX interrupt flag.
#[derive(Default)]
struct LineTransport {
    fifo: VecDeque<u8>,
    tx_enabled: bool,
}

impl ByteTransport for LineTransport {
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

type Node = FurBus<CriticalSectionRawMutex, LineTransport, EmbassyClock>;

static NODES: StaticCell<[Node; 3]> = StaticCell::new();

/// One byte time per millisecond: grant transmit slots, AND the pending
/// bytes together and echo the result to every node.
async fn line_task(nodes: &'static [Node; 3]) {
    loop {
        sleep(Duration::from_millis(1)).await;

        for node in nodes {
            if node.with_transport(|t| t.tx_enabled && t.fifo.is_empty()) {
                node.on_transmit_ready();
            }
        }

        let level = nodes
            .iter()
            .filter_map(|node| node.with_transport(|t| t.fifo.pop_front()))
            .reduce(|level, byte| level & byte);

        match level {
            Some(byte) => {
                for node in nodes {
                    node.on_byte_received(byte);
                }
            }
            None => {
                for node in nodes {
                    node.kick_if_idle();
                }
            }
        }
    }
}

/// Composed piece by piece; nothing goes out before `close_packet`.
async fn publish_led(node: &Node, on: bool) -> Result<(), WriteError> {
    let state: &[u8] = if on { b"on" } else { b"off" };
    let mut writer = node.start_packet("led").await?;
    writer.add_packet_data(b"state=")?;
    writer.add_packet_data(state)?;
    writer.close_packet()
}

/// Timing windows sized for the 1 ms byte time of `line_task`.
fn node(chip_id: u16, priority: i8) -> Node {
    let config = BusConfig::builder()
        .chip_id(chip_id)
        .priority(priority)
        .resync_window(EmbassyDuration::from_millis(20))
        .idle_window(EmbassyDuration::from_millis(40))
        .build()
        .expect("valid configuration");
    FurBus::new(config, LineTransport::default(), EmbassyClock)
}

#[tokio::main]
async fn main() {
    println!("=== furcoms Quickstart ===\n");

    // ======================================================================
    // 1. Bring up three nodes and the shared line
    // ======================================================================
    let nodes: &'static [Node; 3] = NODES.init([node(0x0010, -10), node(0x0020, 10), node(0x0030, 0)]);
    tokio::spawn(line_task(nodes));

    // ======================================================================
    // 2. Producers: a temperature sensor and a LED controller
    // ======================================================================
    tokio::spawn(async move {
        for step in 0..10u8 {
            let reading = [20 + step % 3, step];
            if let Err(e) = nodes[0].send_packet("sensors/temp", &reading).await {
                println!("   sensor: {e}");
            }
            sleep(Duration::from_millis(40)).await;
        }
    });

    tokio::spawn(async move {
        for step in 0..5u8 {
            if let Err(e) = publish_led(&nodes[1], step % 2 == 0).await {
                println!("   led: {e}");
            }
            sleep(Duration::from_millis(75)).await;
        }
    });

    // ======================================================================
    // 3. Consumer on the third node, routing by topic
    // ======================================================================
    let mut receiver = nodes[2].receiver().expect("first receiver");
    let mut temperatures = |topic: &str, payload: &[u8]| {
        println!("   [{topic}] {} C (sample {})", payload[0], payload[1]);
    };
    let mut leds = |topic: &str, payload: &[u8]| {
        println!("   [{topic}] {}", String::from_utf8_lossy(payload));
    };

    let mut router: TopicRouter<'_, 2> = TopicRouter::new();
    router
        .subscribe(TopicFilter::Prefix("sensors/"), &mut temperatures)
        .expect("free slot");
    router
        .subscribe(TopicFilter::Exact("led"), &mut leds)
        .expect("free slot");

    println!("Receiving on node 0x0030 (stops after 200 ms of silence)");
    let mut timer = EmbassyTimer;
    while receiver.receive_timeout(&mut router, &mut timer, 200).await > 0 {}
    println!("   {} frame(s) without subscriber\n", router.unmatched());

    // ======================================================================
    // 4. Link statistics
    // ======================================================================
    for node in nodes {
        let stats = node.stats();
        println!(
            "Node sent={} received={} wins={} losses={} dropped={} echo_mismatches={}",
            stats.frames_sent,
            stats.frames_received,
            stats.arbitration_wins,
            stats.arbitration_losses,
            stats.rx_dropped,
            stats.echo_mismatches
        );
    }

    println!("\n=== Done ===");
}
