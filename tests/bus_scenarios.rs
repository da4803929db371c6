//! End-to-end scenarios on a simulated wired-AND bus.
mod helpers;

use furcoms::core::{HandlerState, END, ESCAPE, ESC_END, ESC_ESC};
use helpers::{config, queue, RecordingSink, SimBus};

//==================================================================================SINGLE_NODE
#[test]
/// Lone node: kick, header, body, terminator; back to listening afterwards.
fn test_single_node_sends_frame() {
    let sim = SimBus::new(&[config(0x0081, 0)]);
    let node = sim.node(0);

    assert!(node.is_idle());
    queue(node, "t", &[0x41]);
    assert_eq!(node.pending_frames(), 1);
    sim.run();

    assert_eq!(
        sim.wire(),
        [END, 129, 0x03, 0x03, 0xFF, 0xFE, 0xFF, 0xFF, 0xFF, b't', ESCAPE, ESC_END, 0x41, END]
    );
    assert_eq!(node.pending_frames(), 0);
    assert_eq!(node.state(), HandlerState::WaitingArbitration);
    assert_eq!(node.stats().frames_sent, 1);
}

#[test]
/// Payload bytes colliding with the framing symbols are escaped on the wire.
fn test_payload_escaping_on_the_wire() {
    let sim = SimBus::new(&[config(0x0081, 0), config(0x0100, 0)]);
    queue(sim.node(0), "x", &[0xDB, 0x00]);
    sim.run();

    let wire = sim.wire();
    let body = &wire[1 + 8..];
    assert_eq!(body, [b'x', ESCAPE, ESC_END, ESCAPE, ESC_ESC, ESCAPE, ESC_END, END]);

    let mut sink = RecordingSink::default();
    let mut receiver = sim.node(1).receiver().unwrap();
    assert_eq!(receiver.drain(&mut sink), 1);
    assert_eq!(sink.frames, [("x".to_string(), vec![0xDB, 0x00])]);
}

//==================================================================================ARBITRATION
#[test]
/// Two simultaneous senders: the lower priority value goes first, the loser
/// receives the winner's frame and then sends its own.
fn test_two_nodes_collide() {
    let sim = SimBus::new(&[config(0x0010, 20), config(0x0020, 10)]);
    queue(sim.node(0), "slow", b"B");
    queue(sim.node(1), "fast", b"A");

    assert!(sim.tick(), "opening END");
    for node in &sim.nodes {
        assert_eq!(node.state(), HandlerState::ParticipatingArbitration);
    }

    // The header decides: the winner starts its body, the loser listens.
    for _ in 0..16 {
        if sim.node(1).state() != HandlerState::ParticipatingArbitration {
            break;
        }
        assert!(sim.tick());
    }
    assert_eq!(sim.node(1).state(), HandlerState::Sending);
    assert_eq!(sim.node(0).state(), HandlerState::WaitingArbitration);

    // Last header byte: the loser starts receiving the winner's frame.
    assert!(sim.tick());
    assert_eq!(sim.node(0).state(), HandlerState::Receiving);
    assert_eq!(sim.node(1).state(), HandlerState::Sending);

    sim.run();

    let stats_slow = sim.node(0).stats();
    let stats_fast = sim.node(1).stats();
    assert_eq!(stats_fast.arbitration_wins, 1);
    assert_eq!(stats_fast.arbitration_losses, 0);
    assert_eq!(stats_slow.arbitration_losses, 1);
    assert_eq!(stats_slow.arbitration_wins, 1);
    assert_eq!(stats_slow.frames_sent, 1);
    assert_eq!(stats_fast.frames_sent, 1);

    let mut slow_rx = RecordingSink::default();
    sim.node(0).receiver().unwrap().drain(&mut slow_rx);
    assert_eq!(slow_rx.frames, [("fast".to_string(), b"A".to_vec())]);

    let mut fast_rx = RecordingSink::default();
    sim.node(1).receiver().unwrap().drain(&mut fast_rx);
    assert_eq!(fast_rx.frames, [("slow".to_string(), b"B".to_vec())]);
}

#[test]
/// Equal priorities: the lower chip id wins.
fn test_chip_id_breaks_tie() {
    let sim = SimBus::new(&[config(0x0101, 5), config(0x0100, 5), config(0x3000, 60)]);
    queue(sim.node(0), "high", b"");
    queue(sim.node(1), "low", b"");
    sim.run();

    let mut listener = RecordingSink::default();
    sim.node(2).receiver().unwrap().drain(&mut listener);
    assert_eq!(listener.topics(), ["low", "high"]);
}

#[test]
/// Three contenders leave the bus one after the other in priority order.
fn test_three_contenders() {
    let sim = SimBus::new(&[config(0x3FFF, 60), config(0x0020, 0), config(0x0008, 0)]);
    queue(sim.node(0), "third", b"3");
    queue(sim.node(1), "second", b"2");
    queue(sim.node(2), "first", b"1");
    sim.run();

    let mut sink = RecordingSink::default();
    sim.node(0).receiver().unwrap().drain(&mut sink);
    assert_eq!(sink.topics(), ["first", "second"]);
    assert_eq!(sim.node(0).stats().arbitration_losses, 2);
    assert!(sim.nodes.iter().all(|node| node.pending_frames() == 0));
}

#[test]
/// A frame closed while another node owns the bus joins the next round.
fn test_frame_closed_mid_round_joins_next_round() {
    let sim = SimBus::new(&[config(0x0001, 0), config(0x0002, 0)]);
    queue(sim.node(0), "early", b"payload");
    for _ in 0..12 {
        sim.tick();
    }
    assert_eq!(sim.node(1).state(), HandlerState::Receiving);

    queue(sim.node(1), "late", b"x");
    assert!(sim.node(1).with_transport(|t| t.fifo.is_empty()), "no kick mid-round");
    sim.run();

    assert_eq!(sim.node(1).stats().frames_sent, 1);
    let mut sink = RecordingSink::default();
    sim.node(0).receiver().unwrap().drain(&mut sink);
    assert_eq!(sink.topics(), ["late"]);
}

//==================================================================================TIMING
#[test]
/// A frame left behind on a silent bus goes out once the idle window passes.
fn test_kick_if_idle_releases_stalled_frame() {
    let sim = SimBus::new(&[config(0x0001, 0), config(0x0002, 0)]);
    queue(sim.node(0), "one", b"1");
    sim.run();

    queue(sim.node(0), "two", b"2");
    sim.run();
    assert_eq!(sim.node(0).pending_frames(), 1);
    assert!(!sim.node(0).kick_if_idle());

    sim.clock.advance(11);
    assert!(sim.node(0).kick_if_idle());
    sim.run();
    assert_eq!(sim.node(0).pending_frames(), 0);

    let mut sink = RecordingSink::default();
    sim.node(1).receiver().unwrap().drain(&mut sink);
    assert_eq!(sink.topics(), ["one", "two"]);
}

#[test]
/// Silence in the middle of a frame: the next END resynchronises every node.
fn test_silence_mid_frame_resynchronises() {
    let sim = SimBus::new(&[config(0x0001, 0)]);
    for byte in [END, 0x41, 0x03, 0x03, 0xFF, 0xFE, 0xFF, 0xFF, 0xFF, b'a', b'b'] {
        sim.clock.advance(1);
        sim.inject(byte);
    }
    assert_eq!(sim.node(0).state(), HandlerState::Receiving);

    sim.clock.advance(6);
    sim.inject(END);
    assert_eq!(sim.node(0).stats().resyncs, 1);
    assert_eq!(sim.node(0).state(), HandlerState::WaitingArbitration);

    let mut sink = RecordingSink::default();
    assert_eq!(sim.node(0).receiver().unwrap().drain(&mut sink), 0);
}

#[test]
/// `is_idle` follows the idle window.
fn test_idle_after_quiet_period() {
    let sim = SimBus::new(&[config(0x0001, 0)]);
    sim.inject(END);
    assert!(!sim.node(0).is_idle());
    sim.clock.advance(10);
    assert!(!sim.node(0).is_idle());
    sim.clock.advance(1);
    assert!(sim.node(0).is_idle());
}

//==================================================================================RECEIVE
#[test]
/// With both slots unread further frames are dropped, not overwritten.
fn test_slow_consumer_drops_frames() {
    let sim = SimBus::new(&[config(0x0001, 0), config(0x0002, 0)]);
    for topic in ["a", "b", "c"] {
        queue(sim.node(0), topic, b"");
    }
    sim.settle();

    assert_eq!(sim.node(1).stats().rx_dropped, 1);
    let mut sink = RecordingSink::default();
    sim.node(1).receiver().unwrap().drain(&mut sink);
    assert_eq!(sink.topics(), ["a", "b"]);
}

#[test]
/// Loopback delivers the node's own frame to its consumer.
fn test_loopback_node_hears_itself() {
    let looped = furcoms::protocol::bus::config::BusConfig::builder()
        .chip_id(0x0042)
        .loopback(true)
        .build()
        .unwrap();
    let sim = SimBus::new(&[looped]);
    queue(sim.node(0), "echo", b"hi");
    sim.run();

    let mut sink = RecordingSink::default();
    sim.node(0).receiver().unwrap().drain(&mut sink);
    assert_eq!(sink.frames, [("echo".to_string(), b"hi".to_vec())]);
}
