use super::*;

extern crate std;
use std::vec::Vec;

fn write_frame(writer: &mut RxWriter, pool: &RxPool, bytes: &[u8]) -> FinishOutcome {
    if !writer.begin(pool) {
        return FinishOutcome::Unclaimed;
    }
    for &b in bytes {
        writer.push(pool, b);
    }
    writer.finish(pool)
}

fn read(pool: &RxPool, index: usize) -> Option<(Vec<u8>, Vec<u8>)> {
    pool.consume(index, |topic, payload| (topic.to_vec(), payload.to_vec()))
}

#[test]
/// First decoded zero splits topic from payload.
fn test_topic_payload_split() {
    let pool = RxPool::new();
    let mut writer = RxWriter::new();

    assert_eq!(
        write_frame(&mut writer, &pool, b"temp\0\x01\x00\x02"),
        FinishOutcome::Published
    );
    let (topic, payload) = read(&pool, 0).unwrap();
    assert_eq!(topic, b"temp");
    assert_eq!(payload, [0x01, 0x00, 0x02]);
    assert!(!pool.is_available(0));
}

#[test]
/// Frames without a separator are all topic.
fn test_frame_without_separator() {
    let pool = RxPool::new();
    let mut writer = RxWriter::new();
    write_frame(&mut writer, &pool, b"ping");
    let (topic, payload) = read(&pool, 0).unwrap();
    assert_eq!(topic, b"ping");
    assert!(payload.is_empty());
}

#[test]
/// Slots fill round-robin; a busy slot drops the new frame untouched.
fn test_busy_slot_drops_frame() {
    let pool = RxPool::new();
    let mut writer = RxWriter::new();

    write_frame(&mut writer, &pool, b"a\0one");
    write_frame(&mut writer, &pool, b"b\0two");
    assert_eq!(pool.unread(), 2);

    assert_eq!(
        write_frame(&mut writer, &pool, b"c\0three"),
        FinishOutcome::Unclaimed
    );
    assert_eq!(writer.next_slot(), 0);

    assert_eq!(read(&pool, 0).unwrap().1, b"one");
    assert_eq!(read(&pool, 1).unwrap().1, b"two");

    write_frame(&mut writer, &pool, b"d\0four");
    assert_eq!(read(&pool, 0).unwrap().0, b"d");
    assert_eq!(read(&pool, 1), None);
}

#[test]
/// Overflowing frames are rejected and release their slot.
fn test_overflow_invalidates_frame() {
    let pool = RxPool::new();
    let mut writer = RxWriter::new();

    assert!(writer.begin(&pool));
    for _ in 0..RX_SLOT_CAPACITY {
        assert_eq!(writer.push(&pool, 0x41), PushOutcome::Stored);
    }
    assert_eq!(writer.push(&pool, 0x41), PushOutcome::Overflow);
    assert_eq!(writer.push(&pool, 0x41), PushOutcome::Ignored);
    assert_eq!(writer.finish(&pool), FinishOutcome::Invalid);

    assert_eq!(pool.unread(), 0);
    assert_eq!(writer.next_slot(), 0);
}

#[test]
/// A frame of exactly slot size is still accepted.
fn test_full_slot_frame_accepted() {
    let pool = RxPool::new();
    let mut writer = RxWriter::new();
    let frame = [0x42u8; RX_SLOT_CAPACITY];
    assert_eq!(write_frame(&mut writer, &pool, &frame), FinishOutcome::Published);
    assert_eq!(read(&pool, 0).unwrap().0.len(), RX_SLOT_CAPACITY);
}

#[test]
/// Empty and discarded frames never reach the consumer.
fn test_empty_and_discarded_frames() {
    let pool = RxPool::new();
    let mut writer = RxWriter::new();

    assert_eq!(write_frame(&mut writer, &pool, &[]), FinishOutcome::Empty);

    assert!(writer.begin(&pool));
    writer.push(&pool, b'x');
    writer.discard();
    assert_eq!(writer.push(&pool, b'y'), PushOutcome::Ignored);
    assert_eq!(writer.finish(&pool), FinishOutcome::Unclaimed);

    assert_eq!(pool.unread(), 0);
}
