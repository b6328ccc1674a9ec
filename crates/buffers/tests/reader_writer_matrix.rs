//! Writer/Reader round trips and bounds handling.

use modelplan_buffers::{BufferError, Reader, Writer};

#[test]
fn integers_round_trip_at_limits() {
    let mut w = Writer::new();
    w.u8(u8::MAX);
    w.i8(i8::MIN);
    w.u16(u16::MAX);
    w.i16(i16::MIN);
    w.u32(u32::MAX);
    w.i32(i32::MIN);
    w.u64(u64::MAX);
    w.i64(i64::MIN);
    let data = w.flush();
    assert_eq!(data.len(), 1 + 1 + 2 + 2 + 4 + 4 + 8 + 8);

    let mut r = Reader::new(&data);
    assert_eq!(r.u8().unwrap(), u8::MAX);
    assert_eq!(r.i8().unwrap(), i8::MIN);
    assert_eq!(r.u16().unwrap(), u16::MAX);
    assert_eq!(r.i16().unwrap(), i16::MIN);
    assert_eq!(r.u32().unwrap(), u32::MAX);
    assert_eq!(r.i32().unwrap(), i32::MIN);
    assert_eq!(r.u64().unwrap(), u64::MAX);
    assert_eq!(r.i64().unwrap(), i64::MIN);
    assert_eq!(r.size(), 0);
}

#[test]
fn multi_byte_values_are_big_endian() {
    let mut w = Writer::new();
    w.u32(0x0102_0304);
    w.i16(-2);
    assert_eq!(w.flush(), vec![1, 2, 3, 4, 0xFF, 0xFE]);
}

#[test]
fn floats_round_trip() {
    let mut w = Writer::new();
    w.f32(1.5);
    w.f64(-0.1);
    w.f64(f64::INFINITY);
    let data = w.flush();
    let mut r = Reader::new(&data);
    assert_eq!(r.f32().unwrap(), 1.5);
    assert_eq!(r.f64().unwrap(), -0.1);
    assert_eq!(r.f64().unwrap(), f64::INFINITY);
}

#[test]
fn strings_and_raw_bytes() {
    let mut w = Writer::new();
    w.ascii("abc");
    w.buf("héllo".as_bytes());
    let data = w.flush();
    let mut r = Reader::new(&data);
    assert_eq!(r.ascii(3).unwrap(), "abc");
    assert_eq!(r.utf8(6).unwrap(), "héllo");
}

#[test]
fn short_reads_report_what_was_missing() {
    let data = [0u8, 1, 2];
    let mut r = Reader::new(&data);
    assert_eq!(
        r.u32(),
        Err(BufferError::EndOfBuffer {
            needed: 4,
            remaining: 3
        })
    );
    assert_eq!(r.x, 0);
    assert_eq!(r.u16().unwrap(), 1);
    assert!(r.skip(2).is_err());
    assert_eq!(r.peek().unwrap(), 2);
}

#[test]
fn from_slice_reads_a_window() {
    let data = [9u8, 0, 0, 0, 7, 9];
    let mut r = Reader::from_slice(&data, 1, 5);
    assert_eq!(r.u32().unwrap(), 7);
    assert!(r.u8().is_err());
    assert_eq!(r.x, 5);

    let clamped = Reader::from_slice(&data, 10, 100);
    assert_eq!(clamped.size(), 0);
}

#[test]
fn writer_appends_after_flush() {
    let mut w = Writer::with_capacity(2);
    w.u8(1);
    assert_eq!(w.flush(), vec![1]);
    assert!(w.is_empty());
    w.u8(2);
    assert_eq!(w.as_slice(), &[2]);
    assert_eq!(w.len(), 1);
}
