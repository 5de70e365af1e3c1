//! Property-based coverage for frame-finder totality: for any buffer
//! contents, `find` returns exactly one of `Valid(n)`,
//! `Incomplete(k>current_size)`, or `Invalid`; `Valid(n)` implies
//! `n <= current_size` and the checksum verifies.

use proptest::prelude::*;
use vnsdk::{ascii, binary_fa, AsciiFindResult, RingBuffer};

fn buffer_with(bytes: &[u8]) -> RingBuffer {
    let mut rb = RingBuffer::with_capacity(bytes.len().max(1) + 16);
    rb.put(bytes).unwrap();
    rb
}

/// Local re-implementation of the two checksums, independent of
/// `vnsdk::checksum` (private to the crate), so these tests exercise the
/// wire format from the outside exactly as a real sensor would compute it.
fn xor8(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc ^ b)
}

fn crc16_ccitt(bytes: &[u8]) -> u16 {
    use crc::{Crc, CRC_16_XMODEM};
    const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);
    CRC16.checksum(bytes)
}

proptest! {
    /// `ascii::find` never panics on arbitrary bytes following a `$`, and
    /// whenever it claims `Valid(n)`, `n` never exceeds what the buffer
    /// actually holds.
    #[test]
    fn ascii_find_never_overruns_on_arbitrary_bytes(tail in prop::collection::vec(any::<u8>(), 0..300)) {
        let mut bytes = vec![b'$'];
        bytes.extend_from_slice(&tail);
        let rb = buffer_with(&bytes);
        match ascii::find(&rb, 0) {
            AsciiFindResult::Valid(n) => prop_assert!(n <= rb.size()),
            AsciiFindResult::Incomplete(needed) => prop_assert!(needed > rb.size()),
            AsciiFindResult::Invalid => {},
        }
    }

    /// `binary_fa::find` never panics on arbitrary bytes following `0xFA`,
    /// and `Valid(n)` never exceeds the buffer's size.
    #[test]
    fn binary_fa_find_never_overruns_on_arbitrary_bytes(tail in prop::collection::vec(any::<u8>(), 0..300)) {
        let mut bytes = vec![binary_fa::SYNC_BYTE];
        bytes.extend_from_slice(&tail);
        let rb = buffer_with(&bytes);
        match binary_fa::find(&rb, 0) {
            binary_fa::FindResult::Valid(n) => prop_assert!(n <= rb.size()),
            binary_fa::FindResult::Incomplete(needed) => prop_assert!(needed > rb.size()),
            binary_fa::FindResult::Invalid => {},
        }
    }

    /// A well-formed `$VNxxx,<payload>*XX\r\n` frame built with the correct
    /// XOR checksum is always found `Valid` for any payload drawn from
    /// bytes that cannot themselves be mistaken for framing characters.
    #[test]
    fn well_formed_ascii_frame_with_correct_checksum_is_always_valid(
        payload in "[a-zA-Z0-9+.,-]{0,64}"
    ) {
        let body = format!("VNYPR,{payload}");
        let crc = xor8(body.as_bytes());
        let frame = format!("${body}*{crc:02X}\r\n");
        let rb = buffer_with(frame.as_bytes());
        match ascii::find(&rb, 0) {
            AsciiFindResult::Valid(n) => prop_assert_eq!(n, frame.len()),
            other => prop_assert!(false, "expected Valid({}), got {:?}", frame.len(), other),
        }
    }

    /// Binary-FA round trip: encoding a fabricated frame with the Time
    /// group's `timeStartup` field populated decodes back to the same
    /// value.
    #[test]
    fn binary_fa_time_group_round_trips(value in any::<u64>()) {
        let group_mask = 0b0000_0001u8;
        let field_mask = 0b1u16;
        let mut frame = vec![binary_fa::SYNC_BYTE, group_mask];
        frame.extend_from_slice(&field_mask.to_le_bytes());
        frame.extend_from_slice(&value.to_le_bytes());
        let crc = crc16_ccitt(&frame[1..]);
        frame.extend_from_slice(&crc.to_le_bytes());

        let rb = buffer_with(&frame);
        let (n, measurement) = binary_fa::find_and_decode(&rb, 0).expect("a well-formed frame decodes");
        prop_assert_eq!(n, frame.len());
        prop_assert_eq!(measurement.time.time_startup_ns, Some(value));
    }
}
