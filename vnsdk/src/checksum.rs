//! ASCII frames carry either an 8-bit XOR checksum or a 4-hex CRC-16/CCITT;
//! Binary-FA frames always carry a trailing CRC-16/CCITT.

use crc::{Crc, CRC_16_XMODEM};

// poly 0x1021, init 0x0000, no reflection, no xorout. The `crc` crate
// catalogs this parameter set as CRC_16_XMODEM; CRC_16_CCITT_FALSE is the
// same polynomial with init 0xffff, which VectorNav does not use.
const CRC16_CCITT: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// 8-bit XOR checksum over the bytes between `$` and `*`, exclusive of both.
#[derive(Default)]
pub struct Xor8Calc {
    acc: u8,
}

impl Xor8Calc {
    pub const fn new() -> Self {
        Self { acc: 0 }
    }

    pub fn update(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.acc ^= b;
        }
    }

    pub fn result(&self) -> u8 {
        self.acc
    }
}

pub fn xor8(bytes: &[u8]) -> u8 {
    let mut calc = Xor8Calc::new();
    calc.update(bytes);
    calc.result()
}

/// CRC-16/CCITT (poly 0x1021, init 0x0000) over a byte span. A correct frame,
/// when the CRC itself is included in the span, computes to zero.
pub fn crc16_ccitt(bytes: &[u8]) -> u16 {
    CRC16_CCITT.checksum(bytes)
}

/// `true` if appending `crc_le` (little-endian) to `bytes` and recomputing
/// the CRC over the whole span yields zero.
pub fn crc16_ccitt_frame_is_valid(bytes: &[u8], crc_le: u16) -> bool {
    let mut digest = CRC16_CCITT.digest();
    digest.update(bytes);
    digest.update(&crc_le.to_le_bytes());
    digest.finalize() == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xor8_of_empty_is_zero() {
        assert_eq!(xor8(&[]), 0);
    }

    #[test]
    fn xor8_matches_manual_fold() {
        let bytes = b"VNYPR,+010.000,+002.500,-001.250";
        let mut acc = 0u8;
        for &b in bytes {
            acc ^= b;
        }
        assert_eq!(xor8(bytes), acc);
    }

    #[test]
    fn crc16_round_trip_sums_to_zero() {
        let payload = b"hello vectornav";
        let crc = crc16_ccitt(payload);
        assert!(crc16_ccitt_frame_is_valid(payload, crc));
    }

    #[test]
    fn crc16_detects_corruption() {
        let payload = b"hello vectornav";
        let crc = crc16_ccitt(payload);
        assert!(!crc16_ccitt_frame_is_valid(b"hello vectornaw", crc));
    }
}
