//! ASCII frame finder: `$VN<code>[,<param>]*XX\r\n` or `*XXXX\r\n` (4-hex
//! CRC-16/CCITT). Validity rules are tried in a fixed order, so the first
//! applicable rule wins even when more than one would otherwise fire (e.g.
//! a too-long unterminated sentence that also contains a second `$`).

use crate::buffer::RingBuffer;
use crate::checksum::xor8;

pub const SYNC_BYTE: u8 = b'$';
const TERMINATOR: u8 = b'\n';
const DELIM: u8 = b'*';

/// Longest ASCII sentence this parser will scan before giving up and
/// calling an unterminated sentence Invalid.
pub const MAX_SENTENCE_LEN: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindResult {
    /// A complete, checksum-valid frame of `n` bytes (including the `$` and
    /// the trailing `\n`).
    Valid(usize),
    /// Not a complete frame yet; at least `needed` bytes total are required
    /// before this can be resolved.
    Incomplete(usize),
    Invalid,
}

/// `$`..first `,` (exclusive of both), capped at 7 bytes.
pub type HeaderString = heapless_header::HeaderBytes;

mod heapless_header {
    /// A small owned copy of the header (no heap allocation): the ASCII
    /// header is bounded at 7 bytes by the packet descriptor.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HeaderBytes {
        buf: [u8; 7],
        len: u8,
    }

    impl HeaderBytes {
        pub fn from_slice(bytes: &[u8]) -> Self {
            let mut buf = [0u8; 7];
            let len = bytes.len().min(7);
            buf[..len].copy_from_slice(&bytes[..len]);
            Self { buf, len: len as u8 }
        }

        pub fn as_bytes(&self) -> &[u8] {
            &self.buf[..self.len as usize]
        }

        pub fn as_str(&self) -> &str {
            core::str::from_utf8(self.as_bytes()).unwrap_or("")
        }
    }
}

/// Scans `buffer` for an ASCII frame starting at `sync_index` (which must
/// already hold `$`). Returns `Valid(n)`, `Incomplete(k)`, or `Invalid` per
/// a fixed set of ordered rules.
pub fn find(buffer: &RingBuffer, sync_index: usize) -> FindResult {
    debug_assert_eq!(buffer.peek(sync_index), SYNC_BYTE);

    let available = buffer.size() - sync_index;
    let window = available.min(MAX_SENTENCE_LEN);

    let mut star_offset: Option<usize> = None;
    let mut terminator_offset: Option<usize> = None;

    for i in 1..window {
        let b = buffer.peek(sync_index + i);
        if b == SYNC_BYTE {
            // Rule (a): a second '$' before the terminator restarts framing there.
            return FindResult::Invalid;
        }
        if b == DELIM && star_offset.is_none() {
            star_offset = Some(i);
        }
        if b == TERMINATOR {
            if star_offset.is_some() {
                terminator_offset = Some(i);
            }
            break;
        }
    }

    let star_offset = match star_offset {
        Some(o) => o,
        None => {
            if available < MAX_SENTENCE_LEN {
                // Rule (d): haven't seen '*' yet, haven't hit the max window.
                return FindResult::Incomplete(sync_index + MAX_SENTENCE_LEN.min(available + 1));
            }
            // Rule (b): no '*' within the max-length window.
            return FindResult::Invalid;
        },
    };

    let terminator_offset = match terminator_offset {
        Some(o) => o,
        None => {
            let frame_len_guess = star_offset + 1 + 2; // '*' + at least 2 hex digits
            if available < frame_len_guess + 2 {
                return FindResult::Incomplete(sync_index + frame_len_guess + 2);
            }
            // keep scanning a bit further for the terminator before declaring invalid
            if available < MAX_SENTENCE_LEN {
                return FindResult::Incomplete(sync_index + (available + 1).min(MAX_SENTENCE_LEN));
            }
            return FindResult::Invalid;
        },
    };

    // The byte just before the terminator is usually '\r' (the wire format is
    // "...*XX\r\n"); exclude it from the checksum span when present.
    let has_cr = terminator_offset >= 1 && buffer.peek(sync_index + terminator_offset - 1) == b'\r';
    let checksum_end_offset = if has_cr { terminator_offset - 1 } else { terminator_offset };
    let checksum_len = checksum_end_offset - star_offset - 1;
    let frame_len = sync_index_to_frame_len(terminator_offset);

    let checksum_start = sync_index + star_offset + 1;
    let mut checksum_hex = [0u8; 4];
    if checksum_len != 2 && checksum_len != 4 {
        return FindResult::Invalid;
    }
    buffer.peek_range(checksum_start, checksum_len, &mut checksum_hex[..checksum_len]);

    let payload_start = sync_index + 1;
    let payload_len = star_offset - 1;
    let mut payload = [0u8; MAX_SENTENCE_LEN];
    buffer.peek_range(payload_start, payload_len, &mut payload[..payload_len]);
    let payload = &payload[..payload_len];

    let valid = if checksum_len == 2 {
        match parse_hex_byte(&checksum_hex[..2]) {
            Some(expected) => xor8(payload) == expected,
            None => false,
        }
    } else {
        match parse_hex_u16(&checksum_hex[..4]) {
            Some(expected) => crate::checksum::crc16_ccitt(payload) == expected,
            None => false,
        }
    };

    if valid {
        FindResult::Valid(frame_len)
    } else {
        FindResult::Invalid
    }
}

/// `sync_index_to_frame_len` given a terminator offset relative to the sync
/// byte: the frame spans `$`..`\n` inclusive, so length is `offset + 1`.
fn sync_index_to_frame_len(terminator_offset: usize) -> usize {
    terminator_offset + 1
}

fn parse_hex_byte(hex: &[u8]) -> Option<u8> {
    let s = core::str::from_utf8(hex).ok()?;
    u8::from_str_radix(s, 16).ok()
}

fn parse_hex_u16(hex: &[u8]) -> Option<u16> {
    let s = core::str::from_utf8(hex).ok()?;
    u16::from_str_radix(s, 16).ok()
}

/// Extracts the header (the substring between `$` and the first `,`) from a
/// complete, already-validated frame span `[sync_index, sync_index+len)`.
pub fn header_of(buffer: &RingBuffer, sync_index: usize, len: usize) -> HeaderString {
    let mut scratch = [0u8; MAX_SENTENCE_LEN];
    let n = len.min(MAX_SENTENCE_LEN);
    buffer.peek_range(sync_index, n, &mut scratch[..n]);
    let body = &scratch[1..n]; // skip leading '$'
    let comma = body.iter().position(|&b| b == b',').unwrap_or(body.len());
    HeaderString::from_slice(&body[..comma])
}

/// Payload between the first `,` after the header and the `*` delimiter,
/// exclusive of both.
pub fn payload_of(buffer: &RingBuffer, sync_index: usize, len: usize) -> Vec<u8> {
    let mut scratch = vec![0u8; len];
    buffer.peek_range(sync_index, len, &mut scratch);
    let star = scratch.iter().rposition(|&b| b == DELIM).unwrap_or(len);
    let body = &scratch[1..star];
    let comma = body.iter().position(|&b| b == b',');
    match comma {
        Some(c) => body[c + 1..].to_vec(),
        None => Vec::new(),
    }
}
