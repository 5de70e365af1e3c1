//! Binary-FB: a fragmented variant of FA for payloads larger than one
//! transmission unit. Fragments carry `(frame_index, total_frames)`; the
//! dispatcher owns one reassembly buffer, accepts fragments in strictly
//! increasing `frame_index` starting at 0, and on the final fragment
//! forwards the reassembled payload to the FA dispatcher as though it had
//! arrived whole. Any gap, duplicate, or out-of-order fragment discards the
//! partial assembly and emits an asynchronous error.

use crate::buffer::RingBuffer;
use crate::error::AsyncError;

pub const SYNC_BYTE: u8 = 0xFB;

/// Binary-FB header: 1 byte frame_index, 1 byte total_frames, 2 bytes LE
/// payload_length, matching the `{ frame_index, total_frames, payload_length }`
/// packet descriptor.
const HEADER_LEN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindResult {
    Valid(usize),
    Incomplete(usize),
    Invalid,
}

#[derive(Debug, Clone, Copy)]
pub struct FragmentHeader {
    pub frame_index: u8,
    pub total_frames: u8,
    pub payload_len: u16,
}

/// Decodes just the header fields at `sync_index`, for a caller that has
/// already confirmed (via `find`) that a complete fragment sits there and
/// now needs `frame_index`/`total_frames`/`payload_len` to slice the
/// payload out for the reassembler.
pub fn header_fields(buffer: &RingBuffer, sync_index: usize) -> FragmentHeader {
    decode_header(buffer, sync_index).expect("find() validated the header already")
}

fn decode_header(buffer: &RingBuffer, sync_index: usize) -> Option<FragmentHeader> {
    if buffer.size() - sync_index < HEADER_LEN {
        return None;
    }
    Some(FragmentHeader {
        frame_index: buffer.peek(sync_index + 1),
        total_frames: buffer.peek(sync_index + 2),
        payload_len: u16::from_le_bytes([buffer.peek(sync_index + 3), buffer.peek(sync_index + 4)]),
    })
}

pub fn find(buffer: &RingBuffer, sync_index: usize) -> FindResult {
    debug_assert_eq!(buffer.peek(sync_index), SYNC_BYTE);
    let header = match decode_header(buffer, sync_index) {
        Some(h) => h,
        None => return FindResult::Incomplete(sync_index + HEADER_LEN),
    };
    let total_len = HEADER_LEN + header.payload_len as usize;
    if buffer.size() - sync_index < total_len {
        return FindResult::Incomplete(sync_index + total_len);
    }
    FindResult::Valid(total_len)
}

/// Owns the single reassembly buffer for one Binary-FB stream.
pub struct FbReassembler {
    capacity: usize,
    buf: Vec<u8>,
    next_expected_index: u8,
    total_frames: Option<u8>,
}

pub enum ReassembleOutcome {
    /// Fragment accepted, assembly still in progress.
    InProgress,
    /// Final fragment accepted; the full payload is ready.
    Complete(Vec<u8>),
    /// Gap, duplicate, or out-of-order fragment: assembly discarded.
    Discarded(AsyncError),
}

impl FbReassembler {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { capacity, buf: Vec::new(), next_expected_index: 0, total_frames: None }
    }

    fn reset(&mut self) {
        self.buf.clear();
        self.next_expected_index = 0;
        self.total_frames = None;
    }

    /// Feeds one validated fragment's payload bytes (span already framed and
    /// checksum-agnostic — Binary-FB carries no checksum of its own beyond
    /// its header fields).
    pub fn accept(&mut self, frame_index: u8, total_frames: u8, payload: &[u8]) -> ReassembleOutcome {
        if let Some(tf) = self.total_frames {
            if tf != total_frames {
                log::warn!("Binary-FB: total_frames changed mid-assembly ({tf} -> {total_frames}), discarding");
                self.reset();
                return ReassembleOutcome::Discarded(AsyncError::ReceivedByteBufferFull);
            }
        } else {
            self.total_frames = Some(total_frames);
        }

        if frame_index != self.next_expected_index {
            log::warn!(
                "Binary-FB: expected fragment {}, got {frame_index}, discarding partial assembly",
                self.next_expected_index
            );
            self.reset();
            return ReassembleOutcome::Discarded(AsyncError::ReceivedByteBufferFull);
        }

        if self.buf.len() + payload.len() > self.capacity {
            log::warn!("Binary-FB: reassembly buffer capacity {} exceeded, discarding", self.capacity);
            self.reset();
            return ReassembleOutcome::Discarded(AsyncError::PrimaryBufferFull);
        }

        self.buf.extend_from_slice(payload);
        self.next_expected_index += 1;

        if self.next_expected_index == total_frames {
            let complete = std::mem::take(&mut self.buf);
            self.reset();
            ReassembleOutcome::Complete(complete)
        } else {
            ReassembleOutcome::InProgress
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_with(bytes: &[u8]) -> RingBuffer {
        let mut rb = RingBuffer::with_capacity(bytes.len() + 16);
        rb.put(bytes).unwrap();
        rb
    }

    fn frame(frame_index: u8, total_frames: u8, payload: &[u8]) -> Vec<u8> {
        let mut f = vec![SYNC_BYTE, frame_index, total_frames];
        f.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        f.extend_from_slice(payload);
        f
    }

    #[test]
    fn finds_a_complete_fragment() {
        let f = frame(0, 2, b"hello");
        let rb = buffer_with(&f);
        assert_eq!(find(&rb, 0), FindResult::Valid(f.len()));
    }

    #[test]
    fn reassembles_in_order_fragments() {
        let mut r = FbReassembler::with_capacity(64);
        assert!(matches!(r.accept(0, 2, b"hello "), ReassembleOutcome::InProgress));
        match r.accept(1, 2, b"world") {
            ReassembleOutcome::Complete(payload) => assert_eq!(payload, b"hello world"),
            _ => panic!("expected Complete"),
        }
    }

    #[test]
    fn gap_discards_assembly() {
        let mut r = FbReassembler::with_capacity(64);
        r.accept(0, 3, b"a");
        match r.accept(2, 3, b"c") {
            ReassembleOutcome::Discarded(_) => {},
            _ => panic!("expected Discarded"),
        }
        // next fragment must restart at 0
        assert!(matches!(r.accept(0, 3, b"a"), ReassembleOutcome::InProgress));
    }

    #[test]
    fn duplicate_discards_assembly() {
        let mut r = FbReassembler::with_capacity(64);
        r.accept(0, 2, b"a");
        match r.accept(0, 2, b"a") {
            ReassembleOutcome::Discarded(_) => {},
            _ => panic!("expected Discarded"),
        }
    }
}
