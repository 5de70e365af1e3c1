//! Packet synchronizer: scans the ring buffer for any registered
//! dispatcher's sync byte, asks that dispatcher to locate a frame, and
//! reports one of three outcomes per tick. Three independent wire formats
//! (`$`, `0xFA`, `0xFB`) are arbitrated byte-by-byte, lowest matching
//! offset wins.

use crate::ascii;
use crate::binary_fa;
use crate::binary_fb;
use crate::buffer::RingBuffer;

/// Which wire format matched at a given offset, and the frame's length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Ascii,
    BinaryFa,
    BinaryFb,
}

/// One tick's outcome. `skip_overflowed` is `true` when this tick's call to
/// `discard_skipped` had to truncate what it mirrored into the skipped-byte
/// observer because `skip_capacity` was reached; the bytes are still
/// discarded from `buffer` either way (this crate never re-processes a
/// byte), but the caller must surface the truncation as
/// `AsyncError::SkippedByteBufferFull` rather than let it pass silently.
pub enum SyncOutcome {
    /// A complete frame was found at offset 0 (after any bytes already
    /// discarded this tick); `len` bytes should be consumed by the caller
    /// once it has finished reading the span.
    Dispatched { kind: FrameKind, len: usize, skip_overflowed: bool },
    /// The scan reached the end of the buffer (or an in-progress frame)
    /// without completing one; no bytes were consumed.
    NeedMoreData { skip_overflowed: bool },
}

/// Scans `buffer` from its head forward. On `Dispatched`, the frame
/// still sits at the head of `buffer` (offset 0) for the caller to decode
/// before discarding; any bytes skipped ahead of it have already been
/// discarded and are returned via `skip_sink`.
pub fn dispatch_next_packet(buffer: &mut RingBuffer, skip_sink: &mut Vec<u8>, skip_capacity: usize) -> SyncOutcome {
    let mut offset = 0usize;

    loop {
        if offset >= buffer.size() {
            let skip_overflowed = discard_skipped(buffer, offset, skip_sink, skip_capacity);
            return SyncOutcome::NeedMoreData { skip_overflowed };
        }

        let byte = buffer.peek(offset);
        let found = match byte {
            ascii::SYNC_BYTE => Some((FrameKind::Ascii, ascii_find(buffer, offset))),
            binary_fa::SYNC_BYTE => Some((FrameKind::BinaryFa, binary_fa_find(buffer, offset))),
            binary_fb::SYNC_BYTE => Some((FrameKind::BinaryFb, binary_fb_find(buffer, offset))),
            _ => None,
        };

        let Some((kind, outcome)) = found else {
            offset += 1;
            continue;
        };

        match outcome {
            Tick::Valid(len) => {
                let skip_overflowed = discard_skipped(buffer, offset, skip_sink, skip_capacity);
                return SyncOutcome::Dispatched { kind, len, skip_overflowed };
            },
            Tick::Incomplete(needed) => {
                if buffer.size() < needed {
                    let skip_overflowed = discard_skipped(buffer, offset, skip_sink, skip_capacity);
                    return SyncOutcome::NeedMoreData { skip_overflowed };
                }
                // Enough bytes total but the candidate still didn't
                // resolve: treat this sync byte as invalid and continue
                // scanning past it.
                offset += 1;
            },
            Tick::Invalid => {
                offset += 1;
            },
        }
    }
}

enum Tick {
    Valid(usize),
    Incomplete(usize),
    Invalid,
}

fn ascii_find(buffer: &RingBuffer, offset: usize) -> Tick {
    match ascii::find(buffer, offset) {
        ascii::FindResult::Valid(n) => Tick::Valid(n),
        ascii::FindResult::Incomplete(needed) => Tick::Incomplete(needed),
        ascii::FindResult::Invalid => Tick::Invalid,
    }
}

fn binary_fa_find(buffer: &RingBuffer, offset: usize) -> Tick {
    match binary_fa::find(buffer, offset) {
        binary_fa::FindResult::Valid(n) => Tick::Valid(n),
        binary_fa::FindResult::Incomplete(needed) => Tick::Incomplete(needed),
        binary_fa::FindResult::Invalid => Tick::Invalid,
    }
}

fn binary_fb_find(buffer: &RingBuffer, offset: usize) -> Tick {
    match binary_fb::find(buffer, offset) {
        binary_fb::FindResult::Valid(n) => Tick::Valid(n),
        binary_fb::FindResult::Incomplete(needed) => Tick::Incomplete(needed),
        binary_fb::FindResult::Invalid => Tick::Invalid,
    }
}

/// Discards the `skip_len` bytes preceding the current offset (bytes that
/// were scanned past without yielding a valid frame), mirroring them into
/// `skip_sink` up to `skip_capacity`; beyond that, the bytes are still
/// discarded from `buffer` (they are accounted for, never reprocessed) but
/// `true` is returned so the caller can report the truncation rather than
/// let it pass silently.
fn discard_skipped(buffer: &mut RingBuffer, skip_len: usize, skip_sink: &mut Vec<u8>, skip_capacity: usize) -> bool {
    if skip_len == 0 {
        return false;
    }
    let mut overflowed = false;
    for i in 0..skip_len {
        if skip_sink.len() >= skip_capacity {
            overflowed = true;
            break;
        }
        skip_sink.push(buffer.peek(i));
    }
    buffer.discard(skip_len);
    overflowed
}
