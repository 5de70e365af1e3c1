//! Command object model + outstanding-command queue.
//!
//! Outstanding commands are matched against the head of the queue by
//! response-header prefix with a `Duration` timeout. Register families are
//! modeled as a tagged variant plus one extension trait rather than
//! virtual dispatch.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::checksum::xor8;

/// Firmware processor targeted by `SBL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Processor {
    Nav = 0,
    Gnss = 1,
    Imu = 2,
}

/// The polymorphic command body. Most variants match responses by a prefix
/// of length 3-7 characters; `SetBootloader(Poll)` additionally parses the
/// processor id out of the response.
#[derive(Debug, Clone)]
pub enum CommandKind {
    ReadRegister { id: u8 },
    WriteRegister { id: u8, payload: String },
    WriteSettings,
    Reset,
    RestoreFactorySettings,
    FirmwareUpdate,
    KnownMagneticDisturbance(bool),
    KnownAccelerationDisturbance(bool),
    SetInitialHeadingScalar(f32),
    SetInitialHeadingYpr([f32; 3]),
    SetInitialHeadingQuat([f32; 4]),
    AsyncOutputEnable(bool),
    SetFilterBias,
    PollBinaryOutputMessage(u8),
    SetBootloaderProcessor(Processor),
    SetBootloaderPoll,
    Bootloader { hex_payload: String },
}

impl CommandKind {
    /// The command body (everything between `$VN` and the checksum
    /// delimiter `*`), e.g. `"RRG,01"`, `"SBL,0"`, `"KMD,1"`.
    pub fn body(&self) -> String {
        match self {
            CommandKind::ReadRegister { id } => format!("RRG,{id:02}"),
            CommandKind::WriteRegister { id, payload } => format!("WRG,{id:02},{payload}"),
            CommandKind::WriteSettings => "WNV".to_string(),
            CommandKind::Reset => "RST".to_string(),
            CommandKind::RestoreFactorySettings => "RFS".to_string(),
            CommandKind::FirmwareUpdate => "FWU".to_string(),
            CommandKind::KnownMagneticDisturbance(present) => format!("KMD,{}", *present as u8),
            CommandKind::KnownAccelerationDisturbance(present) => format!("KAD,{}", *present as u8),
            CommandKind::SetInitialHeadingScalar(heading) => format!("SIH,{heading:+08.3}"),
            CommandKind::SetInitialHeadingYpr(ypr) => {
                format!("SIH,{:+08.3},{:+08.3},{:+08.3}", ypr[0], ypr[1], ypr[2])
            },
            CommandKind::SetInitialHeadingQuat(q) => {
                format!("SIH,{:+08.3},{:+08.3},{:+08.3},{:+08.3}", q[0], q[1], q[2], q[3])
            },
            CommandKind::AsyncOutputEnable(enable) => format!("ASY,{}", *enable as u8),
            CommandKind::SetFilterBias => "SFB".to_string(),
            CommandKind::PollBinaryOutputMessage(num) => format!("BOM,{num:02}"),
            CommandKind::SetBootloaderProcessor(p) => format!("SBL,{}", *p as u8),
            CommandKind::SetBootloaderPoll => "SBL,?".to_string(),
            CommandKind::Bootloader { hex_payload } => format!("BLD,{hex_payload}"),
        }
    }

    /// The response header this command expects, e.g. `"VNRRG"`, `"VNSBL"`.
    /// Bounded at 3-7 characters.
    fn expected_response_header(&self) -> &'static str {
        match self {
            CommandKind::ReadRegister { .. } => "VNRRG",
            CommandKind::WriteRegister { .. } => "VNWRG",
            CommandKind::WriteSettings => "VNWNV",
            CommandKind::Reset => "VNRST",
            CommandKind::RestoreFactorySettings => "VNRFS",
            CommandKind::FirmwareUpdate => "VNFWU",
            CommandKind::KnownMagneticDisturbance(_) => "VNKMD",
            CommandKind::KnownAccelerationDisturbance(_) => "VNKAD",
            CommandKind::SetInitialHeadingScalar(_)
            | CommandKind::SetInitialHeadingYpr(_)
            | CommandKind::SetInitialHeadingQuat(_) => "VNSIH",
            CommandKind::AsyncOutputEnable(_) => "VNASY",
            CommandKind::SetFilterBias => "VNSFB",
            CommandKind::PollBinaryOutputMessage(_) => "VNBOM",
            CommandKind::SetBootloaderProcessor(_) | CommandKind::SetBootloaderPoll => "VNSBL",
            CommandKind::Bootloader { .. } => "VNBLD",
        }
    }
}

/// One outstanding command. Invariant: in exactly one of
/// {unsent, outstanding, matched, stale}; transitions are serialized by the
/// owning `CommandQueue`'s mutex.
#[derive(Debug, Clone)]
pub struct Command {
    pub kind: CommandKind,
    pub awaiting_response: bool,
    pub response_matched: bool,
    pub sent_time: Option<Instant>,
    pub response_time: Option<Instant>,
    pub removal_timeout: Duration,
    /// The raw response payload, once matched.
    pub response_payload: Option<String>,
    /// Populated only for `SetBootloaderPoll`: the processor id parsed out
    /// of the response.
    pub polled_processor: Option<u8>,
}

impl Command {
    pub fn new(kind: CommandKind, removal_timeout: Duration) -> Self {
        Self {
            kind,
            awaiting_response: false,
            response_matched: false,
            sent_time: None,
            response_time: None,
            removal_timeout,
            response_payload: None,
            polled_processor: None,
        }
    }

    /// Formats the wire message: `$VN<body>*XX\r\n` with an 8-bit XOR
    /// checksum over the bytes between `$` and `*`.
    pub fn format_message(&self) -> String {
        let body = self.kind.body();
        let unchecksummed = format!("VN{body}");
        let cksum = xor8(unchecksummed.as_bytes());
        format!("${unchecksummed}*{cksum:02X}\r\n")
    }

    /// `true` if `header` (the frame's ASCII header, e.g. `"VNRRG"`) and
    /// `payload` match this command's expected response.
    pub fn response_matches(&self, header: &str, payload: &str) -> bool {
        if header == "VNERR" {
            // An error response always matches the head of the queue
            // unconditionally.
            return true;
        }
        if header != self.kind.expected_response_header() {
            return false;
        }
        match self.kind {
            CommandKind::ReadRegister { id } | CommandKind::WriteRegister { id, .. } => {
                payload_register_id(payload) == Some(id)
            },
            _ => true,
        }
    }

    /// Applies a matched response: for `SetBootloaderPoll`, parses the
    /// processor id out of the payload.
    fn apply_response(&mut self, header: &str, payload: &str, now: Instant) {
        self.response_payload = Some(payload.to_string());
        self.response_time = Some(now);
        self.response_matched = header != "VNERR";
        self.awaiting_response = false;
        if matches!(self.kind, CommandKind::SetBootloaderPoll) && header != "VNERR" {
            self.polled_processor = payload.split(',').next().and_then(|s| s.trim().parse::<u8>().ok());
        }
    }
}

fn payload_register_id(payload: &str) -> Option<u8> {
    payload.split(',').next()?.trim().parse::<u8>().ok()
}

/// Result of [`CommandQueue::register`].
pub enum RegisterOutcome {
    /// Enqueued; here is the formatted message to send.
    Enqueued(String),
    QueueFull,
    /// The identical command (by pointer) was already at the queue's tail.
    Resent,
}

/// A bounded, mutex-serialized FIFO of outstanding commands.
pub struct CommandQueue {
    inner: Mutex<VecDeque<Command>>,
    capacity: usize,
}

impl CommandQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { inner: Mutex::new(VecDeque::with_capacity(capacity)), capacity }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Formats `cmd`, and enqueues it with `sent_time = now`,
    /// `awaiting_response = true`, unless the queue is full or an
    /// identical command (by body) is already at the tail.
    pub fn register(&self, mut cmd: Command, now: Instant) -> RegisterOutcome {
        let mut queue = self.inner.lock().unwrap();
        let message = cmd.format_message();
        if let Some(tail) = queue.back() {
            if tail.kind.body() == cmd.kind.body() && tail.awaiting_response {
                log::debug!("command {:?} already outstanding at queue tail, not resending", cmd.kind);
                return RegisterOutcome::Resent;
            }
        }
        if queue.len() >= self.capacity {
            log::warn!("outstanding-command queue is full, rejecting {:?}", cmd.kind);
            return RegisterOutcome::QueueFull;
        }
        cmd.sent_time = Some(now);
        cmd.awaiting_response = true;
        queue.push_back(cmd);
        RegisterOutcome::Enqueued(message)
    }

    /// Walks the queue head to tail; the first command whose
    /// `response_matches` returns true is popped and returned with its
    /// response applied.
    pub fn match_response(&self, header: &str, payload: &str, now: Instant) -> Option<Command> {
        let mut queue = self.inner.lock().unwrap();
        let pos = queue.iter().position(|c| c.response_matches(header, payload))?;
        let mut cmd = queue.remove(pos)?;
        cmd.apply_response(header, payload, now);
        Some(cmd)
    }

    /// Pops every command whose `now - sent_time > removal_timeout`,
    /// returning them (each reported by the caller as
    /// `AsyncError::CommandRemovedFromQueue`).
    pub fn remove_stale(&self, now: Instant) -> Vec<Command> {
        let mut queue = self.inner.lock().unwrap();
        let mut removed = Vec::new();
        let mut i = 0;
        while i < queue.len() {
            let stale = match queue[i].sent_time {
                Some(sent) => now.saturating_duration_since(sent) > queue[i].removal_timeout,
                None => false,
            };
            if stale {
                let mut cmd = queue.remove(i).unwrap();
                log::warn!("command {:?} timed out after {:?}, removing from queue", cmd.kind, cmd.removal_timeout);
                cmd.response_matched = false;
                cmd.awaiting_response = false;
                removed.push(cmd);
            } else {
                i += 1;
            }
        }
        removed
    }

    /// Removes and returns the most recently enqueued command matching
    /// `predicate`, used when a blocking send times out and must pull its
    /// own command back out before returning `ResponseTimeout`.
    pub fn remove_by_body(&self, body: &str) -> Option<Command> {
        let mut queue = self.inner.lock().unwrap();
        let pos = queue.iter().rposition(|c| c.kind.body() == body)?;
        queue.remove(pos)
    }
}
