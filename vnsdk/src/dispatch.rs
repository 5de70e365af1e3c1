//! ASCII/Binary-FA/Binary-FB dispatch and subscriber fan-out. Routes on
//! VectorNav's header-prefix convention (`VNxxx` measurement vs.
//! command-response headers).

use crate::ascii;
use crate::binary_fa;
use crate::binary_fb::{FbReassembler, ReassembleOutcome};
use crate::buffer::RingBuffer;
use crate::command::{Command, CommandQueue};
use crate::error::{AsyncError, VnErrCode};
use crate::measurement::CompositeMeasurement;
use crate::queue::BoundedQueue;
use crate::subscription::Subscription;
use std::time::Instant;

/// Command-response headers: everything else beginning `VN` followed by
/// 3+ capitals is treated as a measurement header.
const RESPONSE_HEADERS: &[&str] = &["VNRRG", "VNWRG", "VNERR", "VNWNV", "VNRST", "VNRFS", "VNFWU",
    "VNKMD", "VNKAD", "VNSIH", "VNASY", "VNSFB", "VNBOM", "VNSBL", "VNBLD"];

fn is_response_header(header: &str) -> bool {
    RESPONSE_HEADERS.contains(&header)
}

/// Parses the handful of ASCII measurement headers this crate recognizes
/// (`VNYPR`, `VNINS`, `VNIMU`, ...) into a composite measurement.
/// Unrecognized measurement-shaped headers are dropped rather than treated
/// as an error, since VectorNav's full ASCII output-register catalogue is
/// larger than what this crate models.
fn parse_ascii_measurement(header: &str, payload: &[u8]) -> Option<CompositeMeasurement> {
    let payload = core::str::from_utf8(payload).ok()?;
    let fields: Vec<&str> = payload.split(',').collect();
    let mut m = CompositeMeasurement::new();
    match header {
        "VNYPR" => {
            let ypr = parse_f32_triplet(&fields)?;
            m.attitude.ypr = Some(ypr);
        },
        "VNQTN" => {
            if fields.len() < 4 {
                return None;
            }
            let q = [
                fields[0].trim().parse().ok()?,
                fields[1].trim().parse().ok()?,
                fields[2].trim().parse().ok()?,
                fields[3].trim().parse().ok()?,
            ];
            m.attitude.quaternion = Some(q);
        },
        "VNIMU" => {
            if fields.len() < 6 {
                return None;
            }
            m.imu.uncomp_mag = Some(parse_f32_triplet(&fields[0..3])?);
            m.imu.uncomp_accel = Some(parse_f32_triplet(&fields[3..6])?);
        },
        "VNINS" => {
            if fields.len() < 4 {
                return None;
            }
            m.ins.ins_status = Some(u16::from_str_radix(fields[0].trim().trim_start_matches("0x"), 16).ok()?);
            m.ins.pos_lla = Some([
                fields[1].trim().parse().ok()?,
                fields[2].trim().parse().ok()?,
                fields[3].trim().parse().ok()?,
            ]);
        },
        _ => return None,
    }
    Some(m)
}

/// Decodes a `VNERR` payload's decimal code and maps it to its
/// sensor-reported asynchronous counterpart, if it is one of the four
/// codes (1 HardFault, 10 WatchdogReset, 11 OutputBufferOverflow, 255
/// ErrorBufferOverflow) the sensor reports asynchronously rather than
/// paired with a command.
fn vn_err_as_async(payload: &str) -> Option<AsyncError> {
    let code = payload.trim().parse::<u16>().ok()?;
    VnErrCode::from_decimal(code)?.as_async_error()
}

fn parse_f32_triplet(fields: &[&str]) -> Option<[f32; 3]> {
    if fields.len() < 3 {
        return None;
    }
    Some([fields[0].trim().parse().ok()?, fields[1].trim().parse().ok()?, fields[2].trim().parse().ok()?])
}

/// Approximates a Binary-FA group mask from which categories a composite
/// measurement populated, for matching `Filter::Binary` subscriptions
/// against frames that did not arrive with an explicit group byte in
/// scope (i.e. ones reassembled from Binary-FB or parsed from ASCII).
/// Bit positions mirror `binary_fa::fields::ALL_GROUPS`'s order.
fn measurement_group_mask(m: &CompositeMeasurement) -> u8 {
    use crate::measurement::{AttitudeFields, GnssFields, Gnss2Fields, ImuFields, InsFields, TimeFields};
    let mut mask = 0u8;
    if m.time != TimeFields::default() {
        mask |= 1 << 0;
    }
    if m.imu != ImuFields::default() {
        mask |= 1 << 1;
    }
    if m.attitude != AttitudeFields::default() {
        mask |= 1 << 2;
    }
    if m.ins != InsFields::default() {
        mask |= 1 << 3;
    }
    if m.gnss != GnssFields::default() {
        mask |= 1 << 4;
    }
    if m.gnss2 != Gnss2Fields::default() {
        mask |= 1 << 5;
    }
    mask
}

/// Owns the outputs of dispatch: the main measurement queue, the
/// outstanding-command queue, subscriber lists, the Binary-FB
/// reassembler, and the async-error sink. One instance per connected
/// sensor.
pub struct Dispatch {
    pub measurements: BoundedQueue<CompositeMeasurement>,
    pub commands: CommandQueue,
    pub async_errors: BoundedQueue<AsyncError>,
    pub measurement_subscribers: Vec<Subscription<CompositeMeasurement>>,
    /// Subscribers attached to the ASCII dispatcher's command-response
    /// side (`VNRRG`/`VNWRG`/`VNERR`/...); each receives a `"HEADER,payload"`
    /// copy of every response frame whose header matches its filter. These
    /// are independent of `measurement_subscribers` per spec.md §2/§4.4,
    /// which lets a subscription attach to either dispatcher.
    pub response_subscribers: Vec<Subscription<String>>,
    /// Commands popped off `commands` once a response matched (or, via
    /// `CommandQueue::remove_stale`, once one timed out); the sensor
    /// façade polls this to resolve blocking `send_command` calls.
    pub matched_responses: BoundedQueue<Command>,
    fb_reassembler: FbReassembler,
}

impl Dispatch {
    pub fn new(measurement_capacity: usize, command_capacity: usize, async_error_capacity: usize, fb_capacity: usize) -> Self {
        Self {
            measurements: BoundedQueue::with_capacity(measurement_capacity),
            commands: CommandQueue::with_capacity(command_capacity),
            async_errors: BoundedQueue::with_capacity(async_error_capacity),
            measurement_subscribers: Vec::new(),
            response_subscribers: Vec::new(),
            matched_responses: BoundedQueue::with_capacity(command_capacity),
            fb_reassembler: FbReassembler::with_capacity(fb_capacity),
        }
    }

    /// Total number of standing subscriptions across both dispatchers,
    /// checked against `SensorConfig::subscriber_queue_capacity` by the
    /// sensor façade before a new one is admitted.
    pub fn subscriber_count(&self) -> usize {
        self.measurement_subscribers.len() + self.response_subscribers.len()
    }

    /// `ascii_header` is `Some(header)` for frames that arrived over the
    /// ASCII path (so `Filter::AsciiHeader` subscriptions can match) and
    /// `None` for Binary-FA/FB frames (matched instead by `Filter::Binary`
    /// against the measurement's populated categories).
    fn publish_measurement(&mut self, m: CompositeMeasurement, ascii_header: Option<&str>) {
        if !self.measurements.push(m) {
            self.report_async(AsyncError::MeasurementQueueFull);
        }
        let group_mask = measurement_group_mask(&m);
        for sub in &self.measurement_subscribers {
            let keep = match (&sub.filter, ascii_header) {
                (crate::subscription::Filter::Any, _) => true,
                (crate::subscription::Filter::AsciiHeader(_), Some(header)) => sub.matches_ascii_header(header),
                (crate::subscription::Filter::AsciiHeader(_), None) => false,
                (crate::subscription::Filter::Binary(_), _) => sub.matches_binary(group_mask),
            };
            if keep {
                let _ = sub.queue.push(m);
            }
        }
    }

    /// Fans a command-response frame's `"HEADER,payload"` text out to every
    /// `response_subscribers` entry whose filter matches `header`. Unlike
    /// `publish_measurement`, there is no main-queue side to this: a response
    /// frame's only path to the caller that issued the command is
    /// `matched_responses`; subscribers here only ever get a copy.
    fn publish_response(&mut self, header: &str, payload: &str) {
        if self.response_subscribers.is_empty() {
            return;
        }
        let text = format!("{header},{payload}");
        for sub in &self.response_subscribers {
            let keep = match &sub.filter {
                crate::subscription::Filter::Any => true,
                crate::subscription::Filter::AsciiHeader(_) => sub.matches_ascii_header(header),
                crate::subscription::Filter::Binary(_) => false,
            };
            if keep {
                let _ = sub.queue.push(text.clone());
            }
        }
    }

    fn report_async(&mut self, err: AsyncError) {
        log::warn!("async error: {err}");
        if !self.async_errors.push(err) {
            // The async-error queue itself is full; `err` is dropped, but
            // that drop is itself recorded as a distinct kind rather than
            // silently discarded. A second push failure here (the queue is
            // still full) is the end of the line: there is nothing further
            // to report to.
            log::error!("async-error queue overflowed, dropping: {err}");
            if !self.async_errors.push(AsyncError::AsyncQueueOverflow) {
                log::error!("async-error queue overflowed again while reporting its own overflow");
            }
        }
    }

    /// Handles one complete ASCII frame already validated by `ascii::find`.
    pub fn dispatch_ascii(&mut self, buffer: &RingBuffer, offset: usize, len: usize, now: Instant) {
        let header = ascii::header_of(buffer, offset, len);
        let header_str = header.as_str();
        let payload = ascii::payload_of(buffer, offset, len);

        if is_response_header(header_str) {
            let payload_str = core::str::from_utf8(&payload).unwrap_or("");
            self.publish_response(header_str, payload_str);
            match self.commands.match_response(header_str, payload_str, now) {
                Some(cmd) => {
                    log::debug!("matched response {header_str} against an outstanding command");
                    if !self.matched_responses.push(cmd) {
                        self.report_async(AsyncError::CommandRemovedFromQueue);
                    }
                },
                // No outstanding command to pair this with. A `VNERR` here
                // can still carry one of the four sensor-reported
                // asynchronous codes, which must reach the async-error
                // queue even though nothing is waiting on it.
                None if header_str == "VNERR" => {
                    if let Some(async_err) = vn_err_as_async(payload_str) {
                        self.report_async(async_err);
                    }
                },
                None => {},
            }
            return;
        }

        if let Some(m) = parse_ascii_measurement(header_str, &payload) {
            self.publish_measurement(m, Some(header_str));
        }
    }

    /// Handles one complete Binary-FA frame.
    pub fn dispatch_binary_fa(&mut self, buffer: &RingBuffer, offset: usize, _len: usize) {
        if let Ok((_n, measurement)) = binary_fa::find_and_decode(buffer, offset) {
            self.publish_measurement(measurement, None);
        }
    }

    /// Sweeps timed-out commands off the outstanding queue, reporting
    /// each as `CommandRemovedFromQueue` and handing it to
    /// `matched_responses` (with `response_matched = false`) so a blocking
    /// `send_command` waiting on it can resolve with `ResponseTimeout`.
    pub fn tick(&mut self, now: Instant) {
        for cmd in self.commands.remove_stale(now) {
            self.report_async(AsyncError::CommandRemovedFromQueue);
            let _ = self.matched_responses.push(cmd);
        }
    }

    /// Handles one complete Binary-FB fragment: on reassembly completion,
    /// decodes the reassembled payload exactly as a Binary-FA frame would,
    /// as though it had arrived in one piece. Re-synthesizes a standalone
    /// buffer for reuse of the FA decoder.
    pub fn dispatch_binary_fb(&mut self, frame_index: u8, total_frames: u8, payload: &[u8]) {
        match self.fb_reassembler.accept(frame_index, total_frames, payload) {
            ReassembleOutcome::InProgress => {},
            ReassembleOutcome::Discarded(err) => self.report_async(err),
            ReassembleOutcome::Complete(reassembled) => {
                let mut scratch = RingBuffer::with_capacity(reassembled.len() + 4);
                if scratch.put(&reassembled).is_ok() {
                    if let Ok((_n, measurement)) = binary_fa::find_and_decode(&scratch, 0) {
                        self.publish_measurement(measurement, None);
                    }
                }
            },
        }
    }
}
