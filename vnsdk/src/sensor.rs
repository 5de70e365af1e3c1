//! The sensor façade: the crate's single public entry point, gluing the
//! ring buffer, packet synchronizer, dispatch, command processor, and
//! transport together behind a small blocking/non-blocking API.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::buffer::RingBuffer;
use crate::clock::Clock;
use crate::command::{Command, CommandKind};
use crate::config::SensorConfig;
use crate::dispatch::Dispatch;
use crate::error::{AsyncError, Error, VnErrCode};
use crate::measurement::CompositeMeasurement;
use crate::queue::BoundedQueue;
use crate::registers::{ConfigurationRegister, MeasurementRegister, Model, Register};
use crate::subscription::{Filter, FilterMode, Subscription};
use crate::sync::{self, FrameKind, SyncOutcome};
use crate::transport::SerialTransport;

/// How `send_command` waits for a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendMode {
    /// Enqueue and return immediately.
    None,
    /// Enqueue, then poll until matched or `wait` elapses.
    Block,
    /// As `Block`, but re-enqueue and re-send on timeout, up to
    /// `command_send_retries_allowed` times.
    BlockWithRetry,
}

/// Outcome of a blocking `send_command`: the raw response payload, if any
/// (absent for `SendMode::None`).
pub type SendOutcome = Option<String>;

pub struct Sensor<T: SerialTransport, C: Clock> {
    transport: T,
    clock: C,
    config: SensorConfig,
    buffer: RingBuffer,
    skipped_bytes: Vec<u8>,
    received_bytes: Vec<u8>,
    dispatch: Dispatch,
    next_subscription_id: u64,
    listening: Arc<AtomicBool>,
}

impl<T: SerialTransport, C: Clock> Sensor<T, C> {
    pub fn new(transport: T, clock: C, config: SensorConfig) -> Self {
        let dispatch = Dispatch::new(
            config.measurement_queue_capacity,
            config.command_queue_capacity,
            config.async_error_queue_capacity,
            config.fb_reassembly_buffer_capacity,
        );
        Self {
            buffer: RingBuffer::with_capacity(config.main_buffer_capacity),
            skipped_bytes: Vec::new(),
            received_bytes: Vec::new(),
            dispatch,
            next_subscription_id: 0,
            listening: Arc::new(AtomicBool::new(false)),
            transport,
            clock,
            config,
        }
    }

    // ---- connection lifecycle ----------------------------------------

    pub fn connect(&mut self, port: &str, baud: u32) -> Result<(), Error> {
        self.transport.open(port, baud)?;
        self.listening.store(true, Ordering::Release);
        log::info!("connected to {port} at {baud} baud");
        Ok(())
    }

    /// Tries each baud rate in `config::AUTOBAUD_ORDER`, declaring success
    /// when `ReadRegister(Model)` returns a non-empty model string.
    pub fn auto_connect(&mut self, port: &str) -> Result<(), Error> {
        for &baud in crate::config::AUTOBAUD_ORDER {
            log::debug!("auto_connect: trying {port} at {baud} baud");
            if self.transport.open(port, baud).is_err() {
                continue;
            }
            self.listening.store(true, Ordering::Release);
            let mut model = Model::default();
            if self.read_register(&mut model, false).is_ok() && !model.model.is_empty() {
                log::info!("auto_connect: identified {} at {baud} baud", model.model);
                return Ok(());
            }
            let _ = self.transport.close();
            self.listening.store(false, Ordering::Release);
        }
        log::warn!("auto_connect: no baud rate elicited a model response on {port}");
        Err(Error::ResponseTimeout)
    }

    /// `ReadRegister(Model)` with no retry; success means the sensor is
    /// alive at the currently connected baud rate.
    pub fn verify_connectivity(&mut self) -> Result<(), Error> {
        let mut model = Model::default();
        self.read_register(&mut model, false)?;
        if model.model.is_empty() {
            return Err(Error::ReceivedInvalidResponse);
        }
        Ok(())
    }

    /// Commands the sensor to a new baud, waits for the settle duration,
    /// then changes the host's own baud and reverifies.
    pub fn change_baud(&mut self, new_baud: u32) -> Result<(), Error> {
        let baud_reg = crate::registers::BaudRate { baud_rate: new_baud };
        self.write_register(&baud_reg, false)?;
        self.clock.sleep(self.config.baud_change_settle_duration);
        self.change_host_baud(new_baud)?;
        self.verify_connectivity()
    }

    pub fn change_host_baud(&mut self, new_baud: u32) -> Result<(), Error> {
        self.transport.change_baud(new_baud)
    }

    /// Direct access to the underlying transport, for test harnesses that
    /// need to inject bytes or inspect what was sent without a real serial
    /// loop.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn disconnect(&mut self) -> Result<(), Error> {
        self.listening.store(false, Ordering::Release);
        log::info!("disconnecting");
        self.transport.close()
    }

    // ---- cooperative-single-task primitives -----------------------------

    /// Reads whatever bytes are currently available from the transport
    /// into the main buffer.
    pub fn load_main_buffer_from_serial(&mut self) -> Result<usize, Error> {
        let mut incoming = Vec::new();
        let n = self.transport.get_data(&mut incoming)?;
        if n == 0 {
            return Ok(0);
        }
        self.received_bytes.extend_from_slice(&incoming);
        if self.received_bytes.len() > self.config.received_byte_buffer_capacity {
            let overflow = self.received_bytes.len() - self.config.received_byte_buffer_capacity;
            self.received_bytes.drain(0..overflow);
            self.report_async(AsyncError::ReceivedByteBufferFull);
        }
        if self.buffer.put(&incoming).is_err() {
            self.report_async(AsyncError::PrimaryBufferFull);
        }
        Ok(n)
    }

    /// Drains the synchronizer until it reports it needs more data.
    pub fn process_next_packet(&mut self) {
        loop {
            let skip_capacity = self.config.skipped_byte_buffer_capacity;
            match sync::dispatch_next_packet(&mut self.buffer, &mut self.skipped_bytes, skip_capacity) {
                SyncOutcome::NeedMoreData { skip_overflowed } => {
                    if skip_overflowed {
                        self.report_async(AsyncError::SkippedByteBufferFull);
                    }
                    break;
                },
                SyncOutcome::Dispatched { kind, len, skip_overflowed } => {
                    if skip_overflowed {
                        self.report_async(AsyncError::SkippedByteBufferFull);
                    }
                    let now = self.clock.now();
                    match kind {
                        FrameKind::Ascii => self.dispatch.dispatch_ascii(&self.buffer, 0, len, now),
                        FrameKind::BinaryFa => self.dispatch.dispatch_binary_fa(&self.buffer, 0, len),
                        FrameKind::BinaryFb => {
                            let header = crate::binary_fb::header_fields(&self.buffer, 0);
                            let payload_len = header.payload_len as usize;
                            let mut payload = vec![0u8; payload_len];
                            self.buffer.peek_range(5, payload_len, &mut payload);
                            self.dispatch.dispatch_binary_fb(header.frame_index, header.total_frames, &payload);
                        },
                    }
                    self.buffer.discard(len);
                },
            }
        }
        self.dispatch.tick(self.clock.now());
    }

    fn report_async(&mut self, err: AsyncError) {
        log::warn!("async error: {err}");
        if !self.dispatch.async_errors.push(err) {
            log::error!("async-error queue overflowed, dropping: {err}");
            if !self.dispatch.async_errors.push(AsyncError::AsyncQueueOverflow) {
                log::error!("async-error queue overflowed again while reporting its own overflow");
            }
        }
    }

    // ---- threaded listener -----------------------------------------------
    //
    // The cooperative primitives above are all an application strictly
    // needs; a dedicated-thread configuration runs this same loop on a
    // background thread against a `Sensor` the caller has wrapped in
    // `Arc<Mutex<_>>`. Only `load_main_buffer_from_serial`/
    // `process_next_packet` run under the lock; the sleep between rounds
    // happens after it is released, so no lock is ever held across a
    // suspension point.
    //
    // An application thread sharing the same `Arc<Mutex<Sensor<..>>>`
    // should not call the `Block`/`BlockWithRetry` `send_command` modes or
    // `next_measurement(block = true, ..)` — those drive this same loop
    // themselves and would hold the lock for the whole wait, starving the
    // listener thread. Instead submit with `SendMode::None` and read
    // results back through `measurement_queue()`/`matched_response_queue()`/
    // `async_error_queue()`, which are the actual synchronization boundary
    // and block without touching the sensor's mutex at all.

    /// A clonable handle onto the measurement queue, usable from any thread
    /// without locking the `Sensor` itself.
    pub fn measurement_queue(&self) -> BoundedQueue<CompositeMeasurement> {
        self.dispatch.measurements.clone()
    }

    /// A clonable handle onto commands that matched a response, usable from
    /// any thread without locking the `Sensor` itself.
    pub fn matched_response_queue(&self) -> BoundedQueue<Command> {
        self.dispatch.matched_responses.clone()
    }

    /// A clonable handle onto the async-error queue, usable from any thread
    /// without locking the `Sensor` itself.
    pub fn async_error_queue(&self) -> BoundedQueue<AsyncError> {
        self.dispatch.async_errors.clone()
    }

    /// The shared "listening" flag: cleared by `disconnect`, observed by
    /// any thread spawned with [`Sensor::spawn_listener`].
    pub fn listening_flag(&self) -> Arc<AtomicBool> {
        self.listening.clone()
    }

    /// Spawns a dedicated listener thread: read-as-much-as-available,
    /// drain the synchronizer until it asks for more data, sleep
    /// `listen_sleep_duration`, repeat until `disconnect()` clears the
    /// shared listening flag. `clock` is a separate handle from the one
    /// driving `sensor`'s own blocking calls (e.g. a second `SystemClock`,
    /// which is zero-sized) so the sleep never needs the lock held to
    /// reach it.
    pub fn spawn_listener(sensor: Arc<Mutex<Self>>, clock: C) -> std::thread::JoinHandle<()>
    where
        T: 'static,
        C: 'static,
    {
        let listening = sensor.lock().unwrap().listening.clone();
        std::thread::spawn(move || {
            while listening.load(Ordering::Acquire) {
                let sleep_for = {
                    let mut s = sensor.lock().unwrap();
                    let _ = s.load_main_buffer_from_serial();
                    s.process_next_packet();
                    s.config.listen_sleep_duration
                };
                clock.sleep(sleep_for);
            }
        })
    }

    // ---- measurement access --------------------------------------------

    /// Bytes the synchronizer scanned past without framing a valid packet.
    pub fn skipped_bytes(&self) -> &[u8] {
        &self.skipped_bytes
    }

    /// Every byte the transport has delivered, parsed or not.
    pub fn received_bytes(&self) -> &[u8] {
        &self.received_bytes
    }

    pub fn has_measurement(&self) -> bool {
        !self.dispatch.measurements.is_empty()
    }

    pub fn next_measurement(&mut self, block: bool, wait: Duration) -> Option<CompositeMeasurement> {
        if let Some(m) = self.dispatch.measurements.pop() {
            return Some(m);
        }
        if !block {
            return None;
        }
        self.drive_until(wait, |s| s.dispatch.measurements.pop())
    }

    pub fn most_recent_measurement(&mut self, block: bool, wait: Duration) -> Option<CompositeMeasurement> {
        if let Some(m) = self.dispatch.measurements.peek_back() {
            return Some(m);
        }
        if !block {
            return None;
        }
        self.drive_until(wait, |s| s.dispatch.measurements.peek_back())
    }

    /// Repeatedly loads bytes, processes them, and sleeps
    /// `listen_sleep_duration` between rounds until `poll` succeeds or
    /// `wait` elapses — the cooperative "drive between steps" loop.
    fn drive_until<R>(&mut self, wait: Duration, mut poll: impl FnMut(&mut Self) -> Option<R>) -> Option<R> {
        let deadline = self.clock.now() + wait;
        loop {
            let _ = self.load_main_buffer_from_serial();
            self.process_next_packet();
            if let Some(r) = poll(self) {
                return Some(r);
            }
            if self.clock.now() >= deadline {
                return None;
            }
            self.clock.sleep(self.config.listen_sleep_duration);
        }
    }

    // ---- registers -------------------------------------------------------

    pub fn read_register<R: MeasurementRegister>(&mut self, reg: &mut R, retry: bool) -> Result<(), Error> {
        let mode = if retry { SendMode::BlockWithRetry } else { SendMode::Block };
        let payload = self.send_command(reg.to_read_command(), mode, self.config.default_command_timeout)?;
        match payload {
            Some(p) => reg.from_string(strip_echoed_id(&p)),
            None => Err(Error::ResponseTimeout),
        }
    }

    pub fn write_register<R: ConfigurationRegister>(&mut self, reg: &R, retry: bool) -> Result<(), Error> {
        let mode = if retry { SendMode::BlockWithRetry } else { SendMode::Block };
        self.send_command(reg.to_write_command(), mode, self.config.default_command_timeout)?;
        Ok(())
    }

    pub fn write_settings(&mut self) -> Result<(), Error> {
        self.send_command(CommandKind::WriteSettings, SendMode::Block, self.config.default_command_timeout)?;
        Ok(())
    }

    pub fn reset(&mut self) -> Result<(), Error> {
        self.send_command(CommandKind::Reset, SendMode::Block, self.config.default_command_timeout)?;
        self.clock.sleep(self.config.reset_recovery_duration);
        self.verify_connectivity()
    }

    pub fn restore_factory_settings(&mut self) -> Result<(), Error> {
        self.send_command(
            CommandKind::RestoreFactorySettings,
            SendMode::Block,
            self.config.default_command_timeout,
        )?;
        self.clock.sleep(self.config.restore_factory_recovery_duration);
        // Force host baud to the default before reverifying; a
        // reverify-timeout here is tolerated, not propagated, since the
        // sensor may still be settling (see DESIGN.md's Open Question
        // decision on this exact case).
        let _ = self.change_host_baud(crate::config::DEFAULT_BAUD_RATE);
        match self.verify_connectivity() {
            Ok(()) | Err(Error::ResponseTimeout) => Ok(()),
            Err(e) => Err(e),
        }
    }

    // ---- commands ----------------------------------------------------

    /// Sends `kind` per `mode`. Returns the raw response payload (for
    /// `SendMode::None`, always `None`; the caller never waits).
    pub fn send_command(&mut self, kind: CommandKind, mode: SendMode, wait: Duration) -> Result<SendOutcome, Error> {
        let retries = match mode {
            SendMode::BlockWithRetry => self.config.command_send_retries_allowed,
            _ => 0,
        };

        let mut attempt = 0;
        loop {
            let body = kind.body();
            let outcome = self.enqueue_and_send(kind.clone())?;
            if matches!(mode, SendMode::None) {
                return Ok(None);
            }
            let _ = outcome;

            match self.wait_for_response(&body, wait) {
                Some(resolved) => return self.interpret_response(resolved),
                None => {
                    if attempt >= retries {
                        return Err(Error::ResponseTimeout);
                    }
                    attempt += 1;
                },
            }
        }
    }

    fn enqueue_and_send(&mut self, kind: CommandKind) -> Result<(), Error> {
        use crate::command::RegisterOutcome;
        let cmd = Command::new(kind, self.config.default_command_timeout);
        match self.dispatch.commands.register(cmd, self.clock.now()) {
            RegisterOutcome::Enqueued(message) => self.transport.send(message.as_bytes()),
            RegisterOutcome::Resent => Ok(()),
            RegisterOutcome::QueueFull => Err(Error::CommandQueueFull),
        }
    }

    /// Polls until a response matching `body` is seen in
    /// `matched_responses`, or `wait` elapses.
    fn wait_for_response(&mut self, body: &str, wait: Duration) -> Option<Command> {
        let deadline = self.clock.now() + wait;
        loop {
            let _ = self.load_main_buffer_from_serial();
            self.process_next_packet();
            // Drain every matched response seen this round; keep ours,
            // silently drop the rest back into the async-error path is not
            // appropriate here (they are legitimately matched commands,
            // just not the one we are waiting on), so they are simply
            // discarded — at most one command is normally outstanding per
            // caller under the blocking API.
            while let Some(cmd) = self.dispatch.matched_responses.pop() {
                if cmd.kind.body() == body {
                    return Some(cmd);
                }
            }
            if self.clock.now() >= deadline {
                self.dispatch.commands.remove_by_body(body);
                return None;
            }
            self.clock.sleep(self.config.listen_sleep_duration);
        }
    }

    fn interpret_response(&self, cmd: Command) -> Result<SendOutcome, Error> {
        if !cmd.response_matched {
            // Either a genuine VNERR, or a stale-timeout removal surfaced
            // through matched_responses (dispatch::Dispatch::tick).
            if let Some(payload) = &cmd.response_payload {
                if let Ok(code) = payload.trim().parse::<u16>() {
                    if let Some(vn_err) = VnErrCode::from_decimal(code) {
                        if let Some(sync_err) = vn_err.as_sync_error() {
                            return Err(sync_err);
                        }
                    }
                }
                return Err(Error::ReceivedUnexpectedMessage);
            }
            return Err(Error::ResponseTimeout);
        }
        Ok(cmd.response_payload)
    }

    // ---- subscriptions -------------------------------------------------

    /// Attaches a subscription to the measurement-publishing path (ASCII
    /// measurement headers and Binary-FA/FB frames). Fails with
    /// `MessageSubscriberCapacityReached` once the combined number of
    /// measurement and response subscriptions reaches
    /// `SensorConfig::subscriber_queue_capacity`.
    pub fn subscribe(
        &mut self,
        queue: BoundedQueue<CompositeMeasurement>,
        filter: Filter,
        filter_mode: FilterMode,
    ) -> Result<u64, Error> {
        if self.dispatch.subscriber_count() >= self.config.subscriber_queue_capacity {
            return Err(Error::MessageSubscriberCapacityReached);
        }
        let id = self.next_subscription_id;
        self.next_subscription_id += 1;
        self.dispatch.measurement_subscribers.push(Subscription { id, queue, filter, filter_mode });
        Ok(id)
    }

    /// Attaches a subscription to the ASCII dispatcher's command-response
    /// side (`VNRRG`/`VNWRG`/`VNERR`/...), delivering each matching frame as
    /// a `"HEADER,payload"` string copy. Same capacity rule as `subscribe`.
    pub fn subscribe_responses(
        &mut self,
        queue: BoundedQueue<String>,
        filter: Filter,
        filter_mode: FilterMode,
    ) -> Result<u64, Error> {
        if self.dispatch.subscriber_count() >= self.config.subscriber_queue_capacity {
            return Err(Error::MessageSubscriberCapacityReached);
        }
        let id = self.next_subscription_id;
        self.next_subscription_id += 1;
        self.dispatch.response_subscribers.push(Subscription { id, queue, filter, filter_mode });
        Ok(id)
    }

    /// Removes a subscription registered by either `subscribe` or
    /// `subscribe_responses`; the id spaces are shared, so this only ever
    /// needs to check both lists. The queue itself is left untouched, per
    /// spec.md §3's subscription-lifetime note.
    pub fn unsubscribe(&mut self, id: u64) {
        self.dispatch.measurement_subscribers.retain(|s| s.id != id);
        self.dispatch.response_subscribers.retain(|s| s.id != id);
    }

    // ---- async errors ----------------------------------------------------

    pub fn async_error_queue_size(&self) -> usize {
        self.dispatch.async_errors.len()
    }

    pub fn next_async_error(&mut self) -> Option<AsyncError> {
        self.dispatch.async_errors.pop()
    }
}

/// `VNRRG`/`VNWRG` payloads echo the register id as their first
/// comma-separated field (`"01,VN-100"`); registers themselves parse only
/// the fields after it.
fn strip_echoed_id(payload: &str) -> &str {
    match payload.find(',') {
        Some(idx) => &payload[idx + 1..],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::registers::Model;
    use crate::transport::MockTransport;

    fn sensor() -> Sensor<MockTransport, FakeClock> {
        let transport = MockTransport::new(crate::config::SUPPORTED_BAUD_RATES);
        Sensor::new(transport, FakeClock::new(), SensorConfig::default())
    }

    #[test]
    fn s4_read_register_round_trip() {
        let mut s = sensor();
        s.connect("COM-TEST", 115_200).unwrap();

        // Register grabs the outbound bytes so the test can synthesize a
        // reply without a real transport loop.
        let mut model = Model::default();
        // A deliberately wrong checksum first, to exercise the
        // invalid-frame-then-timeout path.
        s.transport.push_incoming(b"$VNRRG,01,VN-100*60\r\n");
        let crc = crate::checksum::xor8(b"VNRRG,01,VN-100");
        let frame = format!("$VNRRG,01,VN-100*{crc:02X}\r\n");

        let result = s.read_register(&mut model, false);
        // the pre-seeded frame above has a deliberately wrong checksum
        // ("*60"), so this exercises the Invalid-frame-then-timeout path;
        // push the corrected frame and retry to exercise the success path.
        assert!(result.is_err());

        s.transport.push_incoming(frame.as_bytes());
        let mut model2 = Model::default();
        s.read_register(&mut model2, false).unwrap();
        assert_eq!(model2.model, "VN-100");
        assert!(s.dispatch.commands.is_empty());
    }

    #[test]
    fn send_command_none_mode_returns_immediately() {
        let mut s = sensor();
        s.connect("COM-TEST", 115_200).unwrap();
        let out = s.send_command(CommandKind::Reset, SendMode::None, Duration::from_millis(10)).unwrap();
        assert!(out.is_none());
        assert!(!s.transport.sent().is_empty());
    }

    #[test]
    fn blocking_send_times_out_and_clears_queue() {
        let mut s = sensor();
        s.connect("COM-TEST", 115_200).unwrap();
        let err = s.send_command(CommandKind::Reset, SendMode::Block, Duration::from_millis(20)).unwrap_err();
        assert_eq!(err, Error::ResponseTimeout);
        assert!(s.dispatch.commands.is_empty());
    }

    /// DESIGN.md's Open Question decision on `restoreFactorySettings`'s
    /// ambiguity: the sensor acknowledges the
    /// `VNRFS` itself, but the post-reverify `ReadRegister(Model)` at the
    /// freshly-forced default baud gets no reply (the sensor is modeled as
    /// still settling) — this must be swallowed, not propagated.
    #[test]
    fn restore_factory_tolerates_reverify_timeout() {
        let mut transport = MockTransport::new(crate::config::SUPPORTED_BAUD_RATES);
        transport.set_responder(|bytes, _baud| {
            let msg = std::str::from_utf8(bytes).ok()?;
            let body = msg.strip_prefix('$')?.split('*').next()?;
            if body.starts_with("VNRFS") {
                let crc = crate::checksum::xor8(b"VNRFS");
                return Some(format!("$VNRFS*{crc:02X}\r\n").into_bytes());
            }
            None // VNRRG (the reverify read) is left unanswered
        });
        let mut s = Sensor::new(transport, FakeClock::new(), SensorConfig::default());
        s.connect("COM-TEST", 921_600).unwrap();

        assert!(s.restore_factory_settings().is_ok());
        assert_eq!(s.transport().connected_baud(), Some(crate::config::DEFAULT_BAUD_RATE));
    }

    /// The threaded listener configuration: a background thread drains
    /// the synchronizer on its own, and the application thread only ever
    /// touches the measurement queue — never the sensor's own mutex lock —
    /// to retrieve what it found.
    #[test]
    fn spawn_listener_delivers_measurements_through_the_queue_boundary() {
        let mut s = sensor();
        s.connect("COM-TEST", 115_200).unwrap();
        let crc = crate::checksum::xor8(b"VNYPR,1.0,2.0,3.0");
        let frame = format!("$VNYPR,1.0,2.0,3.0*{crc:02X}\r\n");
        s.transport_mut().push_incoming(frame.as_bytes());

        let mq = s.measurement_queue();
        let shared = Arc::new(Mutex::new(s));
        let handle = Sensor::spawn_listener(Arc::clone(&shared), FakeClock::new());

        let measurement = mq.pop_blocking(Duration::from_secs(5)).expect("listener thread should publish the measurement");
        assert_eq!(measurement.attitude.ypr, Some([1.0, 2.0, 3.0]));

        shared.lock().unwrap().listening_flag().store(false, Ordering::Release);
        handle.join().unwrap();
    }

    #[test]
    fn response_subscriber_receives_a_copy_of_a_matched_frame() {
        let mut s = sensor();
        s.connect("COM-TEST", 115_200).unwrap();

        let q: BoundedQueue<String> = BoundedQueue::with_capacity(4);
        s.subscribe_responses(q.clone(), Filter::AsciiHeader("VNRRG".to_string()), FilterMode::StartsWith).unwrap();

        let crc = crate::checksum::xor8(b"VNRRG,01,VN-100");
        let frame = format!("$VNRRG,01,VN-100*{crc:02X}\r\n");
        s.transport_mut().push_incoming(frame.as_bytes());
        s.load_main_buffer_from_serial().unwrap();
        s.process_next_packet();

        assert_eq!(q.pop(), Some("VNRRG,01,VN-100".to_string()));
    }

    #[test]
    fn subscribe_fails_once_capacity_is_reached() {
        let mut s = sensor();
        s.config.subscriber_queue_capacity = 1;

        let mq: BoundedQueue<CompositeMeasurement> = BoundedQueue::with_capacity(4);
        s.subscribe(mq.clone(), Filter::Any, FilterMode::StartsWith).unwrap();

        let rq: BoundedQueue<String> = BoundedQueue::with_capacity(4);
        let err = s.subscribe_responses(rq, Filter::Any, FilterMode::StartsWith).unwrap_err();
        assert_eq!(err, Error::MessageSubscriberCapacityReached);
    }

    #[test]
    fn unsubscribe_removes_from_both_subscriber_lists() {
        let mut s = sensor();
        let mq: BoundedQueue<CompositeMeasurement> = BoundedQueue::with_capacity(4);
        let rq: BoundedQueue<String> = BoundedQueue::with_capacity(4);
        let m_id = s.subscribe(mq, Filter::Any, FilterMode::StartsWith).unwrap();
        let r_id = s.subscribe_responses(rq, Filter::Any, FilterMode::StartsWith).unwrap();

        s.unsubscribe(m_id);
        s.unsubscribe(r_id);
        assert_eq!(s.dispatch.subscriber_count(), 0);
    }
}
