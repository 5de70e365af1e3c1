//! Firmware updater and bootloader autobaud: processor switching,
//! per-component record streaming with a retry budget, and a
//! poll-with-timeout banner scan for the post-reset recovery probe.

use std::time::Duration;

use crate::clock::Clock;
use crate::command::{CommandKind, Processor};
use crate::config::SensorConfig;
use crate::error::{BootloaderStatus, Error};
use crate::sensor::{SendMode, Sensor};
use crate::transport::SerialTransport;

/// Fixed prefix the bootloader banner is recognized by:
/// `VectorNav Bootloader v.XX.XX.XX.XX`, 34 bytes.
pub const BOOTLOADER_BANNER_PREFIX: &str = "VectorNav Bootloader v.";
pub const BOOTLOADER_BANNER_LEN: usize = 34;

/// Sends the autobaud probe (≥8 space characters) and listens for the
/// bootloader banner within `listen_window`, retrying up to `retries`
/// times. Frames that don't match the banner are routed to the
/// skipped-byte path implicitly (this function only reads raw bytes, it
/// does not run the full synchronizer).
pub fn bootloader_autobaud<T: SerialTransport, C: Clock>(
    transport: &mut T,
    clock: &C,
    baud: u32,
    retries: u32,
    listen_window: Duration,
) -> Result<(), Error> {
    transport.change_baud(baud)?;
    let probe = [b' '; 8];

    for _ in 0..retries {
        transport.send(&probe)?;
        let deadline = clock.now() + listen_window;
        let mut scratch = Vec::new();
        while clock.now() < deadline {
            let mut incoming = Vec::new();
            if transport.get_data(&mut incoming).is_ok() {
                scratch.extend_from_slice(&incoming);
            }
            if banner_present(&scratch) {
                return Ok(());
            }
            clock.sleep(Duration::from_millis(5));
        }
    }
    Err(Error::ResponseTimeout)
}

fn banner_present(bytes: &[u8]) -> bool {
    if bytes.len() < BOOTLOADER_BANNER_LEN {
        return false;
    }
    bytes.windows(BOOTLOADER_BANNER_PREFIX.len()).any(|w| w == BOOTLOADER_BANNER_PREFIX.as_bytes())
}

/// One component's firmware payload: the target processor and its
/// Intel-HEX-like record lines, already split on whatever line ending the
/// source file used.
#[derive(Debug, Clone)]
pub struct FirmwareComponent {
    pub hw_id: Option<String>,
    pub processor: Processor,
    pub records: Vec<String>,
}

/// Parses a VNXML manifest: one or more `<Component HwId="..." Type="...">`
/// elements, each containing record lines as text content. Grounded on the
/// `roxmltree` usage pattern (`Document::parse` + `descendants()`) shown
/// across the example pack for XML ingestion without a DOM allocation per
/// node.
pub fn parse_manifest(xml: &str) -> Result<Vec<FirmwareComponent>, Error> {
    let doc = roxmltree::Document::parse(xml).map_err(|_| Error::ReceivedInvalidResponse)?;
    let mut components = Vec::new();

    for node in doc.descendants().filter(|n| n.has_tag_name("Component")) {
        let hw_id = node.attribute("HwId").map(str::to_string);
        let kind = node.attribute("Type").unwrap_or("Nav");
        let processor = match kind {
            "IMU" => Processor::Imu,
            "GNSS" => Processor::Gnss,
            _ => Processor::Nav,
        };
        let records =
            node.text().unwrap_or("").lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect();
        components.push(FirmwareComponent { hw_id, processor, records });
    }

    if components.is_empty() {
        return Err(Error::ReceivedInvalidResponse);
    }
    Ok(components)
}

/// One line's hex payload, extracted after its first `:` (Intel-HEX
/// framing), wrapped as a `BLD,<payload>` command body.
fn record_to_bld(line: &str) -> CommandKind {
    let hex_payload = line.splitn(2, ':').nth(1).unwrap_or(line).to_string();
    CommandKind::Bootloader { hex_payload }
}

/// Outcome of streaming one component's records.
enum StreamOutcome {
    Done,
    Retry,
    Abort(Error),
}

/// Categorizes a `VNBLD` response payload: `None` advances, `Timeout`
/// retries the whole component from its start, everything else is a hard
/// abort — including `CommError`, per DESIGN.md's Open Question decision
/// to reproduce the source's literal (undocumented-as-deliberate) behavior
/// rather than guess at a softer retry policy.
fn categorize_bld_response(payload: Option<&str>) -> StreamOutcome {
    let Some(payload) = payload else { return StreamOutcome::Done };
    let code = payload.trim().split(',').next().and_then(|s| u8::from_str_radix(s.trim(), 16).ok());
    match code.and_then(BootloaderStatus::from_code) {
        None | Some(BootloaderStatus::None) => StreamOutcome::Done,
        Some(BootloaderStatus::Timeout) => StreamOutcome::Retry,
        Some(_other) => StreamOutcome::Abort(Error::ReceivedInvalidResponse),
    }
}

/// Up to two whole-component retries.
const COMPONENT_RETRY_BUDGET: u32 = 2;

pub struct FirmwareUpdater {
    pub progress_percent: u8,
}

impl FirmwareUpdater {
    pub fn new() -> Self {
        Self { progress_percent: 0 }
    }

    /// Drives the full state machine over `components`, in manifest order.
    /// `progress` is called after each whole-percent step advance (a
    /// 10-cell bar is `progress_percent / 10` cells filled).
    pub fn update_firmware<T: SerialTransport, C: Clock>(
        &mut self,
        sensor: &mut Sensor<T, C>,
        clock: &C,
        config: &SensorConfig,
        components: &[FirmwareComponent],
        mut progress: impl FnMut(u8),
    ) -> Result<(), Error> {
        self.progress_percent = 0;
        progress(self.progress_percent);

        // Step 1: bootloader-recovery probe. If the sensor is already in
        // bootloader mode from a prior failed update, jump straight to
        // streaming the Nav component. This is the same autobaud primitive
        // `enter_bootloader` uses below (section 4.10), not a command
        // round trip: a sensor already in the bootloader doesn't answer
        // ASCII commands at all.
        let already_in_bootloader = bootloader_autobaud(
            sensor.transport_mut(),
            clock,
            config.bootloader_baud_rate,
            config.bootloader_autobaud_retries,
            config.bootloader_autobaud_listen_window,
        )
        .is_ok();

        if !already_in_bootloader {
            // Step 2: identify.
            let mut model = crate::registers::Model::default();
            sensor.read_register(&mut model, false).map_err(|_| Error::ReceivedInvalidResponse)?;
            if model.model.is_empty() {
                return Err(Error::ReceivedInvalidResponse);
            }

            // Step 3: restore factory, tolerating a reverify timeout.
            let _ = sensor.restore_factory_settings();
        }

        let total = components.len().max(1);
        for (idx, component) in components.iter().enumerate() {
            log::info!("firmware update: switching to {:?} for component {}/{total}", component.processor, idx + 1);
            self.switch_to_processor(sensor, component.processor)?;
            self.enter_bootloader(sensor, clock, config)?;

            let mut attempt = 0;
            loop {
                match self.stream_component(sensor, component) {
                    StreamOutcome::Done => break,
                    StreamOutcome::Abort(e) => {
                        log::error!("firmware update: component {} aborted: {e}", idx + 1);
                        return Err(e);
                    },
                    StreamOutcome::Retry => {
                        attempt += 1;
                        log::warn!("firmware update: component {} retry {attempt}/{COMPONENT_RETRY_BUDGET}", idx + 1);
                        if attempt > COMPONENT_RETRY_BUDGET {
                            return Err(Error::ResponseTimeout);
                        }
                    },
                }
            }

            let _ = sensor.reset();

            self.progress_percent = (((idx + 1) * 100) / total) as u8;
            progress(self.progress_percent);
        }

        // Step 5: finish by switching back to Nav and resetting.
        self.switch_to_processor(sensor, Processor::Nav)?;
        let _ = sensor.reset();
        self.progress_percent = 100;
        progress(self.progress_percent);
        Ok(())
    }

    fn switch_to_processor<T: SerialTransport, C: Clock>(
        &self,
        sensor: &mut Sensor<T, C>,
        processor: Processor,
    ) -> Result<(), Error> {
        sensor
            .send_command(
                CommandKind::SetBootloaderProcessor(processor),
                SendMode::Block,
                Duration::from_millis(500),
            )
            .map(|_| ())
    }

    fn enter_bootloader<T: SerialTransport, C: Clock>(
        &self,
        sensor: &mut Sensor<T, C>,
        clock: &C,
        config: &SensorConfig,
    ) -> Result<(), Error> {
        if let Err(_e) = sensor.send_command(CommandKind::FirmwareUpdate, SendMode::Block, config.default_command_timeout) {
            let _ = sensor.reset();
            return Err(Error::ResponseTimeout);
        }
        bootloader_autobaud(
            sensor.transport_mut(),
            clock,
            config.bootloader_baud_rate,
            config.bootloader_autobaud_retries,
            config.bootloader_autobaud_listen_window,
        )
        .map_err(|e| {
            let _ = sensor.reset();
            e
        })
    }

    fn stream_component<T: SerialTransport, C: Clock>(
        &self,
        sensor: &mut Sensor<T, C>,
        component: &FirmwareComponent,
    ) -> StreamOutcome {
        for line in &component.records {
            let cmd = record_to_bld(line);
            match sensor.send_command(cmd, SendMode::Block, Duration::from_secs(2)) {
                Ok(payload) => match categorize_bld_response(payload.as_deref()) {
                    StreamOutcome::Done => continue,
                    other => return other,
                },
                Err(Error::ResponseTimeout) => return StreamOutcome::Retry,
                Err(e) => return StreamOutcome::Abort(e),
            }
        }
        StreamOutcome::Done
    }
}

impl Default for FirmwareUpdater {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_manifest_with_two_components() {
        let xml = r#"<Manifest>
            <Component HwId="VN-100" Type="Nav">
                :1000000000000000000000000000000000000000
                :10001000000000000000000000000000000000EF
            </Component>
            <Component HwId="VN-100" Type="IMU">
                :10000000AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA55
            </Component>
        </Manifest>"#;
        let components = parse_manifest(xml).unwrap();
        assert_eq!(components.len(), 2);
        assert_eq!(components[0].processor, Processor::Nav);
        assert_eq!(components[0].records.len(), 2);
        assert_eq!(components[1].processor, Processor::Imu);
    }

    #[test]
    fn record_to_bld_strips_everything_before_first_colon() {
        match record_to_bld(":100000000102030405") {
            CommandKind::Bootloader { hex_payload } => assert_eq!(hex_payload, "100000000102030405"),
            _ => panic!("expected Bootloader"),
        }
    }

    #[test]
    fn banner_is_recognized_mid_stream() {
        let mut bytes = vec![0u8; 3];
        bytes.extend_from_slice(b"VectorNav Bootloader v.01.02.03.04");
        assert!(banner_present(&bytes));
    }

    #[test]
    fn empty_manifest_is_rejected() {
        assert!(parse_manifest("<Manifest></Manifest>").is_err());
    }

    #[test]
    fn bld_status_none_advances() {
        assert!(matches!(categorize_bld_response(Some("00")), StreamOutcome::Done));
    }

    #[test]
    fn bld_status_timeout_retries_the_component() {
        assert!(matches!(categorize_bld_response(Some("0C")), StreamOutcome::Retry));
    }

    #[test]
    fn bld_status_invalid_program_crc_hard_aborts() {
        match categorize_bld_response(Some("09")) {
            StreamOutcome::Abort(_) => {},
            _ => panic!("expected a hard abort on InvalidProgramCRC"),
        }
    }

    #[test]
    fn bld_status_comm_error_hard_aborts() {
        // DESIGN.md's Open Question decision: CommError is a hard abort, not
        // folded into the whole-component retry budget.
        match categorize_bld_response(Some("05")) {
            StreamOutcome::Abort(_) => {},
            _ => panic!("expected a hard abort on CommError"),
        }
    }
}
