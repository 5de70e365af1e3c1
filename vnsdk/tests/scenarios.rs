//! End-to-end scenarios driven entirely through the `Sensor` façade and a
//! `MockTransport`, no real serial port involved. `FakeClock` keeps every
//! timeout deterministic and instant.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use vnsdk::registers::{AsyncOutputFreq, Model};
use vnsdk::{
    binary_fa, CommandKind, Error, FakeClock, MockTransport, SendMode, Sensor, SensorConfig,
    SerialTransport, SUPPORTED_BAUD_RATES,
};

fn xor8(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc ^ b)
}

fn crc16_ccitt(bytes: &[u8]) -> u16 {
    use crc::{Crc, CRC_16_XMODEM};
    const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);
    CRC16.checksum(bytes)
}

/// Builds `$<header>[,<payload>]*XX\r\n` with an 8-bit XOR checksum, the
/// shape every command response in these tests is synthesized as.
fn ascii_frame(header: &str, payload: &str) -> Vec<u8> {
    let body = if payload.is_empty() { header.to_string() } else { format!("{header},{payload}") };
    let crc = xor8(body.as_bytes());
    format!("${body}*{crc:02X}\r\n").into_bytes()
}

fn sensor_with(config: SensorConfig) -> Sensor<MockTransport, FakeClock> {
    let transport = MockTransport::new(SUPPORTED_BAUD_RATES);
    Sensor::new(transport, FakeClock::new(), config)
}

#[test]
fn s1_ascii_ypr_with_xor_checksum_is_published_as_a_measurement() {
    let mut sensor = sensor_with(SensorConfig::default());
    sensor.connect("COM-TEST", 115_200).unwrap();

    sensor.transport_mut().push_incoming(b"$VNYPR,+010.000,+002.500,-001.250*5E\r\n");
    sensor.load_main_buffer_from_serial().unwrap();
    sensor.process_next_packet();

    let m = sensor.next_measurement(false, Duration::ZERO).expect("a measurement was published");
    assert_eq!(m.attitude.ypr, Some([10.0, 2.5, -1.25]));
    assert!(sensor.skipped_bytes().is_empty());
}

#[test]
fn s2_corrupted_checksum_frame_is_skipped_not_published() {
    let mut sensor = sensor_with(SensorConfig::default());
    sensor.connect("COM-TEST", 115_200).unwrap();

    let frame: &[u8] = b"$VNYPR,+010.000,+002.500,-001.250*00\r\n";
    sensor.transport_mut().push_incoming(frame);
    sensor.load_main_buffer_from_serial().unwrap();
    sensor.process_next_packet();

    assert!(!sensor.has_measurement());
    assert_eq!(sensor.skipped_bytes(), frame);
}

#[test]
fn s3_binary_fa_time_and_attitude_group_is_published() {
    let mut sensor = sensor_with(SensorConfig::default());
    sensor.connect("COM-TEST", 115_200).unwrap();

    let group_mask = 0b0000_0101u8; // Time (bit 0) + Attitude (bit 2)
    let time_mask = 0b1u16; // timeStartup
    let attitude_mask = 0b1u16; // ypr
    let mut frame = vec![binary_fa::SYNC_BYTE, group_mask];
    frame.extend_from_slice(&time_mask.to_le_bytes());
    frame.extend_from_slice(&attitude_mask.to_le_bytes());
    frame.extend_from_slice(&123_456u64.to_le_bytes());
    frame.extend_from_slice(&1.0f32.to_le_bytes());
    frame.extend_from_slice(&2.0f32.to_le_bytes());
    frame.extend_from_slice(&3.0f32.to_le_bytes());
    let crc = crc16_ccitt(&frame[1..]);
    frame.extend_from_slice(&crc.to_le_bytes());

    sensor.transport_mut().push_incoming(&frame);
    sensor.load_main_buffer_from_serial().unwrap();
    sensor.process_next_packet();

    let m = sensor.next_measurement(false, Duration::ZERO).expect("a measurement was published");
    assert_eq!(m.time.time_startup_ns, Some(123_456));
    assert_eq!(m.attitude.ypr, Some([1.0, 2.0, 3.0]));
}

#[test]
fn s4_read_register_round_trip_via_a_synthesized_reply() {
    let mut transport = MockTransport::new(SUPPORTED_BAUD_RATES);
    transport.set_responder(|bytes, _baud| {
        let msg = std::str::from_utf8(bytes).ok()?;
        let body = msg.strip_prefix('$')?.split('*').next()?;
        if !body.starts_with("VNRRG,01") {
            return None;
        }
        Some(ascii_frame("VNRRG", "01,VN-100"))
    });
    let mut sensor = Sensor::new(transport, FakeClock::new(), SensorConfig::default());
    sensor.connect("COM-TEST", 115_200).unwrap();

    let mut model = Model::default();
    sensor.read_register(&mut model, false).unwrap();
    assert_eq!(model.model, "VN-100");
    assert_eq!(sensor.async_error_queue_size(), 0);
}

#[test]
fn s5_auto_connect_settles_on_921600() {
    let mut transport = MockTransport::new(SUPPORTED_BAUD_RATES);
    // The sensor is actually sitting at 921600; every other baud sees
    // nothing but silence and times out.
    transport.set_responder(|bytes, baud| {
        let msg = std::str::from_utf8(bytes).ok()?;
        let body = msg.strip_prefix('$')?.split('*').next()?;
        if baud != 921_600 || !body.starts_with("VNRRG,01") {
            return None;
        }
        Some(ascii_frame("VNRRG", "01,VN-300"))
    });
    let mut sensor = Sensor::new(transport, FakeClock::new(), SensorConfig::default());

    sensor.auto_connect("COM-TEST").unwrap();
    assert_eq!(sensor.transport().connected_baud(), Some(921_600));
}

#[test]
fn s6_firmware_update_streams_every_record_and_completes() {
    let manifest = r#"<Manifest>
        <Component HwId="VN-300" Type="Nav">
            :10000000000102030405060708090A0B0C0D0E0F00
            :10001000101112131415161718191A1B1C1D1E1F00
            :10002000202122232425262728292A2B2C2D2E2F00
            :1000300030313233343536373839303B3C3D3E3F00
        </Component>
    </Manifest>"#;
    let components = vnsdk::firmware::parse_manifest(manifest).unwrap();
    assert_eq!(components.len(), 1);
    assert_eq!(components[0].records.len(), 4);

    let bld_count = Arc::new(Mutex::new(0u32));
    let counter = bld_count.clone();
    let mut transport = MockTransport::new(SUPPORTED_BAUD_RATES);
    transport.set_responder(move |bytes, _baud| {
        let msg = std::str::from_utf8(bytes).ok()?;
        let body = msg.strip_prefix('$')?.split('*').next()?;
        let header = body.split(',').next().unwrap_or(body);
        match header {
            "VNSBL" if body.contains('?') => None, // bootloader-recovery probe: not already in bootloader
            "VNSBL" => Some(ascii_frame("VNSBL", "0")),
            "VNRRG" => Some(ascii_frame("VNRRG", "01,VN-300")),
            "VNFWU" => Some(ascii_frame("VNFWU", "")),
            "VNRST" => Some(ascii_frame("VNRST", "")),
            "VNRFS" => Some(ascii_frame("VNRFS", "")),
            "VNBLD" => {
                *counter.lock().unwrap() += 1;
                Some(ascii_frame("VNBLD", "00"))
            },
            _ => None,
        }
    });

    let mut sensor = Sensor::new(transport, FakeClock::new(), SensorConfig::default());
    sensor.connect("COM-TEST", 115_200).unwrap();

    let clock = FakeClock::new();
    let config = SensorConfig::default();
    let mut updater = vnsdk::firmware::FirmwareUpdater::new();
    let mut progress_steps = Vec::new();
    updater.update_firmware(&mut sensor, &clock, &config, &components, |p| progress_steps.push(p)).unwrap();

    assert_eq!(*bld_count.lock().unwrap(), 4);
    assert_eq!(updater.progress_percent, 100);
    assert_eq!(progress_steps.last(), Some(&100));
}

#[test]
fn invariant_command_queue_capacity_is_bounded() {
    let config = SensorConfig::builder().command_queue_capacity(2).build();
    let mut sensor = sensor_with(config);
    sensor.connect("COM-TEST", 115_200).unwrap();

    sensor.send_command(CommandKind::Reset, SendMode::None, Duration::from_millis(10)).unwrap();
    sensor.send_command(CommandKind::WriteSettings, SendMode::None, Duration::from_millis(10)).unwrap();
    let err = sensor
        .send_command(CommandKind::KnownMagneticDisturbance(true), SendMode::None, Duration::from_millis(10))
        .unwrap_err();
    assert_eq!(err, Error::CommandQueueFull);
}

#[test]
fn invariant_blocking_send_resolves_within_the_configured_wait() {
    let mut sensor = sensor_with(SensorConfig::default());
    sensor.connect("COM-TEST", 115_200).unwrap();

    let err = sensor.send_command(CommandKind::Reset, SendMode::Block, Duration::from_millis(30)).unwrap_err();
    assert_eq!(err, Error::ResponseTimeout);
}

#[test]
fn invariant_ascii_register_round_trips_through_the_facade() {
    let mut transport = MockTransport::new(SUPPORTED_BAUD_RATES);
    transport.set_responder(|bytes, _baud| {
        let msg = std::str::from_utf8(bytes).ok()?;
        let body = msg.strip_prefix('$')?.split('*').next()?;
        let value = body.strip_prefix("VNWRG,07,")?;
        Some(ascii_frame("VNWRG", &format!("07,{value}")))
    });
    let mut sensor = Sensor::new(transport, FakeClock::new(), SensorConfig::default());
    sensor.connect("COM-TEST", 115_200).unwrap();

    sensor.write_register(&AsyncOutputFreq { adof: 200 }, false).unwrap();
}

#[test]
fn invariant_mixed_ascii_and_binary_fa_frames_both_dispatch_from_one_stream() {
    let mut sensor = sensor_with(SensorConfig::default());
    sensor.connect("COM-TEST", 115_200).unwrap();

    let mut stream = Vec::new();
    stream.extend_from_slice(b"$VNYPR,+010.000,+002.500,-001.250*5E\r\n");

    let group_mask = 0b0000_0001u8;
    let field_mask = 0b1u16;
    let mut fa = vec![binary_fa::SYNC_BYTE, group_mask];
    fa.extend_from_slice(&field_mask.to_le_bytes());
    fa.extend_from_slice(&42u64.to_le_bytes());
    let crc = crc16_ccitt(&fa[1..]);
    fa.extend_from_slice(&crc.to_le_bytes());
    stream.extend_from_slice(&fa);

    sensor.transport_mut().push_incoming(&stream);
    sensor.load_main_buffer_from_serial().unwrap();
    sensor.process_next_packet();

    let m1 = sensor.next_measurement(false, Duration::ZERO).unwrap();
    assert_eq!(m1.attitude.ypr, Some([10.0, 2.5, -1.25]));
    let m2 = sensor.next_measurement(false, Duration::ZERO).unwrap();
    assert_eq!(m2.time.time_startup_ns, Some(42));
    assert!(sensor.skipped_bytes().is_empty());
}
