//! Example CLI driving `vnsdk` over a real serial port: connect, dump
//! measurements, read/write a register, or run a firmware update from a
//! VNXML manifest.

use std::fs;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use vnsdk::{clock::SystemClock, config::SensorConfig, Sensor};

#[derive(Parser)]
#[command(name = "vnsdk-cli", about = "Demonstrates usage of the vnsdk crate", author)]
struct Cli {
    /// Serial port to open, e.g. /dev/ttyUSB0 or COM3.
    #[arg(short, long)]
    port: String,

    /// Baud rate to connect at. Omit to autobaud.
    #[arg(short, long)]
    baud: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Stream composite measurements to stdout until interrupted.
    Dump {
        /// Stop after this many measurements (default: run forever).
        #[arg(short, long)]
        count: Option<usize>,
    },
    /// Read a register by numeric id and print its fields.
    ReadRegister { id: u8 },
    /// Write the sensor's async output frequency register.
    SetAsyncOutputFreq { hz: u32 },
    /// Run a firmware update from a VNXML manifest file.
    FirmwareUpdate {
        manifest_path: String,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let transport = vnsdk::SerialPortTransport::new(Duration::from_millis(100));
    let mut sensor = Sensor::new(transport, SystemClock, SensorConfig::default());

    match cli.baud {
        Some(baud) => sensor.connect(&cli.port, baud).context("failed to connect at the requested baud rate")?,
        None => sensor.auto_connect(&cli.port).context("autobaud failed to identify a sensor on this port")?,
    }

    match cli.command {
        Command::Dump { count } => run_dump(&mut sensor, count),
        Command::ReadRegister { id } => run_read_register(&mut sensor, id),
        Command::SetAsyncOutputFreq { hz } => run_set_async_output_freq(&mut sensor, hz),
        Command::FirmwareUpdate { manifest_path } => run_firmware_update(&mut sensor, &manifest_path),
    }
}

fn run_dump(sensor: &mut Sensor<vnsdk::SerialPortTransport, SystemClock>, count: Option<usize>) -> Result<()> {
    println!("Streaming measurements. Press Ctrl+C to stop.");
    let mut seen = 0;
    loop {
        if let Some(m) = sensor.next_measurement(true, Duration::from_secs(1)) {
            println!("{m:?}");
            seen += 1;
            if count.is_some_and(|c| seen >= c) {
                break;
            }
        }
        while let Some(err) = sensor.next_async_error() {
            eprintln!("async error: {err}");
        }
    }
    Ok(())
}

fn run_read_register(sensor: &mut Sensor<vnsdk::SerialPortTransport, SystemClock>, id: u8) -> Result<()> {
    match id {
        1 => {
            let mut reg = vnsdk::registers::Model::default();
            sensor.read_register(&mut reg, true)?;
            println!("Model: {}", reg.model);
        },
        4 => {
            let mut reg = vnsdk::registers::FwVer::default();
            sensor.read_register(&mut reg, true)?;
            println!("Firmware version: {}.{}.{}", reg.major, reg.minor, reg.patch);
        },
        other => {
            anyhow::bail!("register id {other} is not one of this CLI's known registers; use vnsdk's API directly")
        },
    }
    Ok(())
}

fn run_set_async_output_freq(sensor: &mut Sensor<vnsdk::SerialPortTransport, SystemClock>, hz: u32) -> Result<()> {
    let reg = vnsdk::registers::AsyncOutputFreq { adof: hz as u16 };
    sensor.write_register(&reg, true)?;
    sensor.write_settings()?;
    println!("Async output frequency set to {hz} Hz and saved to non-volatile memory.");
    Ok(())
}

fn run_firmware_update(sensor: &mut Sensor<vnsdk::SerialPortTransport, SystemClock>, manifest_path: &str) -> Result<()> {
    let xml = fs::read_to_string(manifest_path).with_context(|| format!("reading manifest at {manifest_path}"))?;
    let components = vnsdk::firmware::parse_manifest(&xml).context("parsing VNXML manifest")?;
    println!("Loaded {} firmware component(s) from {manifest_path}", components.len());

    let clock = SystemClock;
    let config = SensorConfig::default();
    let mut updater = vnsdk::firmware::FirmwareUpdater::new();
    updater.update_firmware(sensor, &clock, &config, &components, |percent| {
        println!("firmware update: {percent}%");
    })?;
    println!("Firmware update complete.");
    Ok(())
}
