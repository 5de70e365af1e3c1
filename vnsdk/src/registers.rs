//! Register model: a typed id + payload pair, read via `RRG` and written
//! via `WRG`. Rather than a virtual `fromString`/`toString` base class,
//! this crate uses one shared `Register` trait plus two marker extensions
//! (`MeasurementRegister`, `ConfigurationRegister`) selecting which
//! direction(s) are legal for a given register — a tagged variant per
//! register-family plus one extension trait, avoiding a vtable per
//! register.

use crate::command::CommandKind;
use crate::error::Error;

/// Shared behavior every register has regardless of direction.
pub trait Register {
    fn id(&self) -> u8;
    fn name(&self) -> &'static str;
    /// Parses `payload` (the comma-separated body of a `VNRRG`/`VNWRG`
    /// response, already stripped of the echoed register id) into `self`.
    fn from_string(&mut self, payload: &str) -> Result<(), Error>;

    fn to_read_command(&self) -> CommandKind {
        CommandKind::ReadRegister { id: self.id() }
    }
}

/// Read-only: populated by a response, never sent as a write.
pub trait MeasurementRegister: Register {}

/// Read/write: additionally serializable back to an ASCII payload.
pub trait ConfigurationRegister: Register {
    fn to_string(&self) -> String;

    fn to_write_command(&self) -> CommandKind {
        CommandKind::WriteRegister { id: self.id(), payload: self.to_string() }
    }
}

fn field(payload: &str, index: usize) -> Result<&str, Error> {
    payload.split(',').nth(index).map(str::trim).ok_or(Error::ReceivedInvalidResponse)
}

fn parse_field<T: core::str::FromStr>(payload: &str, index: usize) -> Result<T, Error> {
    field(payload, index)?.parse().map_err(|_| Error::ReceivedInvalidResponse)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    pub model: String,
}
impl Register for Model {
    fn id(&self) -> u8 {
        1
    }
    fn name(&self) -> &'static str {
        "Model"
    }
    fn from_string(&mut self, payload: &str) -> Result<(), Error> {
        self.model = payload.trim().to_string();
        Ok(())
    }
}
impl MeasurementRegister for Model {}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HwVer {
    pub hardware_revision: u32,
}
impl Register for HwVer {
    fn id(&self) -> u8 {
        2
    }
    fn name(&self) -> &'static str {
        "HwVer"
    }
    fn from_string(&mut self, payload: &str) -> Result<(), Error> {
        self.hardware_revision = parse_field(payload, 0)?;
        Ok(())
    }
}
impl MeasurementRegister for HwVer {}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Serial {
    pub serial_number: u32,
}
impl Register for Serial {
    fn id(&self) -> u8 {
        3
    }
    fn name(&self) -> &'static str {
        "Serial"
    }
    fn from_string(&mut self, payload: &str) -> Result<(), Error> {
        self.serial_number = parse_field(payload, 0)?;
        Ok(())
    }
}
impl MeasurementRegister for Serial {}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FwVer {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}
impl Register for FwVer {
    fn id(&self) -> u8 {
        4
    }
    fn name(&self) -> &'static str {
        "FwVer"
    }
    fn from_string(&mut self, payload: &str) -> Result<(), Error> {
        self.major = parse_field(payload, 0)?;
        self.minor = parse_field(payload, 1)?;
        self.patch = parse_field(payload, 2)?;
        Ok(())
    }
}
impl MeasurementRegister for FwVer {}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaudRate {
    pub baud_rate: u32,
}
impl Register for BaudRate {
    fn id(&self) -> u8 {
        5
    }
    fn name(&self) -> &'static str {
        "BaudRate"
    }
    fn from_string(&mut self, payload: &str) -> Result<(), Error> {
        self.baud_rate = parse_field(payload, 0)?;
        Ok(())
    }
}
impl ConfigurationRegister for BaudRate {
    fn to_string(&self) -> String {
        self.baud_rate.to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AsyncOutputType {
    pub ador: u8,
}
impl Register for AsyncOutputType {
    fn id(&self) -> u8 {
        6
    }
    fn name(&self) -> &'static str {
        "AsyncOutputType"
    }
    fn from_string(&mut self, payload: &str) -> Result<(), Error> {
        self.ador = parse_field(payload, 0)?;
        Ok(())
    }
}
impl ConfigurationRegister for AsyncOutputType {
    fn to_string(&self) -> String {
        self.ador.to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AsyncOutputFreq {
    pub adof: u16,
}
impl Register for AsyncOutputFreq {
    fn id(&self) -> u8 {
        7
    }
    fn name(&self) -> &'static str {
        "AsyncOutputFreq"
    }
    fn from_string(&mut self, payload: &str) -> Result<(), Error> {
        self.adof = parse_field(payload, 0)?;
        Ok(())
    }
}
impl ConfigurationRegister for AsyncOutputFreq {
    fn to_string(&self) -> String {
        self.adof.to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct YawPitchRoll {
    pub ypr: [f32; 3],
}
impl Register for YawPitchRoll {
    fn id(&self) -> u8 {
        8
    }
    fn name(&self) -> &'static str {
        "YawPitchRoll"
    }
    fn from_string(&mut self, payload: &str) -> Result<(), Error> {
        self.ypr = [parse_field(payload, 0)?, parse_field(payload, 1)?, parse_field(payload, 2)?];
        Ok(())
    }
}
impl MeasurementRegister for YawPitchRoll {}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Quaternion {
    pub quat: [f32; 4],
}
impl Register for Quaternion {
    fn id(&self) -> u8 {
        9
    }
    fn name(&self) -> &'static str {
        "Quaternion"
    }
    fn from_string(&mut self, payload: &str) -> Result<(), Error> {
        self.quat =
            [parse_field(payload, 0)?, parse_field(payload, 1)?, parse_field(payload, 2)?, parse_field(payload, 3)?];
        Ok(())
    }
}
impl MeasurementRegister for Quaternion {}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImuMeas {
    pub uncomp_mag: [f32; 3],
    pub uncomp_accel: [f32; 3],
    pub uncomp_gyro: [f32; 3],
    pub temperature: f32,
    pub pressure: f32,
}
impl Register for ImuMeas {
    fn id(&self) -> u8 {
        54
    }
    fn name(&self) -> &'static str {
        "ImuMeas"
    }
    fn from_string(&mut self, payload: &str) -> Result<(), Error> {
        self.uncomp_mag = [parse_field(payload, 0)?, parse_field(payload, 1)?, parse_field(payload, 2)?];
        self.uncomp_accel = [parse_field(payload, 3)?, parse_field(payload, 4)?, parse_field(payload, 5)?];
        self.uncomp_gyro = [parse_field(payload, 6)?, parse_field(payload, 7)?, parse_field(payload, 8)?];
        self.temperature = parse_field(payload, 9)?;
        self.pressure = parse_field(payload, 10)?;
        Ok(())
    }
}
impl MeasurementRegister for ImuMeas {}
