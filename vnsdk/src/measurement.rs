//! Composite measurement: an aggregate of parsed fields from one frame,
//! grouped by category. Each field is independently present/absent; absent
//! means "not populated by the current frame". Values are passed through
//! verbatim in the sensor's own units/frames — this crate never
//! reinterprets them.

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimeFields {
    pub time_startup_ns: Option<u64>,
    pub time_gps_ns: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ImuFields {
    pub uncomp_mag: Option<[f32; 3]>,
    pub uncomp_accel: Option<[f32; 3]>,
    pub uncomp_gyro: Option<[f32; 3]>,
    pub temperature: Option<f32>,
    pub pressure: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AttitudeFields {
    pub ypr: Option<[f32; 3]>,
    pub quaternion: Option<[f32; 4]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InsFields {
    pub ins_status: Option<u16>,
    pub pos_lla: Option<[f64; 3]>,
    pub vel_ned: Option<[f32; 3]>,
}

/// UTC time sub-record: year/month/day/hour/minute (each `u8`) plus a
/// nanosecond fraction-of-second (`u32`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UtcTime {
    pub year: u8,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub frac_sec_ns: u32,
}

/// One satellite's tracking info: constellation, space-vehicle id, status
/// flags, and carrier-to-noise ratio (each `u8`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SatInfo {
    pub system: u8,
    pub svid: u8,
    pub flags: u8,
    pub cn0: u8,
}

/// One raw pseudorange/carrier-phase observation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawObs {
    pub svid: u8,
    pub pseudorange: f64,
    pub carrier_phase: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GnssFields {
    pub fix: Option<u8>,
    pub pos_lla: Option<[f64; 3]>,
    pub num_sats: Option<u8>,
    pub time_utc: Option<UtcTime>,
    pub sat_info: Option<SatInfo>,
    pub raw_obs: Option<RawObs>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Gnss2Fields {
    pub fix: Option<u8>,
    pub pos_lla: Option<[f64; 3]>,
}

/// A record of optional fields grouped by category. Fields carry values in
/// the exact units and frames documented by the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CompositeMeasurement {
    pub time: TimeFields,
    pub imu: ImuFields,
    pub attitude: AttitudeFields,
    pub ins: InsFields,
    pub gnss: GnssFields,
    pub gnss2: Gnss2Fields,
}

impl CompositeMeasurement {
    pub fn new() -> Self {
        Self::default()
    }
}
