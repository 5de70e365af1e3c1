//! Compile-time (group, field) -> (kind, assignment) table: a tagged
//! key/type/size table decoded without runtime reflection.

use crate::measurement::{CompositeMeasurement, RawObs, SatInfo, UtcTime};

/// A scalar or composite field kind. `Unk` fields are present on the wire
/// but opaque: their bytes are consumed and discarded, never mapped into a
/// composite-measurement slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Vec3F32,
    Vec4F32,
    Vec3F64,
    /// year, month, day, hour, minute (each u8) + second-fraction (u32 ns).
    Utc,
    /// One satellite sub-record: system, svid, flags, cn0 (each u8).
    Sat,
    /// One raw-observation sub-record: svid (u8), pseudorange (f64),
    /// carrier-phase (f64).
    Raw,
    /// Present but opaque: bytes are consumed and discarded.
    Unk(usize),
}

impl FieldKind {
    pub const fn size(self) -> usize {
        match self {
            FieldKind::U8 => 1,
            FieldKind::U16 => 2,
            FieldKind::U32 => 4,
            FieldKind::U64 => 8,
            FieldKind::F32 => 4,
            FieldKind::F64 => 8,
            FieldKind::Vec3F32 => 12,
            FieldKind::Vec4F32 => 16,
            FieldKind::Vec3F64 => 24,
            FieldKind::Utc => 9,
            FieldKind::Sat => 4,
            FieldKind::Raw => 17,
            FieldKind::Unk(n) => n,
        }
    }
}

pub struct Group {
    pub name: &'static str,
    pub fields: &'static [(&'static str, FieldKind)],
    pub assign: fn(&mut CompositeMeasurement, usize, &[u8]),
}

fn f32le(raw: &[u8]) -> f32 {
    f32::from_le_bytes(raw.try_into().unwrap())
}
fn f64le(raw: &[u8]) -> f64 {
    f64::from_le_bytes(raw.try_into().unwrap())
}
fn u64le(raw: &[u8]) -> u64 {
    u64::from_le_bytes(raw.try_into().unwrap())
}
fn u16le(raw: &[u8]) -> u16 {
    u16::from_le_bytes(raw.try_into().unwrap())
}
fn vec3f32(raw: &[u8]) -> [f32; 3] {
    [f32le(&raw[0..4]), f32le(&raw[4..8]), f32le(&raw[8..12])]
}
fn vec3f64(raw: &[u8]) -> [f64; 3] {
    [f64le(&raw[0..8]), f64le(&raw[8..16]), f64le(&raw[16..24])]
}
fn vec4f32(raw: &[u8]) -> [f32; 4] {
    [f32le(&raw[0..4]), f32le(&raw[4..8]), f32le(&raw[8..12]), f32le(&raw[12..16])]
}
fn utc_time(raw: &[u8]) -> UtcTime {
    UtcTime {
        year: raw[0],
        month: raw[1],
        day: raw[2],
        hour: raw[3],
        minute: raw[4],
        frac_sec_ns: u32::from_le_bytes(raw[5..9].try_into().unwrap()),
    }
}
fn sat_info(raw: &[u8]) -> SatInfo {
    SatInfo { system: raw[0], svid: raw[1], flags: raw[2], cn0: raw[3] }
}
fn raw_obs(raw: &[u8]) -> RawObs {
    RawObs { svid: raw[0], pseudorange: f64le(&raw[1..9]), carrier_phase: f64le(&raw[9..17]) }
}

fn assign_time(m: &mut CompositeMeasurement, field_idx: usize, raw: &[u8]) {
    match field_idx {
        0 => m.time.time_startup_ns = Some(u64le(raw)),
        1 => m.time.time_gps_ns = Some(u64le(raw)),
        _ => {},
    }
}

fn assign_imu(m: &mut CompositeMeasurement, field_idx: usize, raw: &[u8]) {
    match field_idx {
        0 => m.imu.uncomp_mag = Some(vec3f32(raw)),
        1 => m.imu.uncomp_accel = Some(vec3f32(raw)),
        2 => m.imu.uncomp_gyro = Some(vec3f32(raw)),
        3 => m.imu.temperature = Some(f32le(raw)),
        4 => m.imu.pressure = Some(f32le(raw)),
        _ => {},
    }
}

fn assign_attitude(m: &mut CompositeMeasurement, field_idx: usize, raw: &[u8]) {
    match field_idx {
        0 => m.attitude.ypr = Some(vec3f32(raw)),
        1 => m.attitude.quaternion = Some(vec4f32(raw)),
        _ => {},
    }
}

fn assign_ins(m: &mut CompositeMeasurement, field_idx: usize, raw: &[u8]) {
    match field_idx {
        0 => m.ins.ins_status = Some(u16le(raw)),
        1 => m.ins.pos_lla = Some(vec3f64(raw)),
        2 => m.ins.vel_ned = Some(vec3f32(raw)),
        _ => {},
    }
}

fn assign_gnss(m: &mut CompositeMeasurement, field_idx: usize, raw: &[u8]) {
    match field_idx {
        0 => m.gnss.fix = Some(raw[0]),
        1 => m.gnss.pos_lla = Some(vec3f64(raw)),
        2 => m.gnss.num_sats = Some(raw[0]),
        3 => m.gnss.time_utc = Some(utc_time(raw)),
        4 => m.gnss.sat_info = Some(sat_info(raw)),
        5 => m.gnss.raw_obs = Some(raw_obs(raw)),
        // field 6 (reserved) is FieldKind::Unk: present on the wire,
        // consumed, never mapped into a composite-measurement slot.
        _ => {},
    }
}

fn assign_gnss2(m: &mut CompositeMeasurement, field_idx: usize, raw: &[u8]) {
    match field_idx {
        0 => m.gnss2.fix = Some(raw[0]),
        1 => m.gnss2.pos_lla = Some(vec3f64(raw)),
        _ => {},
    }
}

pub static TIME_FIELDS: &[(&str, FieldKind)] = &[("timeStartup", FieldKind::U64), ("timeGps", FieldKind::U64)];
pub static IMU_FIELDS: &[(&str, FieldKind)] = &[
    ("uncompMag", FieldKind::Vec3F32),
    ("uncompAccel", FieldKind::Vec3F32),
    ("uncompGyro", FieldKind::Vec3F32),
    ("temperature", FieldKind::F32),
    ("pressure", FieldKind::F32),
];
pub static ATTITUDE_FIELDS: &[(&str, FieldKind)] =
    &[("ypr", FieldKind::Vec3F32), ("quaternion", FieldKind::Vec4F32)];
pub static INS_FIELDS: &[(&str, FieldKind)] =
    &[("insStatus", FieldKind::U16), ("posLla", FieldKind::Vec3F64), ("velNed", FieldKind::Vec3F32)];
pub static GNSS_FIELDS: &[(&str, FieldKind)] = &[
    ("fix", FieldKind::U8),
    ("posLla", FieldKind::Vec3F64),
    ("numSats", FieldKind::U8),
    ("timeUtc", FieldKind::Utc),
    ("satInfo", FieldKind::Sat),
    ("rawObs", FieldKind::Raw),
    ("reserved", FieldKind::Unk(2)),
];
pub static GNSS2_FIELDS: &[(&str, FieldKind)] = &[("fix", FieldKind::U8), ("posLla", FieldKind::Vec3F64)];

pub static ALL_GROUPS: &[Group] = &[
    Group { name: "Time", fields: TIME_FIELDS, assign: assign_time },
    Group { name: "Imu", fields: IMU_FIELDS, assign: assign_imu },
    Group { name: "Attitude", fields: ATTITUDE_FIELDS, assign: assign_attitude },
    Group { name: "Ins", fields: INS_FIELDS, assign: assign_ins },
    Group { name: "Gnss", fields: GNSS_FIELDS, assign: assign_gnss },
    Group { name: "Gnss2", fields: GNSS2_FIELDS, assign: assign_gnss2 },
];

pub fn group_by_index(idx: u8) -> Option<&'static Group> {
    ALL_GROUPS.get(idx as usize)
}
