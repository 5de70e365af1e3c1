#![cfg_attr(docrs, feature(doc_cfg))]

//! Host-side SDK for communicating with VectorNav-family inertial
//! navigation sensors over a serial link: ring-buffered byte intake, an
//! ASCII/Binary-FA/Binary-FB packet synchronizer, a command/response
//! processor, a typed register model, and a blocking/cooperative sensor
//! façade.

pub use crate::{
    ascii::{FindResult as AsciiFindResult, HeaderString},
    binary_fa::{FieldKind, FindResult as BinaryFaFindResult},
    binary_fb::{FindResult as BinaryFbFindResult, ReassembleOutcome},
    buffer::RingBuffer,
    clock::{Clock, SystemClock},
    command::{Command, CommandKind, CommandQueue, Processor, RegisterOutcome},
    config::{SensorConfig, SensorConfigBuilder, AUTOBAUD_ORDER, DEFAULT_BAUD_RATE, SUPPORTED_BAUD_RATES},
    error::{AsyncError, BootloaderStatus, Error, VnErrCode},
    measurement::CompositeMeasurement,
    queue::BoundedQueue,
    sensor::{SendMode, Sensor},
    subscription::{BinaryFilter, Filter, FilterMode, Subscription},
    transport::SerialTransport,
};

#[cfg(feature = "serial")]
pub use crate::transport::SerialPortTransport;

#[cfg(any(test, feature = "test-util"))]
pub use crate::{clock::FakeClock, transport::MockTransport};

pub mod ascii;
pub mod binary_fa;
pub mod binary_fb;
mod buffer;
mod checksum;
pub mod clock;
pub mod command;
pub mod config;
mod dispatch;
pub mod error;
pub mod firmware;
pub mod measurement;
pub mod queue;
pub mod registers;
pub mod sensor;
pub mod subscription;
pub mod sync;
pub mod transport;
