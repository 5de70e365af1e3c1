use thiserror::Error;

/// Synchronous errors: returned directly from the operation that produced them.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum Error {
    // Transport
    #[error("serial port is closed")]
    SerialPortClosed,
    #[error("invalid port name")]
    InvalidPortName,
    #[error("access to the serial port was denied")]
    AccessDenied,
    #[error("baud rate {0} is not supported by this transport")]
    UnsupportedBaudRate(u32),
    #[error("serial read failed")]
    SerialReadFailed,
    #[error("serial write failed")]
    SerialWriteFailed,
    #[error("unexpected serial error")]
    UnexpectedSerialError,

    // Buffering
    #[error("primary byte buffer is full")]
    PrimaryBufferFull,
    #[error("skipped-byte observer buffer is full")]
    SkippedByteBufferFull,
    #[error("received-byte observer buffer is full")]
    ReceivedByteBufferFull,
    #[error("measurement queue is full")]
    MeasurementQueueFull,

    // Command
    #[error("outstanding-command queue is full")]
    CommandQueueFull,
    #[error("identical command already outstanding")]
    CommandResent,
    #[error("timed out waiting for a response")]
    ResponseTimeout,
    #[error("received an unexpected message")]
    ReceivedUnexpectedMessage,
    #[error("received an invalid response")]
    ReceivedInvalidResponse,
    #[error("message subscriber capacity reached")]
    MessageSubscriberCapacityReached,

    // Sensor-reported synchronous (VNERR, mirrored 1:1)
    #[error("sensor reported: invalid checksum")]
    InvalidChecksum,
    #[error("sensor reported: invalid command")]
    InvalidCommand,
    #[error("sensor reported: not enough parameters")]
    NotEnoughParameters,
    #[error("sensor reported: too many parameters")]
    TooManyParameters,
    #[error("sensor reported: invalid parameter")]
    InvalidParameter,
    #[error("sensor reported: invalid register")]
    InvalidRegister,
    #[error("sensor reported: unauthorized access")]
    UnauthorizedAccess,
    #[error("sensor reported: insufficient baud rate")]
    InsufficientBaudRate,
}

/// Asynchronous errors: enqueued on the bounded async-error queue; the caller
/// drains them on its own schedule. Never returned directly from an operation.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum AsyncError {
    #[error("primary byte buffer overflowed")]
    PrimaryBufferFull,
    #[error("skipped-byte observer buffer overflowed")]
    SkippedByteBufferFull,
    #[error("received-byte observer buffer overflowed")]
    ReceivedByteBufferFull,
    #[error("measurement queue overflowed")]
    MeasurementQueueFull,
    #[error("async-error queue itself overflowed, some errors were dropped")]
    ErrorBufferOverflow,
    #[error("a command was removed from the outstanding queue after timing out")]
    CommandRemovedFromQueue,
    #[error("async-error queue overflowed locally, an error value was dropped")]
    AsyncQueueOverflow,

    // Sensor-reported asynchronous (VNERR codes 1, 10, 11, 255)
    #[error("sensor reported: hard fault")]
    HardFault,
    #[error("sensor reported: watchdog reset")]
    WatchdogReset,
    #[error("sensor reported: output buffer overflow")]
    OutputBufferOverflow,
}

/// The hex status code carried on a `$VNBLD,<hex-code>*XX\r\n` bootloader
/// response. `None` (code 0) means the streamed record was accepted; every
/// other code stops the component stream one way or another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootloaderStatus {
    None = 0,
    InvalidCommand = 1,
    InvalidRecordType = 2,
    InvalidByteCount = 3,
    InvalidMemoryAddress = 4,
    CommError = 5,
    InvalidHexFile = 6,
    DecryptionError = 7,
    InvalidBlockCrc = 8,
    InvalidProgramCrc = 9,
    InvalidProgramSize = 0x0A,
    MaxRetryCount = 0x0B,
    Timeout = 0x0C,
}

impl BootloaderStatus {
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Self::None,
            1 => Self::InvalidCommand,
            2 => Self::InvalidRecordType,
            3 => Self::InvalidByteCount,
            4 => Self::InvalidMemoryAddress,
            5 => Self::CommError,
            6 => Self::InvalidHexFile,
            7 => Self::DecryptionError,
            8 => Self::InvalidBlockCrc,
            9 => Self::InvalidProgramCrc,
            0x0A => Self::InvalidProgramSize,
            0x0B => Self::MaxRetryCount,
            0x0C => Self::Timeout,
            _ => return None,
        })
    }
}

/// A decimal VNERR code as carried on the wire (`$VNERR,<code>*XX`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VnErrCode {
    HardFault = 1,
    SerialBufferOverflow = 2,
    InvalidChecksum = 3,
    InvalidCommand = 4,
    NotEnoughParameters = 5,
    TooManyParameters = 6,
    InvalidParameter = 7,
    InvalidRegister = 8,
    UnauthorizedAccess = 9,
    WatchdogReset = 10,
    OutputBufferOverflow = 11,
    InsufficientBaudRate = 12,
    ErrorBufferOverflow = 255,
}

impl VnErrCode {
    pub fn from_decimal(code: u16) -> Option<Self> {
        Some(match code {
            1 => Self::HardFault,
            2 => Self::SerialBufferOverflow,
            3 => Self::InvalidChecksum,
            4 => Self::InvalidCommand,
            5 => Self::NotEnoughParameters,
            6 => Self::TooManyParameters,
            7 => Self::InvalidParameter,
            8 => Self::InvalidRegister,
            9 => Self::UnauthorizedAccess,
            10 => Self::WatchdogReset,
            11 => Self::OutputBufferOverflow,
            12 => Self::InsufficientBaudRate,
            255 => Self::ErrorBufferOverflow,
            _ => return None,
        })
    }

    /// `true` for codes 1, 10, 11, 255 (not paired with a command).
    pub fn is_asynchronous(self) -> bool {
        matches!(
            self,
            Self::HardFault | Self::WatchdogReset | Self::OutputBufferOverflow | Self::ErrorBufferOverflow
        )
    }

    pub fn as_sync_error(self) -> Option<Error> {
        Some(match self {
            Self::SerialBufferOverflow => Error::PrimaryBufferFull,
            Self::InvalidChecksum => Error::InvalidChecksum,
            Self::InvalidCommand => Error::InvalidCommand,
            Self::NotEnoughParameters => Error::NotEnoughParameters,
            Self::TooManyParameters => Error::TooManyParameters,
            Self::InvalidParameter => Error::InvalidParameter,
            Self::InvalidRegister => Error::InvalidRegister,
            Self::UnauthorizedAccess => Error::UnauthorizedAccess,
            Self::InsufficientBaudRate => Error::InsufficientBaudRate,
            Self::HardFault | Self::WatchdogReset | Self::OutputBufferOverflow | Self::ErrorBufferOverflow => {
                return None
            },
        })
    }

    pub fn as_async_error(self) -> Option<AsyncError> {
        Some(match self {
            Self::HardFault => AsyncError::HardFault,
            Self::WatchdogReset => AsyncError::WatchdogReset,
            Self::OutputBufferOverflow => AsyncError::OutputBufferOverflow,
            Self::ErrorBufferOverflow => AsyncError::ErrorBufferOverflow,
            _ => return None,
        })
    }
}
