use std::time::Duration;

/// Prioritized autobaud list: 115200 first, as the common case, then the
/// remaining supported rates.
pub const AUTOBAUD_ORDER: &[u32] = &[
    115_200, 921_600, 9_600, 19_200, 38_400, 57_600, 128_000, 230_400, 460_800,
];

/// All baud rates the serial transport HAL must support.
pub const SUPPORTED_BAUD_RATES: &[u32] = &[
    9_600, 19_200, 38_400, 57_600, 115_200, 128_000, 230_400, 460_800, 921_600,
];

pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Every tunable constant named across §5/§6/§8, gathered into one struct so
/// an application overrides one field via a builder instead of threading a
/// dozen constructor arguments.
#[derive(Debug, Clone)]
pub struct SensorConfig {
    pub main_buffer_capacity: usize,
    pub skipped_byte_buffer_capacity: usize,
    pub received_byte_buffer_capacity: usize,
    pub command_queue_capacity: usize,
    pub measurement_queue_capacity: usize,
    pub subscriber_queue_capacity: usize,
    pub async_error_queue_capacity: usize,
    pub listen_sleep_duration: Duration,
    pub default_command_timeout: Duration,
    pub command_send_retries_allowed: u32,
    pub baud_change_settle_duration: Duration,
    pub reset_recovery_duration: Duration,
    pub restore_factory_recovery_duration: Duration,
    pub bootloader_autobaud_retries: u32,
    pub bootloader_autobaud_listen_window: Duration,
    pub bootloader_baud_rate: u32,
    pub fb_reassembly_buffer_capacity: usize,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            main_buffer_capacity: 4096,
            skipped_byte_buffer_capacity: 1024,
            received_byte_buffer_capacity: 1024,
            command_queue_capacity: 10,
            measurement_queue_capacity: 100,
            subscriber_queue_capacity: 100,
            async_error_queue_capacity: 100,
            listen_sleep_duration: Duration::from_millis(10),
            default_command_timeout: Duration::from_millis(500),
            command_send_retries_allowed: 3,
            baud_change_settle_duration: Duration::from_millis(50),
            reset_recovery_duration: Duration::from_millis(500),
            restore_factory_recovery_duration: Duration::from_millis(2000),
            bootloader_autobaud_retries: 40,
            bootloader_autobaud_listen_window: Duration::from_millis(50),
            bootloader_baud_rate: DEFAULT_BAUD_RATE,
            fb_reassembly_buffer_capacity: 4096,
        }
    }
}

impl SensorConfig {
    pub fn builder() -> SensorConfigBuilder {
        SensorConfigBuilder { cfg: Self::default() }
    }
}

/// Builder so one field can be overridden without repeating all the others.
pub struct SensorConfigBuilder {
    cfg: SensorConfig,
}

macro_rules! with_field {
    ($name:ident, $ty:ty) => {
        pub fn $name(mut self, value: $ty) -> Self {
            self.cfg.$name = value;
            self
        }
    };
}

impl SensorConfigBuilder {
    with_field!(main_buffer_capacity, usize);
    with_field!(skipped_byte_buffer_capacity, usize);
    with_field!(received_byte_buffer_capacity, usize);
    with_field!(command_queue_capacity, usize);
    with_field!(measurement_queue_capacity, usize);
    with_field!(subscriber_queue_capacity, usize);
    with_field!(async_error_queue_capacity, usize);
    with_field!(listen_sleep_duration, Duration);
    with_field!(default_command_timeout, Duration);
    with_field!(command_send_retries_allowed, u32);
    with_field!(baud_change_settle_duration, Duration);
    with_field!(reset_recovery_duration, Duration);
    with_field!(restore_factory_recovery_duration, Duration);
    with_field!(bootloader_autobaud_retries, u32);
    with_field!(bootloader_autobaud_listen_window, Duration);
    with_field!(bootloader_baud_rate, u32);
    with_field!(fb_reassembly_buffer_capacity, usize);

    pub fn build(self) -> SensorConfig {
        self.cfg
    }
}
