pub const MOTION_CONFIG_PAYLOAD_LEN: usize = 9;

/// Thingy motion service configuration.
///
/// Intervals are in milliseconds, `motion_processing_frequency` in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionConfig {
    pub step_counter_interval: u16,
    pub temperature_comp_interval: u16,
    pub magnetometer_comp_interval: u16,
    pub motion_processing_frequency: u16,
    pub wake_on_motion: u8,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            step_counter_interval: 100,
            temperature_comp_interval: 100,
            magnetometer_comp_interval: 100,
            motion_processing_frequency: 60,
            wake_on_motion: 1,
        }
    }
}

impl MotionConfig {
    pub fn with_motion_processing_frequency(mut self, frequency: u16) -> Self {
        self.motion_processing_frequency = frequency;
        self
    }

    pub fn with_step_counter_interval(mut self, interval: u16) -> Self {
        self.step_counter_interval = interval;
        self
    }

    pub fn with_temperature_comp_interval(mut self, interval: u16) -> Self {
        self.temperature_comp_interval = interval;
        self
    }

    pub fn with_magnetometer_comp_interval(mut self, interval: u16) -> Self {
        self.magnetometer_comp_interval = interval;
        self
    }

    pub fn with_wake_on_motion(mut self, wake_on_motion: bool) -> Self {
        self.wake_on_motion = wake_on_motion as u8;
        self
    }

    pub fn encode(&self) -> [u8; MOTION_CONFIG_PAYLOAD_LEN] {
        encode_motion_config(
            self.step_counter_interval,
            self.temperature_comp_interval,
            self.magnetometer_comp_interval,
            self.motion_processing_frequency,
            self.wake_on_motion,
        )
    }
}

pub fn encode_motion_config(
    step_counter_interval: u16,
    temperature_comp_interval: u16,
    magnetometer_comp_interval: u16,
    motion_processing_frequency: u16,
    wake_on_motion: u8,
) -> [u8; MOTION_CONFIG_PAYLOAD_LEN] {
    let mut buffer = [0u8; MOTION_CONFIG_PAYLOAD_LEN];
    (&mut buffer[0..2]).copy_from_slice(&step_counter_interval.to_le_bytes());
    (&mut buffer[2..4]).copy_from_slice(&temperature_comp_interval.to_le_bytes());
    (&mut buffer[4..6]).copy_from_slice(&magnetometer_comp_interval.to_le_bytes());
    (&mut buffer[6..8]).copy_from_slice(&motion_processing_frequency.to_le_bytes());
    buffer[8] = wake_on_motion;
    buffer
}
