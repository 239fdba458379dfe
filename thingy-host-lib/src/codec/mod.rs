mod led_status;
mod motion_config;
mod raw_motion;

pub use led_status::{encode_led_status, LedStatus, LED_PAYLOAD_LEN};
pub use motion_config::{encode_motion_config, MotionConfig, MOTION_CONFIG_PAYLOAD_LEN};
pub use raw_motion::{
    decode_sample, decode_sample_at, Sample, ACCEL_SCALE, COMPASS_SCALE, FEATURES_PER_SAMPLE,
    GYRO_SCALE, RAW_MOTION_PAYLOAD_LEN,
};
