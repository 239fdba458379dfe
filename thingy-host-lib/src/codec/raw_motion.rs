use chrono::{DateTime, Local};

use crate::error::{Result, ThingyError};

pub const RAW_MOTION_PAYLOAD_LEN: usize = 18;

/// accel xyz + gyro xyz, compass is not part of the model input
pub const FEATURES_PER_SAMPLE: usize = 6;

// Fixed-point divisors of the Thingy raw motion characteristic
pub const ACCEL_SCALE: f32 = 1024.0; // 2^10, g
pub const GYRO_SCALE: f32 = 32.0; // 2^5, deg/s
pub const COMPASS_SCALE: f32 = 16.0; // 2^4, uT

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: DateTime<Local>,
    pub accelerometer: [f32; 3],
    pub gyroscope: [f32; 3],
    pub compass: [f32; 3],
}

impl Sample {
    pub fn features(&self) -> [f32; FEATURES_PER_SAMPLE] {
        let [ax, ay, az] = self.accelerometer;
        let [gx, gy, gz] = self.gyroscope;
        [ax, ay, az, gx, gy, gz]
    }
}

fn read_axes(raw: &[u8], offset: usize, scale: f32) -> [f32; 3] {
    let mut axes = [0f32; 3];
    for (i, axis) in axes.iter_mut().enumerate() {
        let start = offset + i * 2;
        *axis = i16::from_le_bytes([raw[start], raw[start + 1]]) as f32 / scale;
    }
    axes
}

/// Decodes a raw motion notification, stamping it with the current local time.
pub fn decode_sample(raw: &[u8]) -> Result<Sample> {
    decode_sample_at(raw, Local::now())
}

pub fn decode_sample_at(raw: &[u8], timestamp: DateTime<Local>) -> Result<Sample> {
    if raw.len() != RAW_MOTION_PAYLOAD_LEN {
        return Err(ThingyError::MalformedPayload {
            expected: RAW_MOTION_PAYLOAD_LEN,
            actual: raw.len(),
        });
    }

    Ok(Sample {
        timestamp,
        accelerometer: read_axes(raw, 0, ACCEL_SCALE),
        gyroscope: read_axes(raw, 6, GYRO_SCALE),
        compass: read_axes(raw, 12, COMPASS_SCALE),
    })
}
