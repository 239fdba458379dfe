use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{
    codec::MotionConfig,
    error::Result,
    inference::{InferenceAdapter, DEFAULT_LABELS},
    session::SessionOptions,
    window::DEFAULT_WINDOW_SIZE,
};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FleetConfig {
    pub addresses: Vec<String>,
    pub scan_timeout_secs: u64,
    pub sampling_frequency: u16,
    pub recording_name: String,
    pub output_dir: PathBuf,
    pub model: Option<ModelConfigSerde>,
    pub motion: MotionConfigSerde,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            addresses: Vec::new(),
            scan_timeout_secs: 10,
            sampling_frequency: 60,
            recording_name: "recording".into(),
            output_dir: PathBuf::from("."),
            model: None,
            motion: MotionConfigSerde::default(),
        }
    }
}

impl FleetConfig {
    pub fn scan_duration(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }

    /// Loads the model, if one is configured.
    pub fn session_options(&self) -> Result<SessionOptions> {
        let classifier = match &self.model {
            Some(model) => Some(Arc::new(InferenceAdapter::load(
                &model.path,
                &model.labels,
                model.window_size,
            )?)),
            None => None,
        };

        Ok(SessionOptions {
            classifier,
            output_dir: self.output_dir.clone(),
            motion_config: self.motion.clone().into(),
        })
    }
}

fn default_labels() -> Vec<String> {
    DEFAULT_LABELS.iter().map(|label| label.to_string()).collect()
}

fn default_window_size() -> usize {
    DEFAULT_WINDOW_SIZE
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ModelConfigSerde {
    pub path: PathBuf,
    /// Must match the order used in training.
    #[serde(default = "default_labels")]
    pub labels: Vec<String>,
    #[serde(default = "default_window_size")]
    pub window_size: usize,
}

/// Motion service settings other than the sampling frequency.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MotionConfigSerde {
    pub step_counter_interval: u16,
    pub temperature_comp_interval: u16,
    pub magnetometer_comp_interval: u16,
    pub wake_on_motion: bool,
}

impl Default for MotionConfigSerde {
    fn default() -> Self {
        let defaults = MotionConfig::default();
        Self {
            step_counter_interval: defaults.step_counter_interval,
            temperature_comp_interval: defaults.temperature_comp_interval,
            magnetometer_comp_interval: defaults.magnetometer_comp_interval,
            wake_on_motion: defaults.wake_on_motion != 0,
        }
    }
}

impl Into<MotionConfig> for MotionConfigSerde {
    fn into(self) -> MotionConfig {
        MotionConfig::default()
            .with_step_counter_interval(self.step_counter_interval)
            .with_temperature_comp_interval(self.temperature_comp_interval)
            .with_magnetometer_comp_interval(self.magnetometer_comp_interval)
            .with_wake_on_motion(self.wake_on_motion)
    }
}

pub fn parse_fleet_config(json: &str) -> Result<FleetConfig> {
    Ok(serde_json::from_str(json)?)
}

pub fn read_fleet_config<P: AsRef<Path>>(path: P) -> Result<FleetConfig> {
    let config = read_to_string(path)?;
    parse_fleet_config(&config)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_fleet_config("{}").unwrap();
        assert_eq!(config, FleetConfig::default());
        let motion: MotionConfig = config.motion.into();
        assert_eq!(motion, MotionConfig::default());
    }

    #[test]
    fn test_read_config() {
        let config = parse_fleet_config(
            r#"{
                "addresses": ["FD:CD:F2:2A:C9:6A", "C1:2B:33:44:55:66"],
                "sampling_frequency": 100,
                "recording_name": "kitchen",
                "model": { "path": "training/CNN_60.onnx" },
                "motion": { "wake_on_motion": false }
            }"#,
        )
        .unwrap();
        assert_eq!(config.addresses.len(), 2);
        assert_eq!(config.sampling_frequency, 100);
        assert_eq!(config.scan_timeout_secs, 10);
        let model = config.model.unwrap();
        assert_eq!(model.labels, vec!["mixing", "cutting", "idle"]);
        assert_eq!(model.window_size, 60);
        let motion: MotionConfig = config.motion.into();
        assert_eq!(motion.wake_on_motion, 0);
        assert_eq!(motion.step_counter_interval, 100);
    }

    #[test]
    fn test_invalid_config() {
        assert!(parse_fleet_config(r#"{ "sampling_frequency": "fast" }"#).is_err());
    }

    #[test]
    fn test_session_options_without_model() {
        let options = FleetConfig::default().session_options().unwrap();
        assert!(options.classifier.is_none());
    }
}
