mod mock_transport;

use std::{path::Path, sync::Arc, time::Duration};

use log::LevelFilter;

use crate::{
    inference::{test::MeanAccelModel, ClassLabel, InferenceAdapter, DEFAULT_LABELS},
    session::SessionOptions,
};

pub(crate) fn init_logger() {
    let _ = env_logger::builder()
        .filter_level(LevelFilter::Error)
        .filter(Some("thingy_host_lib"), LevelFilter::Trace)
        .is_test(true)
        .try_init();
}

/// Raw motion notification with the same raw value on every accel axis.
pub(crate) fn motion_payload(accel_raw: i16) -> Vec<u8> {
    let mut values = [0i16; 9];
    values[..3].fill(accel_raw);
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub(crate) fn classifying_options(output_dir: &Path) -> SessionOptions {
    let labels = DEFAULT_LABELS.iter().map(|l| ClassLabel::new(*l)).collect();
    let classifier =
        InferenceAdapter::new(Arc::new(MeanAccelModel { window_size: 60 }), labels, 60).unwrap();
    SessionOptions {
        classifier: Some(Arc::new(classifier)),
        output_dir: output_dir.to_path_buf(),
        ..Default::default()
    }
}

pub(crate) fn recording_options(output_dir: &Path) -> SessionOptions {
    SessionOptions {
        output_dir: output_dir.to_path_buf(),
        ..Default::default()
    }
}

/// Polls `condition` every 10ms, panics after 5s.
pub(crate) async fn wait_for<F: Fn() -> bool>(condition: F) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not met within 5s");
}
