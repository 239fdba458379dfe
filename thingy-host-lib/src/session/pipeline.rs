use std::{io::Write as _, sync::Arc};

use log::{debug, warn};

use crate::{
    codec::{decode_sample, Sample},
    common::SampleCSVWriter,
    error::Result,
    inference::{ClassLabel, InferenceAdapter},
    window::WindowBuffer,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub samples_received: u64,
    pub samples_dropped: u64,
    pub windows_classified: u64,
    pub last_label: Option<ClassLabel>,
}

/// Decode → log → window → classify, run once per notification.
pub(crate) struct SamplePipeline {
    address: String,
    log: SampleCSVWriter,
    window: WindowBuffer<Sample>,
    classifier: Option<Arc<InferenceAdapter>>,
    stats: SessionStats,
}

impl SamplePipeline {
    pub(crate) fn new(
        address: String,
        log: SampleCSVWriter,
        window_size: usize,
        classifier: Option<Arc<InferenceAdapter>>,
    ) -> Self {
        Self {
            address,
            log,
            window: WindowBuffer::new(window_size),
            classifier,
            stats: SessionStats::default(),
        }
    }

    pub(crate) fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub(crate) fn buffered_samples(&self) -> usize {
        self.window.len()
    }

    /// Errors are reported and the offending sample is dropped; the stream goes on.
    pub(crate) fn handle_notification(&mut self, raw: &[u8]) {
        self.stats.samples_received += 1;

        let sample = match decode_sample(raw) {
            Ok(sample) => sample,
            Err(e) => {
                warn!("{}: dropping notification: {}", self.address, e);
                self.stats.samples_dropped += 1;
                return;
            }
        };

        if let Err(e) = self.log.write(&sample) {
            warn!("{}: failed to log sample: {}", self.address, e);
        }

        let Some(window) = self.window.push(sample) else {
            return;
        };
        let Some(classifier) = &self.classifier else {
            return;
        };

        match classifier.classify(&window) {
            Ok(label) => {
                self.stats.windows_classified += 1;
                print!(
                    "\r{} | {} - Prediction: {}",
                    self.address,
                    sample.timestamp.format("%Y-%m-%d %H:%M:%S%.6f"),
                    label
                );
                let _ = std::io::stdout().flush();
                debug!("{}: {}", self.address, label);
                self.stats.last_label = Some(label);
            }
            Err(e) => {
                warn!("{}: classification failed, window dropped: {}", self.address, e);
            }
        }
    }

    /// Discards the partial window and closes the log.
    pub(crate) fn close(&mut self) -> Result<()> {
        if !self.window.is_empty() {
            debug!(
                "{}: discarding {} unclassified samples",
                self.address,
                self.window.len()
            );
            self.window.clear();
        }
        self.log.close()
    }
}
