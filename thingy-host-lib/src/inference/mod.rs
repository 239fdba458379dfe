mod onnx_model;

use std::{fmt, path::Path, sync::Arc};

use log::debug;

use crate::{
    codec::{Sample, FEATURES_PER_SAMPLE},
    error::{Result, ThingyError},
    window::Window,
};

pub use onnx_model::OnnxModel;

/// Label order of the shipped activity model.
pub const DEFAULT_LABELS: [&str; 3] = ["mixing", "cutting", "idle"];

/// A black-box classifier: `(1, timesteps, features)` in, one score per class out.
pub trait ScoreModel: Send + Sync {
    /// `(timesteps, features)` the model accepts.
    fn input_shape(&self) -> (usize, usize);

    fn output_width(&self) -> usize;

    /// `input` is row-major with `timesteps * features` values.
    fn scores(&self, input: &[f32]) -> Result<Vec<f32>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassLabel(String);

impl ClassLabel {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone)]
pub struct InferenceAdapter {
    model: Arc<dyn ScoreModel>,
    labels: Vec<ClassLabel>,
    window_size: usize,
}

impl InferenceAdapter {
    /// Labels must be listed in the order the model was trained with; the
    /// count is checked against the model output width here, the order can't be.
    pub fn new(
        model: Arc<dyn ScoreModel>,
        labels: Vec<ClassLabel>,
        window_size: usize,
    ) -> Result<Self> {
        let model_shape = model.input_shape();
        if model_shape != (window_size, FEATURES_PER_SAMPLE) {
            return Err(ThingyError::ModelInputShapeMismatch {
                expected: model_shape,
                actual: (window_size, FEATURES_PER_SAMPLE),
            });
        }

        if model.output_width() != labels.len() {
            return Err(ThingyError::LabelCountMismatch {
                model_outputs: model.output_width(),
                labels: labels.len(),
            });
        }

        Ok(Self {
            model,
            labels,
            window_size,
        })
    }

    pub fn load<P: AsRef<Path>>(
        model_path: P,
        labels: &[String],
        window_size: usize,
    ) -> Result<Self> {
        let model = OnnxModel::load(model_path, window_size)?;
        Self::new(
            Arc::new(model),
            labels.iter().map(ClassLabel::new).collect(),
            window_size,
        )
    }

    pub fn labels(&self) -> &[ClassLabel] {
        &self.labels
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn classify(&self, window: &Window<Sample>) -> Result<ClassLabel> {
        self.classify_with_scores(window).map(|(label, _)| label)
    }

    pub fn classify_with_scores(&self, window: &Window<Sample>) -> Result<(ClassLabel, Vec<f32>)> {
        if window.len() != self.window_size {
            return Err(ThingyError::ModelInputShapeMismatch {
                expected: (self.window_size, FEATURES_PER_SAMPLE),
                actual: (window.len(), FEATURES_PER_SAMPLE),
            });
        }

        let scores = self.model.scores(&window.to_features())?;
        let best = scores
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(i, _)| i);
        let label = match best.and_then(|i| self.labels.get(i)) {
            Some(label) => label.clone(),
            None => {
                return Err(ThingyError::LabelCountMismatch {
                    model_outputs: scores.len(),
                    labels: self.labels.len(),
                })
            }
        };
        debug!("scores {:?} -> {}", scores, label);

        Ok((label, scores))
    }
}
