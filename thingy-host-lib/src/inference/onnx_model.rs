use std::path::Path;

use log::info;
use tract_onnx::{
    prelude::*,
    tract_hir::{infer::Factoid, internal::DimLike},
};

use super::ScoreModel;
use crate::{
    codec::FEATURES_PER_SAMPLE,
    error::{Result, ThingyError},
};

type Plan = TypedRunnableModel<TypedModel>;

/// ONNX classifier executed with tract.
pub struct OnnxModel {
    plan: Plan,
    input_shape: (usize, usize),
    output_width: usize,
}

fn declared_input_shape(model: &InferenceModel) -> Option<(usize, usize)> {
    let shape = model.input_fact(0).ok()?.shape.concretize()?;
    let dims = shape
        .iter()
        .map(|dim| dim.to_usize().ok())
        .collect::<Option<Vec<usize>>>()?;
    match dims.as_slice() {
        [_batch, timesteps, features] => Some((*timesteps, *features)),
        _ => None,
    }
}

impl OnnxModel {
    pub fn load<P: AsRef<Path>>(path: P, window_size: usize) -> Result<Self> {
        let path = path.as_ref();
        let requested = (window_size, FEATURES_PER_SAMPLE);

        let model = tract_onnx::onnx().model_for_path(path)?;
        if let Some(declared) = declared_input_shape(&model) {
            if declared != requested {
                return Err(ThingyError::ModelInputShapeMismatch {
                    expected: declared,
                    actual: requested,
                });
            }
        }

        let plan = model
            .with_input_fact(0, f32::fact([1, window_size, FEATURES_PER_SAMPLE]).into())?
            .into_optimized()?
            .into_runnable()?;

        let mut onnx_model = Self {
            plan,
            input_shape: requested,
            output_width: 0,
        };

        // probe once so the output width is known before any label check
        let probe = vec![0f32; window_size * FEATURES_PER_SAMPLE];
        onnx_model.output_width = onnx_model.scores(&probe)?.len();
        info!(
            "Loaded model {:?}, input (1, {}, {}), {} classes",
            path, window_size, FEATURES_PER_SAMPLE, onnx_model.output_width
        );

        Ok(onnx_model)
    }
}

impl ScoreModel for OnnxModel {
    fn input_shape(&self) -> (usize, usize) {
        self.input_shape
    }

    fn output_width(&self) -> usize {
        self.output_width
    }

    fn scores(&self, input: &[f32]) -> Result<Vec<f32>> {
        let (timesteps, features) = self.input_shape;
        if input.len() != timesteps * features {
            return Err(ThingyError::ModelInputShapeMismatch {
                expected: self.input_shape,
                actual: (input.len() / features, features),
            });
        }

        let tensor = Tensor::from_shape(&[1, timesteps, features], input)?;
        let outputs = self.plan.run(tvec!(tensor.into()))?;
        let scores = outputs[0].as_slice::<f32>()?;
        Ok(scores.to_vec())
    }
}
