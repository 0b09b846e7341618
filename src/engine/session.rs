//! Tract-backed segmentation session
//!
//! A session owns one optimized, runnable ONNX graph. It is loaded once at
//! startup and shared read-only between requests; running it is synchronous
//! and CPU bound.

use super::mask::{encode_png, SegmentationMask};
use super::preprocessing::ImagePreprocessor;
use crate::error::{BackendError, Result, ServiceError};
use crate::models::ModelInfo;
use image::GenericImageView;
use instant::Instant;
use ndarray::Array4;
use std::path::{Path, PathBuf};
use tract_onnx::prelude::*;

/// Type alias for the complex Tract model type to reduce complexity warnings
type TractModel = RunnableModel<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Loaded segmentation model ready for inference
pub struct SegmentationSession {
    model: &'static ModelInfo,
    path: PathBuf,
    plan: TractModel,
}

impl std::fmt::Debug for SegmentationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentationSession")
            .field("model", &self.model.name)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SegmentationSession {
    /// Load and optimize an ONNX model from disk
    ///
    /// # Errors
    /// - `ServiceError::Configuration` when the model file is missing
    /// - `ServiceError::Model` on ONNX parsing, optimization or plan creation failures
    pub fn load<P: AsRef<Path>>(model: &'static ModelInfo, path: P) -> Result<Self> {
        let path = path.as_ref();
        let load_start = Instant::now();

        if !path.is_file() {
            return Err(ServiceError::configuration(format!(
                "model '{}': file not found. Suggestions: download {}.onnx into ~/.u2net, pass --model-path",
                path.display(),
                model.name
            )));
        }

        tracing::info!(model = model.name, path = %path.display(), "Loading segmentation model");

        let size = model.preprocessing.target_size[0] as usize;
        let plan = onnx()
            .model_for_path(path)
            .and_then(|m| m.with_input_fact(0, f32::fact([1, 3, size, size]).into()))
            .map_err(|e| {
                ServiceError::model_error_with_context("parse", path, &e.to_string(), &[])
            })?
            .into_optimized()
            .map_err(|e| ServiceError::model(format!("Failed to optimize model: {e}")))?
            .into_runnable()
            .map_err(|e| ServiceError::model(format!("Failed to create runnable model: {e}")))?;

        tracing::info!(
            model = model.name,
            load_ms = load_start.elapsed().as_millis() as u64,
            "Segmentation model ready"
        );

        Ok(Self {
            model,
            path: path.to_path_buf(),
            plan,
        })
    }

    /// Model served by this session
    #[must_use]
    pub fn model(&self) -> &'static ModelInfo {
        self.model
    }

    /// Path the model was loaded from
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the background of an encoded image and return RGBA PNG bytes
    ///
    /// # Errors
    /// - `BackendError::Engine` for undecodable images, inference or encoding failures
    pub fn remove_background(&self, image_bytes: &[u8]) -> std::result::Result<Vec<u8>, BackendError> {
        let start = Instant::now();

        let image = image::load_from_memory(image_bytes)
            .map_err(|e| BackendError::engine(format!("Failed to decode image: {e}")))?;
        let original_dimensions = image.dimensions();

        let (input, letterbox) = ImagePreprocessor::preprocess(&image, &self.model.preprocessing);
        let prediction = self.infer(&input)?;

        let mask = SegmentationMask::from_prediction(&prediction, &letterbox, original_dimensions)
            .ok_or_else(|| {
                BackendError::engine(format!(
                    "Unexpected prediction shape {:?}",
                    prediction.shape()
                ))
            })?;
        let png = encode_png(mask.apply(&image))
            .map_err(|e| BackendError::engine(format!("Failed to encode PNG: {e}")))?;

        tracing::debug!(
            model = self.model.name,
            width = original_dimensions.0,
            height = original_dimensions.1,
            total_ms = start.elapsed().as_millis() as u64,
            "Local background removal completed"
        );
        Ok(png)
    }

    fn infer(&self, input: &Array4<f32>) -> std::result::Result<Array4<f32>, BackendError> {
        let data = input
            .as_slice()
            .ok_or_else(|| BackendError::engine("Input tensor is not contiguous"))?;
        let tensor = Tensor::from_shape(input.shape(), data)
            .map_err(|e| BackendError::engine(format!("Failed to build input tensor: {e}")))?;

        let outputs = self
            .plan
            .run(tvec![tensor.into()])
            .map_err(|e| BackendError::engine(format!("Tract inference failed: {e}")))?;

        // The first output is the fused prediction for both U2-Net and ISNet
        let output = outputs
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::engine("No output tensor found"))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| BackendError::engine(format!("Failed to convert output tensor: {e}")))?;

        let &[n, c, h, w] = view.shape() else {
            return Err(BackendError::engine(format!(
                "Expected 4D output tensor, got {}D",
                view.ndim()
            )));
        };
        Array4::from_shape_vec((n, c, h, w), view.iter().copied().collect())
            .map_err(|e| BackendError::engine(format!("Failed to reshape output tensor: {e}")))
    }
}
