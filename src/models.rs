//! Catalog of supported segmentation models
//!
//! Each entry carries the preprocessing parameters the local engine needs
//! (square input size and per-channel normalization) together with the
//! descriptive fields advertised on the `/models` endpoint.

use crate::error::{Result, ServiceError};
use serde::Serialize;
use std::path::PathBuf;

/// Name of the model used when none is configured
pub const DEFAULT_MODEL: &str = "u2net";

/// Directory (below the home directory) where model files are looked up by default
pub const MODEL_HOME_DIR: &str = ".u2net";

/// Preprocessing parameters for a model
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessingConfig {
    /// Target input size `[height, width]`
    pub target_size: [u32; 2],
    /// Normalization mean values for RGB channels
    pub normalization_mean: [f32; 3],
    /// Normalization standard deviation values for RGB channels
    pub normalization_std: [f32; 3],
}

/// Static description of a supported model
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    pub name: &'static str,
    pub description: &'static str,
    /// Download size label, as shown to clients
    pub size: &'static str,
    pub preprocessing: PreprocessingConfig,
}

/// Serializable model summary for the `/models` endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub name: String,
    pub description: String,
    pub size: String,
}

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

static CATALOG: &[ModelInfo] = &[
    ModelInfo {
        name: "u2net",
        description: "General use, best quality",
        size: "176MB",
        preprocessing: PreprocessingConfig {
            target_size: [320, 320],
            normalization_mean: IMAGENET_MEAN,
            normalization_std: IMAGENET_STD,
        },
    },
    ModelInfo {
        name: "u2netp",
        description: "Lighter version of u2net",
        size: "4.7MB",
        preprocessing: PreprocessingConfig {
            target_size: [320, 320],
            normalization_mean: IMAGENET_MEAN,
            normalization_std: IMAGENET_STD,
        },
    },
    ModelInfo {
        name: "u2net_human_seg",
        description: "Human segmentation",
        size: "176MB",
        preprocessing: PreprocessingConfig {
            target_size: [320, 320],
            normalization_mean: IMAGENET_MEAN,
            normalization_std: IMAGENET_STD,
        },
    },
    ModelInfo {
        name: "isnet-general-use",
        description: "General purpose ISNet",
        size: "43MB",
        preprocessing: PreprocessingConfig {
            target_size: [1024, 1024],
            normalization_mean: [0.5, 0.5, 0.5],
            normalization_std: [1.0, 1.0, 1.0],
        },
    },
];

/// Lookup helpers over the built-in model catalog
pub struct ModelCatalog;

impl ModelCatalog {
    /// All known models, in advertised order
    #[must_use]
    pub fn all() -> &'static [ModelInfo] {
        CATALOG
    }

    /// Find a model by name (case-insensitive)
    ///
    /// # Errors
    /// - Unknown model name
    pub fn get(name: &str) -> Result<&'static ModelInfo> {
        CATALOG
            .iter()
            .find(|info| info.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                let known: Vec<&str> = CATALOG.iter().map(|info| info.name).collect();
                ServiceError::configuration(format!(
                    "Unknown model '{name}'. Available models: {}",
                    known.join(", ")
                ))
            })
    }

    /// Summaries for the `/models` endpoint
    #[must_use]
    pub fn summaries() -> Vec<ModelSummary> {
        CATALOG
            .iter()
            .map(|info| ModelSummary {
                name: info.name.to_string(),
                description: info.description.to_string(),
                size: info.size.to_string(),
            })
            .collect()
    }

    /// Default on-disk location of a model file: `~/.u2net/<name>.onnx`
    ///
    /// Falls back to the current directory when no home directory is known.
    #[must_use]
    pub fn default_model_path(name: &str) -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(MODEL_HOME_DIR)
            .join(format!("{name}.onnx"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_lists_advertised_models() {
        let names: Vec<&str> = ModelCatalog::all().iter().map(|m| m.name).collect();
        assert_eq!(
            names,
            vec!["u2net", "u2netp", "u2net_human_seg", "isnet-general-use"]
        );
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let info = ModelCatalog::get("U2NET").unwrap();
        assert_eq!(info.name, "u2net");
        assert_eq!(info.preprocessing.target_size, [320, 320]);
    }

    #[test]
    fn test_unknown_model_lists_alternatives() {
        let err = ModelCatalog::get("modnet").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("modnet"));
        assert!(message.contains("isnet-general-use"));
    }

    #[test]
    fn test_isnet_uses_half_normalization() {
        let info = ModelCatalog::get("isnet-general-use").unwrap();
        assert_eq!(info.preprocessing.target_size, [1024, 1024]);
        assert_eq!(info.preprocessing.normalization_mean, [0.5, 0.5, 0.5]);
        assert_eq!(info.preprocessing.normalization_std, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_default_model_path() {
        let path = ModelCatalog::default_model_path("u2netp");
        assert!(path.ends_with(".u2net/u2netp.onnx"));
    }

    #[test]
    fn test_summaries_match_catalog() {
        let summaries = ModelCatalog::summaries();
        assert_eq!(summaries.len(), ModelCatalog::all().len());
        assert_eq!(summaries[0].size, "176MB");
    }
}
