//! Local segmentation engine
//!
//! Decodes an image, runs a U2-Net/ISNet style model on a letterboxed copy
//! and writes the prediction back as alpha channel of a PNG.

pub mod mask;
pub mod preprocessing;
#[cfg(feature = "tract")]
pub mod session;

pub use mask::{encode_png, SegmentationMask};
pub use preprocessing::{ImagePreprocessor, Letterbox};
#[cfg(feature = "tract")]
pub use session::SegmentationSession;
