#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # IMG.LY Background Removal Gateway
//!
//! An HTTP service that removes image backgrounds by trying a list of
//! backends in priority order: a local segmentation model running on Tract
//! (pure Rust ONNX inference) and any number of remote inference APIs.
//!
//! ## Request flow
//!
//! 1. The image arrives as a multipart upload, a base64 data URL, an
//!    `http(s)` URL or a raw body ([`ImageInput`]).
//! 2. [`ImageIntake::normalize`] turns it into a canonical byte buffer.
//! 3. [`Dispatcher::dispatch`] invokes backends one at a time, each call
//!    under a timeout, until one succeeds. Every failure is recorded.
//! 4. The PNG comes back as a data URL in JSON or as raw bytes.
//!
//! ## Library usage
//!
//! ```rust,no_run
//! use imgly_bgremove_gateway::{
//!     backends::RemoteBackend, Dispatcher, ImageInput, ImageIntake, RemovalBackend,
//! };
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = reqwest::Client::new();
//! let remote: Arc<dyn RemovalBackend> = Arc::new(RemoteBackend::new(
//!     "huggingface",
//!     "https://api-inference.huggingface.co/models/briaai/RMBG-1.4",
//!     std::env::var("HF_TOKEN").ok(),
//!     client,
//! ));
//! let dispatcher = Dispatcher::new(vec![remote], Duration::from_secs(60));
//!
//! let intake = ImageIntake::new(Duration::from_secs(30))?;
//! let bytes = intake
//!     .normalize(ImageInput::RemoteUrl("https://example.com/cat.jpg".into()))
//!     .await?;
//! let result = dispatcher.dispatch(&bytes).await?.into_result()?;
//! std::fs::write("cat.png", result.image)?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `tract` (default): local segmentation backend
//! - `cli` (default): `bgremove-gateway` binary and subscriber setup
//! - `webp-support` (default): WebP input decoding
//! - `tracing-json`: JSON log output

pub mod backends;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod input;
pub mod models;
pub mod multipart;
pub mod server;

#[cfg(feature = "cli")]
pub mod cli;
#[cfg(feature = "cli")]
pub mod tracing_config;

pub use backends::{BackendKind, RemovalBackend};
pub use config::{BackendSet, BackendSpec, ServiceConfig, ServiceConfigBuilder};
pub use dispatch::{dispatch, Dispatcher, RemovalResult, RemovalSuccess};
pub use error::{BackendError, BackendFailure, DecodeError, Result, ServiceError};
pub use input::{DataUrl, ImageInput, ImageIntake};
pub use models::{ModelCatalog, ModelInfo};
pub use server::{router, AppState};
