//! Client-side controller for a remote hand pose detection service.
//!
//! A still image or a live camera feed goes in, annotated results come
//! back. [`controller::Controller`] owns the mode state and the request
//! cycle; the `gui` feature wires it to a desktop window.

pub mod codec;
pub mod config;
pub mod controller;
pub mod error;
pub mod inference;
pub mod presenter;
pub mod source;
pub mod types;

#[cfg(feature = "gui")]
pub mod ui;

pub use config::Config;
pub use controller::{Controller, CycleState};
pub use error::{DetectError, NetworkError};
pub use inference::{Detector, HttpDetector, ModelInfo, Upload};
pub use presenter::{InfoView, PanelState, Presenter};
pub use types::{Detection, DetectionResult, Frame, Mode};
