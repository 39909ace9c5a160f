//! Frame sources: a user-picked still image or a live capture device.

#[cfg(feature = "camera-nokhwa")]
pub mod camera;
pub mod file;
pub mod normalize;
#[cfg(feature = "camera-nokhwa")]
pub mod rgba_converter;

pub use file::SelectedImage;
pub use normalize::square_frame;

use crate::{error::DetectError, types::Frame};

/// Opens the capture device for a webcam session.
pub trait CameraProvider: Send {
    /// Fails with [`DetectError::DeviceUnavailable`] when permission is
    /// denied or no usable device exists.
    fn open(&mut self) -> Result<Box<dyn LiveCapture>, DetectError>;
}

/// A running capture stream, exclusively owned by one webcam session.
pub trait LiveCapture: Send + Sync {
    /// Sample the current video buffer as a still frame.
    fn snapshot(&self) -> anyhow::Result<Frame>;

    /// Stop the underlying device. Must be synchronous; the device is free
    /// once this returns.
    fn release(&self);
}

/// Placeholder provider for builds without a camera backend.
#[derive(Default)]
pub struct NoCamera;

impl CameraProvider for NoCamera {
    fn open(&mut self) -> Result<Box<dyn LiveCapture>, DetectError> {
        Err(DetectError::DeviceUnavailable(
            "no camera backend compiled in".to_string(),
        ))
    }
}

#[cfg(feature = "camera-nokhwa")]
pub fn default_camera_provider() -> Box<dyn CameraProvider> {
    Box::new(camera::NokhwaCameraProvider::default())
}

#[cfg(not(feature = "camera-nokhwa"))]
pub fn default_camera_provider() -> Box<dyn CameraProvider> {
    Box::new(NoCamera)
}
