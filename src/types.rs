use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
pub struct Frame {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// When the pixels were captured or loaded.
    pub timestamp: Instant,
}

impl Frame {
    pub fn new(rgba: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            rgba,
            width,
            height,
            timestamp: Instant::now(),
        }
    }

    pub fn age(&self) -> Duration {
        self.timestamp.elapsed()
    }

    pub fn expected_len(&self) -> usize {
        (self.width as usize)
            .saturating_mul(self.height as usize)
            .saturating_mul(4)
    }
}

/// Which of the two input modes currently owns the controller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Image,
    Webcam,
}

impl Mode {
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Image => "Image",
            Mode::Webcam => "Webcam",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    pub keypoints: Vec<[f64; 2]>,
    /// `[x1, y1, x2, y2]` in source image pixels.
    pub bbox: Option<[f64; 4]>,
}

/// One request/response pair as seen by the presenter.
///
/// The service reports failure in-band (`success: false`); malformed bodies
/// are folded into `Failure` as well so a single bad reply never surfaces as
/// a transport error.
#[derive(Clone, Debug, PartialEq)]
pub enum DetectionResult {
    Success {
        /// Annotated JPEG bytes.
        image: Vec<u8>,
        detections: Vec<Detection>,
    },
    Failure {
        error: String,
    },
}

impl DetectionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, DetectionResult::Success { .. })
    }

    pub fn detections(&self) -> &[Detection] {
        match self {
            DetectionResult::Success { detections, .. } => detections,
            DetectionResult::Failure { .. } => &[],
        }
    }
}
