//! Presentation state for the two panels.
//!
//! The presenter never talks to the network; it only turns results into
//! what the surface should show. Failures leave the displayed image alone.

use std::fmt;

use crate::{
    codec::{self, RgbaImage},
    error::DetectError,
    source::normalize,
    types::{Detection, DetectionResult, Frame, Mode},
};

pub const IMAGE_PLACEHOLDER: &str = "Select an image to start";
pub const WEBCAM_PLACEHOLDER: &str = "Start the webcam to see real-time detection";

#[derive(Clone, Debug, PartialEq)]
pub struct DetectionSummary {
    /// 1-based.
    pub ordinal: usize,
    pub confidence: f64,
    pub keypoints: usize,
    pub bbox: Option<[i64; 4]>,
}

impl DetectionSummary {
    pub fn from_detection(ordinal: usize, detection: &Detection) -> Self {
        Self {
            ordinal,
            confidence: detection.confidence,
            keypoints: detection.keypoints.len(),
            bbox: detection.bbox.map(|b| b.map(round_half_up)),
        }
    }

    pub fn confidence_percent(&self) -> String {
        format!("{:.2}%", self.confidence * 100.0)
    }

    fn detail_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Hand {}", self.ordinal),
            format!("Confidence: {}", self.confidence_percent()),
            format!("Keypoints: {}", self.keypoints),
        ];
        if let Some([x1, y1, x2, y2]) = self.bbox {
            lines.push(format!("Box: [{x1}, {y1}, {x2}, {y2}]"));
        }
        lines
    }

    fn compact_line(&self) -> String {
        format!(
            "Hand {}: {} | {} keypoints",
            self.ordinal,
            self.confidence_percent(),
            self.keypoints
        )
    }
}

// Halves round toward positive infinity.
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

#[derive(Clone, Debug, PartialEq)]
pub enum InfoView {
    Message(String),
    Found(Vec<DetectionSummary>),
    NoneFound,
    /// Full line as shown, e.g. `Error: HTTP error! status: 500`.
    Error(String),
}

impl InfoView {
    pub fn is_error(&self) -> bool {
        matches!(self, InfoView::Error(_))
    }
}

#[derive(Clone, Debug)]
pub struct DisplayImage {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl From<RgbaImage> for DisplayImage {
    fn from(img: RgbaImage) -> Self {
        Self {
            rgba: img.rgba,
            width: img.width,
            height: img.height,
        }
    }
}

#[derive(Debug)]
pub struct PanelState {
    mode: Mode,
    /// Image-mode only: the selected file, shown before any request.
    pub preview: Option<DisplayImage>,
    /// Annotated image from the most recent successful result.
    pub image: Option<DisplayImage>,
    pub info: InfoView,
    revision: u64,
}

impl PanelState {
    fn new(mode: Mode) -> Self {
        Self {
            mode,
            preview: None,
            image: None,
            info: InfoView::Message(placeholder(mode).to_string()),
            revision: 0,
        }
    }

    /// Bumped whenever an image changes, so surfaces can cache textures.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn info_lines(&self) -> Vec<String> {
        match (&self.info, self.mode) {
            (InfoView::Message(msg), _) => vec![msg.clone()],
            (InfoView::Error(line), _) => vec![line.clone()],
            (InfoView::NoneFound, Mode::Image) => {
                vec!["No hands detected in the image".to_string()]
            }
            (InfoView::NoneFound, Mode::Webcam) => vec!["No hands detected".to_string()],
            (InfoView::Found(items), Mode::Image) => {
                let mut lines = vec![format!("Found {} hand(s)", items.len())];
                lines.extend(items.iter().flat_map(DetectionSummary::detail_lines));
                lines
            }
            (InfoView::Found(items), Mode::Webcam) => {
                let mut lines = vec![format!("Hands detected: {}", items.len())];
                lines.extend(items.iter().map(DetectionSummary::compact_line));
                lines
            }
        }
    }

    fn set_image(&mut self, image: Option<DisplayImage>) {
        self.image = image;
        self.revision += 1;
    }
}

impl fmt::Display for PanelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.info_lines().join("\n"))
    }
}

fn placeholder(mode: Mode) -> &'static str {
    match mode {
        Mode::Image => IMAGE_PLACEHOLDER,
        Mode::Webcam => WEBCAM_PLACEHOLDER,
    }
}

#[derive(Debug)]
pub struct Presenter {
    image_panel: PanelState,
    webcam_panel: PanelState,
    overlay_size: u32,
}

impl Presenter {
    /// `overlay_size` is the square the webcam overlay is scaled to.
    pub fn new(overlay_size: u32) -> Self {
        Self {
            image_panel: PanelState::new(Mode::Image),
            webcam_panel: PanelState::new(Mode::Webcam),
            overlay_size,
        }
    }

    pub fn panel(&self, mode: Mode) -> &PanelState {
        match mode {
            Mode::Image => &self.image_panel,
            Mode::Webcam => &self.webcam_panel,
        }
    }

    fn panel_mut(&mut self, mode: Mode) -> &mut PanelState {
        match mode {
            Mode::Image => &mut self.image_panel,
            Mode::Webcam => &mut self.webcam_panel,
        }
    }

    pub fn present(&mut self, mode: Mode, result: &DetectionResult) {
        match result {
            DetectionResult::Success { image, detections } => {
                match self.decode_for(mode, image) {
                    Ok(decoded) => self.panel_mut(mode).set_image(Some(decoded)),
                    Err(err) => log::warn!("annotated image could not be displayed: {err:#}"),
                }
                let info = if detections.is_empty() {
                    InfoView::NoneFound
                } else {
                    InfoView::Found(
                        detections
                            .iter()
                            .enumerate()
                            .map(|(idx, d)| DetectionSummary::from_detection(idx + 1, d))
                            .collect(),
                    )
                };
                self.panel_mut(mode).info = info;
            }
            DetectionResult::Failure { error } => {
                self.panel_mut(mode).info = InfoView::Error(format!("Error: {error}"));
            }
        }
    }

    pub fn present_error(&mut self, mode: Mode, err: &DetectError) {
        let line = match err {
            DetectError::DeviceUnavailable(msg) => format!("Error accessing webcam: {msg}"),
            other => format!("Error: {other}"),
        };
        self.panel_mut(mode).info = InfoView::Error(line);
    }

    pub fn show_message(&mut self, mode: Mode, message: impl Into<String>) {
        self.panel_mut(mode).info = InfoView::Message(message.into());
    }

    pub fn show_placeholder(&mut self, mode: Mode) {
        self.show_message(mode, placeholder(mode));
    }

    pub fn show_preview(&mut self, preview: Option<RgbaImage>) {
        let panel = self.panel_mut(Mode::Image);
        panel.preview = preview.map(DisplayImage::from);
        panel.revision += 1;
    }

    /// Drop every image and text on a panel.
    pub fn reset(&mut self, mode: Mode) {
        let panel = self.panel_mut(mode);
        panel.preview = None;
        panel.set_image(None);
        panel.info = InfoView::Message(placeholder(mode).to_string());
    }

    fn decode_for(&self, mode: Mode, jpeg: &[u8]) -> anyhow::Result<DisplayImage> {
        let decoded = codec::decode_jpeg_rgba(jpeg)?;
        if mode == Mode::Image {
            return Ok(decoded.into());
        }
        let frame = Frame::new(decoded.rgba, decoded.width, decoded.height);
        let scaled = normalize::square_frame(&frame, self.overlay_size)?;
        Ok(DisplayImage {
            rgba: scaled.rgba,
            width: scaled.width,
            height: scaled.height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::NetworkError, types::Frame};

    fn jpeg(width: u32, height: u32) -> Vec<u8> {
        let frame = Frame::new(vec![90u8; (width * height * 4) as usize], width, height);
        codec::encode_jpeg(&frame, 80).unwrap()
    }

    fn scenario_result() -> DetectionResult {
        DetectionResult::Success {
            image: jpeg(16, 8),
            detections: vec![Detection {
                confidence: 0.97,
                keypoints: vec![[1.0, 2.0], [3.0, 4.0]],
                bbox: Some([10.0, 20.0, 110.0, 220.0]),
            }],
        }
    }

    #[test]
    fn image_mode_success_lists_each_hand() {
        let mut presenter = Presenter::new(512);
        presenter.present(Mode::Image, &scenario_result());

        let panel = presenter.panel(Mode::Image);
        assert_eq!(
            panel.info_lines(),
            vec![
                "Found 1 hand(s)",
                "Hand 1",
                "Confidence: 97.00%",
                "Keypoints: 2",
                "Box: [10, 20, 110, 220]",
            ]
        );
        let image = panel.image.as_ref().unwrap();
        assert_eq!((image.width, image.height), (16, 8));
    }

    #[test]
    fn webcam_overlay_is_scaled_to_square() {
        let mut presenter = Presenter::new(64);
        presenter.present(Mode::Webcam, &scenario_result());

        let panel = presenter.panel(Mode::Webcam);
        assert_eq!(
            panel.info_lines(),
            vec!["Hands detected: 1", "Hand 1: 97.00% | 2 keypoints"]
        );
        let image = panel.image.as_ref().unwrap();
        assert_eq!((image.width, image.height), (64, 64));
    }

    #[test]
    fn zero_detections_is_not_an_error() {
        let mut presenter = Presenter::new(512);
        presenter.present(
            Mode::Image,
            &DetectionResult::Success {
                image: jpeg(4, 4),
                detections: Vec::new(),
            },
        );
        let panel = presenter.panel(Mode::Image);
        assert_eq!(panel.info, InfoView::NoneFound);
        assert!(!panel.info.is_error());
        assert_eq!(panel.info_lines(), vec!["No hands detected in the image"]);
    }

    #[test]
    fn failure_keeps_previous_image() {
        let mut presenter = Presenter::new(512);
        presenter.present(Mode::Image, &scenario_result());
        let revision = presenter.panel(Mode::Image).revision();

        presenter.present_error(Mode::Image, &DetectError::from(NetworkError::Status(500)));

        let panel = presenter.panel(Mode::Image);
        assert!(panel.image.is_some());
        assert_eq!(panel.revision(), revision);
        assert_eq!(panel.info_lines(), vec!["Error: HTTP error! status: 500"]);
    }

    #[test]
    fn camera_failure_has_its_own_wording() {
        let mut presenter = Presenter::new(512);
        presenter.present_error(
            Mode::Webcam,
            &DetectError::DeviceUnavailable("permission denied".to_string()),
        );
        assert_eq!(
            presenter.panel(Mode::Webcam).info_lines(),
            vec!["Error accessing webcam: permission denied"]
        );
    }

    #[test]
    fn reset_restores_placeholder() {
        let mut presenter = Presenter::new(512);
        presenter.present(Mode::Image, &scenario_result());
        presenter.reset(Mode::Image);
        let panel = presenter.panel(Mode::Image);
        assert!(panel.image.is_none() && panel.preview.is_none());
        assert_eq!(panel.info_lines(), vec![IMAGE_PLACEHOLDER]);
    }

    #[test]
    fn box_rounding_follows_math_round() {
        let summary = DetectionSummary::from_detection(
            1,
            &Detection {
                confidence: 0.5,
                keypoints: Vec::new(),
                bbox: Some([10.5, -2.5, 99.49, 0.0]),
            },
        );
        assert_eq!(summary.bbox, Some([11, -2, 99, 0]));
    }

    #[test]
    fn missing_box_is_omitted() {
        let summary = DetectionSummary::from_detection(
            2,
            &Detection {
                confidence: 0.123456,
                keypoints: Vec::new(),
                bbox: None,
            },
        );
        assert_eq!(
            summary.detail_lines(),
            vec!["Hand 2", "Confidence: 12.35%", "Keypoints: 0"]
        );
    }
}
