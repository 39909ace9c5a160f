//! HTTP client for the remote detection service.
//!
//! One call is one multipart request/response exchange. Transport failures
//! and non-2xx statuses come back as [`NetworkError`]; a 2xx reply that does
//! not parse is folded into [`DetectionResult::Failure`] so a single bad body
//! cannot take down the webcam loop.

use anyhow::Context;
use base64::Engine as _;
use reqwest::blocking::{Client, multipart};
use serde::Deserialize;

use crate::{
    codec,
    config::Config,
    error::{DetectError, NetworkError},
    types::{Detection, DetectionResult, Frame},
};

pub const MALFORMED_RESPONSE_MESSAGE: &str = "Malformed response from detection service";
const UNSPECIFIED_FAILURE_MESSAGE: &str = "Detection service reported a failure";
const FRAME_FILE_NAME: &str = "frame.jpg";

/// Payload for the `file` field of a detect request.
#[derive(Clone, Debug)]
pub struct Upload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn jpeg_frame(frame: &Frame, quality: u8) -> anyhow::Result<Self> {
        let bytes = codec::encode_jpeg(frame, quality).context("failed to encode camera frame")?;
        Ok(Self {
            file_name: FRAME_FILE_NAME.to_string(),
            mime: "image/jpeg".to_string(),
            bytes,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ModelInfo {
    pub model_name: String,
    #[serde(default)]
    pub confidence_threshold: Option<f64>,
    #[serde(default)]
    pub device: Option<String>,
}

impl ModelInfo {
    pub fn summary(&self) -> String {
        let mut details = Vec::new();
        if let Some(device) = &self.device {
            details.push(device.clone());
        }
        if let Some(threshold) = self.confidence_threshold {
            details.push(format!("conf {threshold:.2}"));
        }
        if details.is_empty() {
            self.model_name.clone()
        } else {
            format!("{} ({})", self.model_name, details.join(", "))
        }
    }
}

pub trait Detector: Send + Sync + 'static {
    fn detect(&self, upload: &Upload) -> Result<DetectionResult, DetectError>;

    fn health(&self) -> Result<(), DetectError> {
        Ok(())
    }

    fn model_info(&self) -> Result<Option<ModelInfo>, DetectError> {
        Ok(None)
    }
}

pub struct HttpDetector {
    client: Client,
    detect_url: String,
    model_info_url: String,
    health_url: Option<String>,
}

impl HttpDetector {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("failed to build HTTP client")?;
        let health_url = match config.health_url() {
            Ok(url) => Some(url),
            Err(err) => {
                log::warn!("no health endpoint for {}: {err:#}", config.api_base);
                None
            }
        };
        Ok(Self {
            client,
            detect_url: config.detect_url(),
            model_info_url: config.model_info_url(),
            health_url,
        })
    }

    fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T, DetectError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(NetworkError::from_reqwest)?;
        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::Status(status.as_u16()).into());
        }
        response
            .json::<T>()
            .map_err(|err| DetectError::ServiceReportedFailure(format!("{url}: {err}")))
    }
}

impl Detector for HttpDetector {
    fn detect(&self, upload: &Upload) -> Result<DetectionResult, DetectError> {
        let part = multipart::Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.mime)
            .map_err(|err| NetworkError::Transport(format!("invalid media type: {err}")))?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&self.detect_url)
            .multipart(form)
            .send()
            .map_err(NetworkError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::Status(status.as_u16()).into());
        }

        let body = response.bytes().map_err(NetworkError::from_reqwest)?;
        Ok(parse_detect_response(&body))
    }

    fn health(&self) -> Result<(), DetectError> {
        let Some(url) = &self.health_url else {
            return Ok(());
        };

        #[derive(Deserialize)]
        struct Health {
            status: String,
        }

        let health: Health = self.get_json(url)?;
        if health.status == "ok" {
            Ok(())
        } else {
            Err(DetectError::ServiceReportedFailure(format!(
                "service status: {}",
                health.status
            )))
        }
    }

    fn model_info(&self) -> Result<Option<ModelInfo>, DetectError> {
        self.get_json(&self.model_info_url).map(Some)
    }
}

#[derive(Deserialize)]
struct DetectResponse {
    success: Option<bool>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    detections: Option<Vec<WireDetection>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct WireDetection {
    confidence: f64,
    #[serde(default)]
    keypoints: Option<Vec<[f64; 2]>>,
    #[serde(default, rename = "box")]
    bbox: Option<[f64; 4]>,
}

impl From<WireDetection> for Detection {
    fn from(wire: WireDetection) -> Self {
        Detection {
            confidence: wire.confidence,
            keypoints: wire.keypoints.unwrap_or_default(),
            bbox: wire.bbox,
        }
    }
}

fn malformed(reason: impl std::fmt::Display) -> DetectionResult {
    log::warn!("malformed detect response: {reason}");
    DetectionResult::Failure {
        error: MALFORMED_RESPONSE_MESSAGE.to_string(),
    }
}

pub fn parse_detect_response(body: &[u8]) -> DetectionResult {
    let response: DetectResponse = match serde_json::from_slice(body) {
        Ok(response) => response,
        Err(err) => return malformed(err),
    };

    match response.success {
        None => malformed("missing `success` field"),
        Some(false) => DetectionResult::Failure {
            error: response
                .error
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| UNSPECIFIED_FAILURE_MESSAGE.to_string()),
        },
        Some(true) => {
            let Some(encoded) = response.image.filter(|img| !img.is_empty()) else {
                return malformed("success without annotated image");
            };
            let image = match base64::engine::general_purpose::STANDARD.decode(encoded.trim()) {
                Ok(image) => image,
                Err(err) => return malformed(err),
            };
            DetectionResult::Success {
                image,
                detections: response
                    .detections
                    .unwrap_or_default()
                    .into_iter()
                    .map(Detection::from)
                    .collect(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_payload_is_parsed() {
        let body = br#"{
            "success": true,
            "image": "/9j/4AAQ",
            "detections": [
                {"confidence": 0.97, "keypoints": [[1, 2], [3, 4]], "box": [10, 20, 110, 220]},
                {"confidence": 0.61}
            ],
            "error": ""
        }"#;

        let DetectionResult::Success { image, detections } = parse_detect_response(body) else {
            panic!("expected success");
        };
        assert_eq!(image, vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]);
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].keypoints, vec![[1.0, 2.0], [3.0, 4.0]]);
        assert_eq!(detections[0].bbox, Some([10.0, 20.0, 110.0, 220.0]));
        assert!(detections[1].keypoints.is_empty());
        assert!(detections[1].bbox.is_none());
    }

    #[test]
    fn service_failure_keeps_message() {
        let body = br#"{"success": false, "image": "", "detections": [], "error": "CUDA out of memory"}"#;
        assert_eq!(
            parse_detect_response(body),
            DetectionResult::Failure {
                error: "CUDA out of memory".to_string()
            }
        );
    }

    #[test]
    fn empty_failure_message_gets_placeholder() {
        let body = br#"{"success": false}"#;
        assert_eq!(
            parse_detect_response(body),
            DetectionResult::Failure {
                error: UNSPECIFIED_FAILURE_MESSAGE.to_string()
            }
        );
    }

    #[test]
    fn missing_success_field_is_malformed() {
        // The service's own "invalid image" shape carries no `success` field.
        let body = br#"{"error": "Invalid image", "keypoints": [], "confidence": 0}"#;
        assert_eq!(
            parse_detect_response(body),
            DetectionResult::Failure {
                error: MALFORMED_RESPONSE_MESSAGE.to_string()
            }
        );
    }

    #[test]
    fn undecodable_body_is_malformed() {
        assert!(!parse_detect_response(b"<html>gateway</html>").is_success());
        assert!(!parse_detect_response(br#"{"success": true, "image": "%%%"}"#).is_success());
    }

    #[test]
    fn model_info_summary() {
        let info: ModelInfo = serde_json::from_str(
            r#"{"model_name": "YOLOv8 Hand Pose Detection", "confidence_threshold": 0.6, "device": "GPU"}"#,
        )
        .unwrap();
        assert_eq!(info.summary(), "YOLOv8 Hand Pose Detection (GPU, conf 0.60)");
    }
}
