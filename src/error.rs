use thiserror::Error;

pub const INVALID_IMAGE_MESSAGE: &str = "Please select a valid image file";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DetectError {
    /// The selected file is not an image. Raised before any request is made.
    #[error("Please select a valid image file: {name} ({kind})")]
    InvalidInputKind { name: String, kind: String },
    /// Camera permission denied, no device, or the stream failed to open.
    #[error("{0}")]
    DeviceUnavailable(String),
    #[error(transparent)]
    Network(#[from] NetworkError),
    /// 2xx reply carrying `success: false`; the message is shown verbatim.
    #[error("{0}")]
    ServiceReportedFailure(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NetworkError {
    #[error("HTTP error! status: {0}")]
    Status(u16),
    #[error("request timed out")]
    Timeout,
    #[error("{0}")]
    Transport(String),
}

impl NetworkError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NetworkError::Timeout
        } else if let Some(status) = err.status() {
            NetworkError::Status(status.as_u16())
        } else {
            NetworkError::Transport(format!("{err}"))
        }
    }
}
