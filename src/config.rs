use std::time::Duration;

use reqwest::Url;

pub const API_BASE_ENV: &str = "HANDPOSE_API_BASE";

const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000/api";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
// Idle floor after each completed webcam cycle; the real throttle is the
// serial wait on each response.
const DEFAULT_CYCLE_DELAY: Duration = Duration::from_millis(33);
const DEFAULT_FRAME_SIZE: u32 = 512;
const DEFAULT_JPEG_QUALITY: u8 = 80;

#[derive(Clone, Debug)]
pub struct Config {
    pub api_base: String,
    pub request_timeout: Duration,
    pub cycle_delay: Duration,
    pub frame_size: u32,
    pub jpeg_quality: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            cycle_delay: DEFAULT_CYCLE_DELAY,
            frame_size: DEFAULT_FRAME_SIZE,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(base) = lookup(API_BASE_ENV) {
            let base = base.trim();
            if base.is_empty() {
                log::warn!("{API_BASE_ENV} is empty, using {DEFAULT_API_BASE}");
            } else {
                config.api_base = base.to_string();
            }
        }
        config.api_base = config.api_base.trim_end_matches('/').to_string();
        config
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn detect_url(&self) -> String {
        format!("{}/detect", self.api_base)
    }

    pub fn model_info_url(&self) -> String {
        format!("{}/model-info", self.api_base)
    }

    /// The health route hangs off the server root, not the API prefix.
    pub fn health_url(&self) -> anyhow::Result<String> {
        let base = Url::parse(&self.api_base)?;
        Ok(base.join("/health")?.to_string())
    }
}
