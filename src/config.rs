//! Runtime configuration, read once from the environment at startup.

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_API_URL: &str = "http://localhost:8080/api";
const DEFAULT_IMAGE_BASE_URL: &str = "http://localhost:8080/uploads/";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    /// Base of the REST API, e.g. `https://host/api`
    pub api_base_url: String,
    /// Prefix for avatar paths served from the backend's uploads folder
    pub image_base_url: String,
    /// Where the token slot and logs live
    pub data_dir: PathBuf,
    pub http_timeout: Duration,
    /// Treat tokens whose `exp` has passed as undecodable
    pub reject_expired_tokens: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let api_base_url = std::env::var("MP_API_URL")
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let image_base_url = std::env::var("MP_IMAGE_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_IMAGE_BASE_URL.to_string());

        let data_dir = std::env::var_os("MP_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let http_timeout = std::env::var("MP_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        let reject_expired_tokens = std::env::var("MP_REJECT_EXPIRED_TOKENS")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Self {
            api_base_url,
            image_base_url,
            data_dir,
            http_timeout,
            reject_expired_tokens,
        }
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            image_base_url: DEFAULT_IMAGE_BASE_URL.to_string(),
            data_dir: default_data_dir(),
            http_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            reject_expired_tokens: false,
        }
    }
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("MamasPerrunas")
}
