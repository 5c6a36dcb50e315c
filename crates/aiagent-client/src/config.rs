use std::env;
use std::path::PathBuf;

use crate::error::ClientError;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_API_PREFIX: &str = "/api";
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 30_000;
pub const MIN_HTTP_TIMEOUT_MS: u64 = 250;
pub const DEFAULT_STATE_FILE_NAME: &str = "session.json";

pub const ENV_API_BASE_URL: &str = "AIAGENT_API_BASE_URL";
pub const ENV_API_PREFIX: &str = "AIAGENT_API_PREFIX";
pub const ENV_HTTP_TIMEOUT_MS: &str = "AIAGENT_HTTP_TIMEOUT_MS";
pub const ENV_STATE_PATH: &str = "AIAGENT_STATE_PATH";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_prefix: String,
    pub timeout_ms: u64,
    pub state_path: Option<PathBuf>,
}

impl ClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
            state_path: None,
        }
    }

    pub fn from_env() -> Result<Self, ClientError> {
        let base_url = env_non_empty(ENV_API_BASE_URL)
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let base_url = normalize_base_url(&base_url)?;

        let api_prefix = env::var(ENV_API_PREFIX)
            .ok()
            .map(|value| normalize_api_prefix(&value))
            .unwrap_or_else(|| DEFAULT_API_PREFIX.to_string());

        let timeout_ms = env_non_empty(ENV_HTTP_TIMEOUT_MS)
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_MS)
            .max(MIN_HTTP_TIMEOUT_MS);

        let state_path = env_non_empty(ENV_STATE_PATH)
            .map(PathBuf::from)
            .or_else(default_state_path);

        Ok(Self {
            base_url,
            api_prefix,
            timeout_ms,
            state_path,
        })
    }

    #[must_use]
    pub fn with_api_prefix(mut self, prefix: &str) -> Self {
        self.api_prefix = normalize_api_prefix(prefix);
        self
    }

    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms.max(MIN_HTTP_TIMEOUT_MS);
        self
    }

    #[must_use]
    pub fn with_state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_path = Some(path.into());
        self
    }
}

#[must_use]
pub fn default_state_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("aiagent").join(DEFAULT_STATE_FILE_NAME))
}

pub fn normalize_base_url(raw: &str) -> Result<String, ClientError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ClientError::BaseUrlMissing);
    }
    let Some((scheme, remainder)) = trimmed.split_once("://") else {
        return Err(ClientError::InvalidBaseUrl);
    };
    if !matches!(scheme, "http" | "https") {
        return Err(ClientError::InvalidBaseUrl);
    }
    if remainder.trim().is_empty() || remainder.starts_with('/') {
        return Err(ClientError::InvalidBaseUrl);
    }
    Ok(trimmed.to_string())
}

/// `"api/"` and `"/api"` both become `"/api"`; blank input means no prefix.
#[must_use]
pub fn normalize_api_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
