//! Client configuration parsed from environment variables.

use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid API URL '{0}' (expected http:// or https://)")]
    InvalidApiUrl(String),
    #[error("no platform data directory; set PRINTEASE_STATE_DIR")]
    NoStateDir,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for RequestTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend origin without a trailing slash.
    pub api_url: String,
    /// Directory holding the persisted session file.
    pub state_dir: PathBuf,
    pub timeouts: RequestTimeouts,
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `PRINTEASE_API_URL`: backend origin, default `http://localhost:8000`
    /// - `PRINTEASE_STATE_DIR`: default `<data dir>/printease`
    /// - `PRINTEASE_REQUEST_TIMEOUT_SECS`: default 30
    /// - `PRINTEASE_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if the API URL has no http(s) scheme or no state
    /// directory can be determined.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(None, None)
    }

    /// Like [`ClientConfig::from_env`], with command-line values taking
    /// precedence. An overridden variable is never read or validated.
    ///
    /// # Errors
    ///
    /// Returns an error if the effective API URL has no http(s) scheme, or
    /// if neither an override nor `PRINTEASE_STATE_DIR` is set and there is
    /// no platform data directory.
    pub fn from_env_with(api_url: Option<&str>, state_dir: Option<PathBuf>) -> Result<Self, ConfigError> {
        let api_url = match api_url {
            Some(raw) => normalize_api_url(raw)?,
            None => normalize_api_url(
                &std::env::var("PRINTEASE_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_owned()),
            )?,
        };
        let state_dir = match state_dir {
            Some(dir) => dir,
            None => match std::env::var_os("PRINTEASE_STATE_DIR") {
                Some(dir) if !dir.is_empty() => PathBuf::from(dir),
                _ => default_state_dir()?,
            },
        };
        let timeouts = RequestTimeouts {
            request_secs: env_parse_u64("PRINTEASE_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64("PRINTEASE_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self { api_url, state_dir, timeouts })
    }
}

/// Trim whitespace and trailing slashes and require an http(s) scheme.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidApiUrl`] for any other scheme.
pub fn normalize_api_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    match trimmed.split_once("://") {
        Some(("http" | "https", host)) if !host.is_empty() => Ok(trimmed.to_owned()),
        _ => Err(ConfigError::InvalidApiUrl(raw.to_owned())),
    }
}

fn default_state_dir() -> Result<PathBuf, ConfigError> {
    dirs::data_dir().map(|dir| dir.join("printease")).ok_or(ConfigError::NoStateDir)
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
