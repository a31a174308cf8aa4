//! Room client configuration.
//!
//! Configuration is loaded from environment variables. The broker secret is
//! redacted in Debug output.

use crate::chat::presence::Locale;
use common::secret::{BasicCredentials, SecretString};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default basic-auth application name.
pub const DEFAULT_APPLICATION_NAME: &str = "OPENVIDUAPP";

/// Default REST prefix on the broker.
pub const DEFAULT_API_PATH: &str = "/openvidu/api";

/// Default broker request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 10;

/// Default time an error stays on screen before returning to idle.
pub const DEFAULT_ERROR_DISPLAY_SECONDS: u64 = 5;

/// Longest accepted error display window in seconds.
pub const MAX_ERROR_DISPLAY_SECONDS: u64 = 3600;

/// Default ideal capture width.
pub const DEFAULT_VIDEO_WIDTH: u32 = 1280;

/// Default ideal capture height.
pub const DEFAULT_VIDEO_HEIGHT: u32 = 720;

/// Default capture frame rate.
pub const DEFAULT_VIDEO_FRAME_RATE: u32 = 15;

/// Default maximum chat message length in characters.
pub const DEFAULT_CHAT_MAX_MESSAGE_LENGTH: usize = 500;

/// Room client configuration.
#[derive(Clone)]
pub struct Config {
    /// Broker base URL (e.g. `https://media.example.com`).
    pub broker_url: String,

    /// Shared secret for broker basic auth.
    pub broker_secret: SecretString,

    /// Basic-auth username presented to the broker.
    pub broker_application_name: String,

    /// REST prefix appended to `broker_url`.
    pub broker_api_path: String,

    /// Per-request broker timeout.
    pub broker_request_timeout_seconds: u64,

    /// How long `Errored` is shown before returning to `Idle`.
    pub error_display_seconds: u64,

    /// Locale for synthesized presence notices.
    pub locale: Locale,

    pub video_width: u32,
    pub video_height: u32,
    pub video_frame_rate: u32,

    /// Upper bound on chat text length, in characters.
    pub chat_max_message_length: usize,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("broker_url", &self.broker_url)
            .field("broker_secret", &"[REDACTED]")
            .field("broker_application_name", &self.broker_application_name)
            .field("broker_api_path", &self.broker_api_path)
            .field(
                "broker_request_timeout_seconds",
                &self.broker_request_timeout_seconds,
            )
            .field("error_display_seconds", &self.error_display_seconds)
            .field("locale", &self.locale)
            .field("video_width", &self.video_width)
            .field("video_height", &self.video_height)
            .field("video_frame_rate", &self.video_frame_rate)
            .field("chat_max_message_length", &self.chat_max_message_length)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let broker_url = vars
            .get("BROKER_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("BROKER_URL".to_string()))?
            .trim_end_matches('/')
            .to_string();

        if !broker_url.starts_with("http://") && !broker_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(format!(
                "BROKER_URL must be an http(s) URL, got '{broker_url}'"
            )));
        }

        let broker_secret = vars
            .get("BROKER_SECRET")
            .map(|s| SecretString::from(s.clone()))
            .ok_or_else(|| ConfigError::MissingEnvVar("BROKER_SECRET".to_string()))?;

        let broker_application_name = vars
            .get("BROKER_APPLICATION_NAME")
            .cloned()
            .unwrap_or_else(|| DEFAULT_APPLICATION_NAME.to_string());

        let broker_api_path = vars
            .get("BROKER_API_PATH")
            .map(|p| normalize_api_path(p))
            .unwrap_or_else(|| DEFAULT_API_PATH.to_string());

        let broker_request_timeout_seconds = parse_positive(
            vars,
            "BROKER_REQUEST_TIMEOUT_SECONDS",
            DEFAULT_REQUEST_TIMEOUT_SECONDS,
        )?;

        let error_display_seconds = parse_positive(
            vars,
            "ROOM_ERROR_DISPLAY_SECONDS",
            DEFAULT_ERROR_DISPLAY_SECONDS,
        )?;
        if error_display_seconds > MAX_ERROR_DISPLAY_SECONDS {
            return Err(ConfigError::InvalidValue(format!(
                "ROOM_ERROR_DISPLAY_SECONDS must be at most {MAX_ERROR_DISPLAY_SECONDS}, got {error_display_seconds}"
            )));
        }

        let locale = match vars.get("ROOM_LOCALE") {
            Some(value) => Locale::from_tag(value).ok_or_else(|| {
                ConfigError::InvalidValue(format!(
                    "ROOM_LOCALE must be one of 'en', 'ko', got '{value}'"
                ))
            })?,
            None => Locale::default(),
        };

        let video_width = parse_positive(vars, "ROOM_VIDEO_WIDTH", DEFAULT_VIDEO_WIDTH)?;
        let video_height = parse_positive(vars, "ROOM_VIDEO_HEIGHT", DEFAULT_VIDEO_HEIGHT)?;
        let video_frame_rate =
            parse_positive(vars, "ROOM_VIDEO_FRAME_RATE", DEFAULT_VIDEO_FRAME_RATE)?;

        let chat_max_message_length = parse_positive(
            vars,
            "CHAT_MAX_MESSAGE_LENGTH",
            DEFAULT_CHAT_MAX_MESSAGE_LENGTH,
        )?;

        Ok(Config {
            broker_url,
            broker_secret,
            broker_application_name,
            broker_api_path,
            broker_request_timeout_seconds,
            error_display_seconds,
            locale,
            video_width,
            video_height,
            video_frame_rate,
            chat_max_message_length,
        })
    }

    /// Basic-auth credentials for the broker.
    #[must_use]
    pub fn broker_credentials(&self) -> BasicCredentials {
        BasicCredentials::new(
            self.broker_application_name.clone(),
            self.broker_secret.clone(),
        )
    }

    #[must_use]
    pub fn broker_request_timeout(&self) -> Duration {
        Duration::from_secs(self.broker_request_timeout_seconds)
    }

    /// Error display window, capped at [`MAX_ERROR_DISPLAY_SECONDS`].
    #[must_use]
    pub fn error_display_window(&self) -> Duration {
        Duration::from_secs(self.error_display_seconds.min(MAX_ERROR_DISPLAY_SECONDS))
    }
}

fn normalize_api_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Parse an optional strictly-positive numeric variable.
fn parse_positive<T>(
    vars: &HashMap<String, String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
    T::Err: fmt::Display,
{
    let Some(value_str) = vars.get(name) else {
        return Ok(default);
    };

    let value: T = value_str.trim().parse().map_err(|e| {
        ConfigError::InvalidValue(format!(
            "{name} must be a valid positive integer, got '{value_str}': {e}"
        ))
    })?;

    if value <= T::default() {
        return Err(ConfigError::InvalidValue(format!(
            "{name} must be greater than 0"
        )));
    }

    Ok(value)
}
