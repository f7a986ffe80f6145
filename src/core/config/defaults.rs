use std::time::Duration;

use crate::core::config::data::{AudioConfig, Config, RelayConfig};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8001";
pub const DEFAULT_RELAY_BIND: &str = "127.0.0.1:8000";
pub const DEFAULT_RELAY_DOWNSTREAM: &str = "http://localhost:8001/analyze";
pub const DEFAULT_STOP_INPUT: &str = "q";

pub fn default_recorder_command() -> Vec<String> {
    [
        "ffmpeg",
        "-hide_banner",
        "-loglevel",
        "error",
        "-f",
        "pulse",
        "-i",
        "default",
        "-c:a",
        "libopus",
        "-f",
        "webm",
        "pipe:1",
    ]
    .iter()
    .map(|part| part.to_string())
    .collect()
}

impl Config {
    pub fn backend_url(&self) -> &str {
        self.backend_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(DEFAULT_BACKEND_URL)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

impl AudioConfig {
    pub fn command(&self) -> Vec<String> {
        match &self.command {
            Some(command) if !command.is_empty() => command.clone(),
            _ => default_recorder_command(),
        }
    }

    /// An empty string disables the stop input; the recorder is then killed.
    pub fn stop_input(&self) -> Option<String> {
        match self.stop_input.as_deref() {
            Some("") => None,
            Some(input) => Some(input.to_string()),
            None => Some(DEFAULT_STOP_INPUT.to_string()),
        }
    }
}

impl RelayConfig {
    pub fn bind(&self) -> &str {
        self.bind.as_deref().unwrap_or(DEFAULT_RELAY_BIND)
    }

    pub fn downstream_url(&self) -> &str {
        self.downstream_url
            .as_deref()
            .unwrap_or(DEFAULT_RELAY_DOWNSTREAM)
    }
}
