//! `sagechat set` / `sagechat unset` key handling.

use std::error::Error as StdError;
use std::fmt;

use crate::core::config::data::Config;

pub const SETTABLE_KEYS: &[&str] = &[
    "backend-url",
    "request-timeout",
    "recorder",
    "recorder-stop-input",
    "relay-bind",
    "relay-downstream",
];

#[derive(Debug, PartialEq, Eq)]
pub enum SettingError {
    UnknownKey(String),
    InvalidValue { key: &'static str, reason: String },
}

impl fmt::Display for SettingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingError::UnknownKey(key) => write!(
                f,
                "Unknown config key: {key} (expected one of: {})",
                SETTABLE_KEYS.join(", ")
            ),
            SettingError::InvalidValue { key, reason } => {
                write!(f, "Invalid value for {key}: {reason}")
            }
        }
    }
}

impl StdError for SettingError {}

fn require_url(key: &'static str, value: &str) -> Result<String, SettingError> {
    let parsed = reqwest::Url::parse(value).map_err(|err| SettingError::InvalidValue {
        key,
        reason: err.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(value.trim_end_matches('/').to_string()),
        other => Err(SettingError::InvalidValue {
            key,
            reason: format!("unsupported scheme {other}"),
        }),
    }
}

impl Config {
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), SettingError> {
        let value = value.trim();
        match key {
            "backend-url" => self.backend_url = Some(require_url("backend-url", value)?),
            "request-timeout" => {
                let secs = value
                    .trim_end_matches('s')
                    .parse::<u64>()
                    .map_err(|err| SettingError::InvalidValue {
                        key: "request-timeout",
                        reason: err.to_string(),
                    })?;
                self.request_timeout_secs = Some(secs);
            }
            "recorder" => {
                let command: Vec<String> = value.split_whitespace().map(str::to_string).collect();
                if command.is_empty() {
                    return Err(SettingError::InvalidValue {
                        key: "recorder",
                        reason: "command is empty".to_string(),
                    });
                }
                self.audio.command = Some(command);
            }
            "recorder-stop-input" => self.audio.stop_input = Some(value.to_string()),
            "relay-bind" => {
                value
                    .parse::<std::net::SocketAddr>()
                    .map_err(|err| SettingError::InvalidValue {
                        key: "relay-bind",
                        reason: err.to_string(),
                    })?;
                self.relay.bind = Some(value.to_string());
            }
            "relay-downstream" => {
                self.relay.downstream_url = Some(require_url("relay-downstream", value)?)
            }
            other => return Err(SettingError::UnknownKey(other.to_string())),
        }
        Ok(())
    }

    pub fn unset_value(&mut self, key: &str) -> Result<(), SettingError> {
        match key {
            "backend-url" => self.backend_url = None,
            "request-timeout" => self.request_timeout_secs = None,
            "recorder" => self.audio.command = None,
            "recorder-stop-input" => self.audio.stop_input = None,
            "relay-bind" => self.relay.bind = None,
            "relay-downstream" => self.relay.downstream_url = None,
            other => return Err(SettingError::UnknownKey(other.to_string())),
        }
        Ok(())
    }
}
