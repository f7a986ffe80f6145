//! Client for the analysis service's `/analyze` endpoint.

use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use tracing::debug;

use super::{AnalyzeResponse, AnalyzeTextRequest};
use crate::core::constants::{AUDIO_FILE_NAME, AUDIO_MIME};

/// One normalized user input, ready to be encoded for the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyzeRequest {
    Text {
        message: String,
    },
    File {
        file_name: String,
        mime: String,
        bytes: Vec<u8>,
    },
    Audio {
        data: Vec<u8>,
        duration_seconds: f64,
    },
}

impl AnalyzeRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            AnalyzeRequest::Text { .. } => "text",
            AnalyzeRequest::File { .. } => "file",
            AnalyzeRequest::Audio { .. } => "audio",
        }
    }
}

/// Errors that can occur while talking to the analysis backend.
#[derive(Debug)]
pub enum BackendError {
    /// The request never produced a response (connect, timeout, body read).
    Transport(reqwest::Error),

    /// The backend answered with a non-2xx status. The body is kept for logs.
    Status { status: StatusCode, body: String },

    /// A 2xx reply whose body was not the expected JSON.
    Decode(serde_json::Error),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Transport(source) => {
                write!(f, "request to analysis backend failed: {source}")
            }
            BackendError::Status { status, .. } => {
                write!(f, "analysis backend returned {status}")
            }
            BackendError::Decode(source) => {
                write!(f, "could not decode analysis response: {source}")
            }
        }
    }
}

impl BackendError {
    /// Body of a non-2xx reply, for diagnostics. Never shown to the user.
    pub fn response_body(&self) -> Option<&str> {
        match self {
            BackendError::Status { body, .. } => Some(body),
            _ => None,
        }
    }
}

impl StdError for BackendError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            BackendError::Transport(source) => Some(source),
            BackendError::Status { .. } => None,
            BackendError::Decode(source) => Some(source),
        }
    }
}

#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    async fn analyze(&self, request: AnalyzeRequest) -> Result<AnalyzeResponse, BackendError>;
}

pub struct HttpBackend {
    client: Client,
    endpoint: String,
}

impl HttpBackend {
    /// `timeout` of `None` waits for the backend indefinitely.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            endpoint: analyze_endpoint(base_url),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

pub fn analyze_endpoint(base_url: &str) -> String {
    format!("{}/analyze", base_url.trim_end_matches('/'))
}

fn file_form(file_name: String, mime: &str, bytes: Vec<u8>) -> Result<Form, reqwest::Error> {
    let part = Part::bytes(bytes).file_name(file_name).mime_str(mime)?;
    Ok(Form::new().part("file", part).text("type", "file"))
}

fn audio_form(data: Vec<u8>, duration_seconds: f64) -> Result<Form, reqwest::Error> {
    let part = Part::bytes(data)
        .file_name(AUDIO_FILE_NAME)
        .mime_str(AUDIO_MIME)?;
    Ok(Form::new()
        .part("audio", part)
        .text("type", "audio")
        .text("duration", duration_seconds.to_string()))
}

#[async_trait]
impl AnalysisBackend for HttpBackend {
    async fn analyze(&self, request: AnalyzeRequest) -> Result<AnalyzeResponse, BackendError> {
        debug!(kind = request.kind(), endpoint = %self.endpoint, "sending analysis request");
        let builder = self.client.post(&self.endpoint);
        let builder = match request {
            AnalyzeRequest::Text { message } => builder.json(&AnalyzeTextRequest::new(message)),
            AnalyzeRequest::File {
                file_name,
                mime,
                bytes,
            } => builder.multipart(
                file_form(file_name, &mime, bytes).map_err(BackendError::Transport)?,
            ),
            AnalyzeRequest::Audio {
                data,
                duration_seconds,
            } => builder.multipart(
                audio_form(data, duration_seconds).map_err(BackendError::Transport)?,
            ),
        };

        let response = builder.send().await.map_err(BackendError::Transport)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status, body });
        }

        let bytes = response.bytes().await.map_err(BackendError::Transport)?;
        let parsed: AnalyzeResponse =
            serde_json::from_slice(&bytes).map_err(BackendError::Decode)?;
        debug!(
            request_id = parsed.request_id.as_deref().unwrap_or("-"),
            success = ?parsed.success,
            "analysis response received"
        );
        Ok(parsed)
    }
}
