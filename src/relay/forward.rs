use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::LogUploadRequest;

/// Errors returned when forwarding logs to the analysis service.
#[derive(Debug)]
pub enum ForwardError {
    /// The downstream service could not be reached or its body not read.
    Transport(reqwest::Error),

    /// The downstream service answered with a non-2xx status.
    Downstream { status: StatusCode },

    /// The downstream service answered 2xx with a body that is not JSON.
    InvalidBody(serde_json::Error),
}

impl fmt::Display for ForwardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForwardError::Transport(source) => {
                write!(f, "failed to reach analysis service: {source}")
            }
            ForwardError::Downstream { status } => {
                write!(f, "analysis service returned {status}")
            }
            ForwardError::InvalidBody(source) => {
                write!(f, "analysis service returned invalid JSON: {source}")
            }
        }
    }
}

impl StdError for ForwardError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ForwardError::Transport(source) => Some(source),
            ForwardError::Downstream { .. } => None,
            ForwardError::InvalidBody(source) => Some(source),
        }
    }
}

/// Forwards log batches, unmodified, to one fixed downstream URL.
pub struct LogForwarder {
    client: Client,
    downstream_url: String,
}

impl LogForwarder {
    pub fn new(
        downstream_url: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            downstream_url: downstream_url.into(),
        })
    }

    pub fn downstream_url(&self) -> &str {
        &self.downstream_url
    }

    pub async fn forward(&self, upload: &LogUploadRequest) -> Result<Value, ForwardError> {
        debug!(count = upload.logs.len(), url = %self.downstream_url, "forwarding logs");
        let response = self
            .client
            .post(&self.downstream_url)
            .json(upload)
            .send()
            .await
            .map_err(ForwardError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, body = %body, "analysis service rejected log upload");
            return Err(ForwardError::Downstream { status });
        }

        let bytes = response.bytes().await.map_err(ForwardError::Transport)?;
        serde_json::from_slice(&bytes).map_err(ForwardError::InvalidBody)
    }
}
