use std::error::Error as StdError;
use std::fmt;

use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::api::{ErrorDetail, LogUploadRequest};

#[derive(Debug)]
pub enum UploadError {
    Transport(reqwest::Error),
    /// The relay answered non-2xx; `detail` is its error message when it sent one.
    Status {
        status: StatusCode,
        detail: Option<String>,
    },
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadError::Transport(source) => write!(f, "failed to reach log relay: {source}"),
            UploadError::Status {
                status,
                detail: Some(detail),
            } => write!(f, "log relay returned {status}: {detail}"),
            UploadError::Status {
                status,
                detail: None,
            } => write!(f, "log relay returned {status}"),
        }
    }
}

impl StdError for UploadError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            UploadError::Transport(source) => Some(source),
            UploadError::Status { .. } => None,
        }
    }
}

pub fn upload_endpoint(relay_url: &str) -> String {
    format!("{}/logs/upload", relay_url.trim_end_matches('/'))
}

/// Posts `logs` to a relay and returns the relayed analysis JSON.
pub async fn upload_logs(
    client: &Client,
    relay_url: &str,
    logs: Vec<String>,
) -> Result<Value, UploadError> {
    let endpoint = upload_endpoint(relay_url);
    debug!(count = logs.len(), url = %endpoint, "uploading logs");
    let response = client
        .post(&endpoint)
        .json(&LogUploadRequest { logs })
        .send()
        .await
        .map_err(UploadError::Transport)?;

    let status = response.status();
    if !status.is_success() {
        let detail = response
            .json::<ErrorDetail>()
            .await
            .ok()
            .map(|body| body.detail);
        return Err(UploadError::Status { status, detail });
    }
    response.json().await.map_err(UploadError::Transport)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::serve_once;

    #[test]
    fn endpoint_joins_without_double_slash() {
        assert_eq!(
            upload_endpoint("http://127.0.0.1:8000/"),
            "http://127.0.0.1:8000/logs/upload"
        );
    }

    #[tokio::test]
    async fn posts_batch_and_returns_reply() {
        let (url, server) = serve_once(200, r#"{"summary":"fine"}"#).await;
        let reply = upload_logs(&Client::new(), &url, vec!["INFO ok".to_string()])
            .await
            .unwrap();
        assert_eq!(reply["summary"], "fine");

        let request = server.await.unwrap();
        assert_eq!(request.path, "/logs/upload");
        assert_eq!(request.body, br#"{"logs":["INFO ok"]}"#);
    }

    #[tokio::test]
    async fn relay_errors_carry_detail() {
        let (url, _server) =
            serve_once(500, r#"{"detail":"Failed to reach analysis service"}"#).await;
        let err = upload_logs(&Client::new(), &url, Vec::new())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "log relay returned 500 Internal Server Error: Failed to reach analysis service"
        );
    }
}
