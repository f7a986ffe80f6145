pub mod backend;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use backend::{AnalysisBackend, AnalyzeRequest, BackendError, HttpBackend};

/// JSON body for a typed message sent to `/analyze`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AnalyzeTextRequest {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl AnalyzeTextRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: "text".to_string(),
        }
    }
}

/// Reply from `/analyze`. Only `response` drives the conversation; the rest
/// is kept for diagnostics.
#[derive(Debug, Deserialize, Default)]
pub struct AnalyzeResponse {
    #[serde(default)]
    pub response: Option<Value>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl AnalyzeResponse {
    /// The reply text, if the backend sent a non-empty string.
    pub fn reply_text(&self) -> Option<&str> {
        self.response
            .as_ref()
            .and_then(Value::as_str)
            .filter(|text| !text.trim().is_empty())
    }
}

/// Body accepted by the relay's `/logs/upload` and forwarded downstream.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LogUploadRequest {
    pub logs: Vec<String>,
}

/// Error body used by the relay, shaped like the analysis service's errors.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ErrorDetail {
    pub detail: String,
}
