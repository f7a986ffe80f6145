//! Log relay: accepts `{logs: [...]}` on `POST /logs/upload` and forwards the
//! batch to the analysis service, relaying its JSON reply.

pub mod forward;
pub mod http;

use std::error::Error;
use std::sync::Arc;

use chrono::Local;
use reqwest::StatusCode;
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::api::{ErrorDetail, LogUploadRequest};
use forward::{ForwardError, LogForwarder};
use http::{read_request, write_response, HttpRequest, HttpResponse, RequestError};

pub const MAX_REQUEST_BODY: usize = 16 * 1024 * 1024;

const UNREACHABLE_DETAIL: &str = "Failed to reach analysis service";
const DOWNSTREAM_ERROR_DETAIL: &str = "Analysis service returned an error";
const INVALID_REQUEST_DETAIL: &str = "Invalid request format";

fn error_response(status: StatusCode, detail: &str) -> HttpResponse {
    HttpResponse::json(
        status,
        &ErrorDetail {
            detail: detail.to_string(),
        },
    )
}

/// Maps one parsed request to its response.
pub async fn route(forwarder: &LogForwarder, request: &HttpRequest) -> HttpResponse {
    match (request.method.as_str(), request.path.as_str()) {
        ("POST", "/logs/upload") => upload_logs(forwarder, request).await,
        ("GET", "/health") => HttpResponse::json(
            StatusCode::OK,
            &json!({
                "status": "healthy",
                "timestamp": Local::now().to_rfc3339(),
                "downstream": forwarder.downstream_url(),
            }),
        ),
        (_, "/logs/upload") | (_, "/health") => {
            error_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
        }
        _ => error_response(StatusCode::NOT_FOUND, "Not Found"),
    }
}

async fn upload_logs(forwarder: &LogForwarder, request: &HttpRequest) -> HttpResponse {
    let upload: LogUploadRequest = match serde_json::from_slice(&request.body) {
        Ok(upload) => upload,
        Err(err) => {
            debug!(error = %err, "rejecting malformed upload body");
            return error_response(StatusCode::BAD_REQUEST, INVALID_REQUEST_DETAIL);
        }
    };

    match forwarder.forward(&upload).await {
        Ok(reply) => HttpResponse::json(StatusCode::OK, &reply),
        Err(ForwardError::Downstream { status }) => {
            error_response(status, DOWNSTREAM_ERROR_DETAIL)
        }
        Err(err) => {
            warn!(error = %err, "log upload could not be forwarded");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, UNREACHABLE_DETAIL)
        }
    }
}

async fn handle_connection(mut stream: TcpStream, forwarder: Arc<LogForwarder>) {
    let response = match read_request(&mut stream, MAX_REQUEST_BODY).await {
        Ok(request) => {
            debug!(method = %request.method, path = %request.path, "relay request");
            route(&forwarder, &request).await
        }
        Err(RequestError::Closed) => return,
        Err(RequestError::TooLarge { .. }) => {
            error_response(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large")
        }
        Err(err) => {
            debug!(error = %err, "unreadable relay request");
            error_response(StatusCode::BAD_REQUEST, INVALID_REQUEST_DETAIL)
        }
    };

    if let Err(err) = write_response(&mut stream, &response).await {
        debug!(error = %err, "failed to write relay response");
    }
}

/// Accepts connections until the listener fails. Each connection is served
/// on its own task.
pub async fn serve(listener: TcpListener, forwarder: Arc<LogForwarder>) -> std::io::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        debug!(%peer, "relay connection");
        tokio::spawn(handle_connection(stream, Arc::clone(&forwarder)));
    }
}

/// Binds `bind` and serves until Ctrl-C.
pub async fn run_relay(bind: &str, forwarder: LogForwarder) -> Result<(), Box<dyn Error>> {
    let listener = TcpListener::bind(bind).await?;
    info!(
        address = %listener.local_addr()?,
        downstream = forwarder.downstream_url(),
        "log relay listening"
    );
    let forwarder = Arc::new(forwarder);

    tokio::select! {
        result = serve(listener, forwarder) => result?,
        _ = tokio::signal::ctrl_c() => info!("log relay shutting down"),
    }
    Ok(())
}

#[cfg(test)]
mod tests;
