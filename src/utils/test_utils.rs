//! Fakes and fixtures shared by unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;

use crate::api::{AnalysisBackend, AnalyzeRequest, AnalyzeResponse, BackendError};
use crate::capture::audio::{CaptureDevice, CaptureError, CaptureStream};
use crate::relay::http::{read_request, write_response, HttpRequest, HttpResponse};

/// Scripted outcome for one `FakeBackend::analyze` call.
#[derive(Debug, Clone)]
pub enum FakeReply {
    Reply(&'static str),
    /// 2xx without a `response` field.
    Empty,
    Status(u16),
    Malformed,
}

#[derive(Default)]
pub struct FakeBackend {
    replies: Mutex<VecDeque<FakeReply>>,
    requests: Mutex<Vec<AnalyzeRequest>>,
    probe: Mutex<Option<watch::Receiver<bool>>>,
    observed_responding: Mutex<Vec<bool>>,
    gate: Option<Arc<Notify>>,
}

impl FakeBackend {
    pub fn new(replies: impl IntoIterator<Item = FakeReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            ..Default::default()
        }
    }

    /// Every call waits for a `notify_one` on `gate` before answering.
    pub fn gated(replies: impl IntoIterator<Item = FakeReply>, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(replies)
        }
    }

    /// Records the responding flag as seen from inside each call.
    pub fn attach_probe(&self, probe: watch::Receiver<bool>) {
        *self.probe.lock().unwrap() = Some(probe);
    }

    pub fn requests(&self) -> Vec<AnalyzeRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn observed_responding(&self) -> Vec<bool> {
        self.observed_responding.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalysisBackend for FakeBackend {
    async fn analyze(&self, request: AnalyzeRequest) -> Result<AnalyzeResponse, BackendError> {
        self.requests.lock().unwrap().push(request);
        if let Some(probe) = self.probe.lock().unwrap().as_ref() {
            self.observed_responding
                .lock()
                .unwrap()
                .push(*probe.borrow());
        }
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(FakeReply::Empty);
        match reply {
            FakeReply::Reply(text) => Ok(AnalyzeResponse {
                response: Some(Value::String(text.to_string())),
                success: Some(true),
                ..Default::default()
            }),
            FakeReply::Empty => Ok(AnalyzeResponse::default()),
            FakeReply::Status(code) => Err(BackendError::Status {
                status: StatusCode::from_u16(code).unwrap(),
                body: r#"{"detail": "internal failure at line 42"}"#.to_string(),
            }),
            FakeReply::Malformed => Err(BackendError::Decode(
                serde_json::from_str::<Value>("<html>").unwrap_err(),
            )),
        }
    }
}

/// Capture device that hands out a fixed list of chunks and counts device
/// acquisitions and releases.
pub struct FakeCaptureDevice {
    granted: AtomicBool,
    chunks: Vec<Vec<u8>>,
    pub opens: Arc<AtomicUsize>,
    pub stops: Arc<AtomicUsize>,
    pub releases: Arc<AtomicUsize>,
}

impl FakeCaptureDevice {
    pub fn granted(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            granted: AtomicBool::new(true),
            chunks,
            opens: Arc::new(AtomicUsize::new(0)),
            stops: Arc::new(AtomicUsize::new(0)),
            releases: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn denied() -> Self {
        let device = Self::granted(Vec::new());
        device.granted.store(false, Ordering::SeqCst);
        device
    }

    pub fn grant(&self) {
        self.granted.store(true, Ordering::SeqCst);
    }

    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptureDevice for FakeCaptureDevice {
    async fn probe(&self) -> Result<(), CaptureError> {
        if self.granted.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CaptureError::PermissionDenied(
                "microphone access denied".to_string(),
            ))
        }
    }

    async fn open(&self) -> Result<Box<dyn CaptureStream>, CaptureError> {
        self.probe().await?;
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeCaptureStream {
            pending: self.chunks.iter().cloned().collect(),
            stops: Arc::clone(&self.stops),
            releases: Arc::clone(&self.releases),
        }))
    }
}

struct FakeCaptureStream {
    pending: VecDeque<Vec<u8>>,
    stops: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
}

#[async_trait]
impl CaptureStream for FakeCaptureStream {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, CaptureError> {
        Ok(self.pending.pop_front())
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn release(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Serves exactly one HTTP request on an ephemeral port with a canned reply.
/// Resolves to the request the client sent.
pub async fn serve_once(status: u16, body: &str) -> (String, JoinHandle<HttpRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let response = HttpResponse {
        status: StatusCode::from_u16(status).unwrap(),
        body: body.as_bytes().to_vec(),
    };
    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let request = read_request(&mut stream, 64 * 1024 * 1024).await.unwrap();
        write_response(&mut stream, &response).await.unwrap();
        request
    });
    (format!("http://{address}"), handle)
}
