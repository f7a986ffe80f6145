//! Voice-message recording.
//!
//! The adapter talks to the microphone through [`CaptureDevice`] and
//! [`CaptureStream`], so tests can drive it with a fake device producing
//! deterministic chunks. The open stream is owned exclusively by the adapter
//! and is released when a recording stops, or when the adapter is dropped
//! mid-recording.

use std::error::Error as StdError;
use std::fmt;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, warn};

#[derive(Debug)]
pub enum CaptureError {
    /// The device refused access or is not present.
    PermissionDenied(String),

    /// `start` was called while the adapter has no usable device.
    Unavailable,

    Io(std::io::Error),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::PermissionDenied(reason) => {
                write!(f, "microphone unavailable: {reason}")
            }
            CaptureError::Unavailable => {
                write!(f, "microphone access has not been granted")
            }
            CaptureError::Io(source) => write!(f, "audio capture failed: {source}"),
        }
    }
}

impl StdError for CaptureError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            CaptureError::Io(source) => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CaptureError {
    fn from(source: std::io::Error) -> Self {
        CaptureError::Io(source)
    }
}

#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Checks that the device can be opened, without keeping it open.
    async fn probe(&self) -> Result<(), CaptureError>;

    /// Acquires the device and starts producing audio.
    async fn open(&self) -> Result<Box<dyn CaptureStream>, CaptureError>;
}

#[async_trait]
pub trait CaptureStream: Send {
    /// Next buffered chunk. `None` once the stream is stopped and drained.
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, CaptureError>;

    /// Stops producing audio; chunks already produced stay readable.
    async fn stop(&mut self) -> Result<(), CaptureError>;

    /// Releases the underlying device.
    fn release(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    /// Permission unknown or denied. `probe` again to retry.
    Unavailable,
    Idle,
    Recording,
}

/// A finished recording: concatenated chunks plus wall-clock duration.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub data: Vec<u8>,
    pub duration_seconds: f64,
}

struct ActiveRecording {
    stream: Box<dyn CaptureStream>,
    started_at: Instant,
}

pub struct AudioAdapter<D> {
    device: D,
    state: RecorderState,
    active: Option<ActiveRecording>,
}

impl<D: CaptureDevice> AudioAdapter<D> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            state: RecorderState::Unavailable,
            active: None,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecorderState::Recording
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Checks microphone availability. Does nothing while recording.
    pub async fn probe(&mut self) -> RecorderState {
        if self.is_recording() {
            return self.state;
        }
        self.state = match self.device.probe().await {
            Ok(()) => RecorderState::Idle,
            Err(err) => {
                warn!(error = %err, "microphone probe failed");
                RecorderState::Unavailable
            }
        };
        self.state
    }

    /// Starts recording. Already recording is a no-op.
    pub async fn start(&mut self) -> Result<(), CaptureError> {
        match self.state {
            RecorderState::Recording => return Ok(()),
            RecorderState::Unavailable => return Err(CaptureError::Unavailable),
            RecorderState::Idle => {}
        }

        let stream = match self.device.open().await {
            Ok(stream) => stream,
            Err(err) => {
                self.state = RecorderState::Unavailable;
                return Err(err);
            }
        };
        self.active = Some(ActiveRecording {
            stream,
            started_at: Instant::now(),
        });
        self.state = RecorderState::Recording;
        debug!("recording started");
        Ok(())
    }

    /// Whole seconds since recording started, for display. Zero when idle.
    pub fn elapsed_display_seconds(&self) -> u64 {
        self.active
            .as_ref()
            .map(|active| active.started_at.elapsed().as_secs())
            .unwrap_or(0)
    }

    /// Stops the recording and returns the clip. Returns `None` when nothing
    /// was being recorded. The device is released on every path.
    pub async fn stop(&mut self) -> Result<Option<AudioClip>, CaptureError> {
        let Some(mut active) = self.active.take() else {
            return Ok(None);
        };
        let duration_seconds = active.started_at.elapsed().as_secs_f64();
        self.state = RecorderState::Idle;

        let collected = collect_chunks(active.stream.as_mut()).await;
        active.stream.release();

        let chunks = collected?;
        debug!(
            chunks = chunks.len(),
            duration_seconds, "recording stopped"
        );
        Ok(Some(AudioClip {
            data: chunks.concat(),
            duration_seconds,
        }))
    }
}

async fn collect_chunks(stream: &mut dyn CaptureStream) -> Result<Vec<Vec<u8>>, CaptureError> {
    stream.stop().await?;
    let mut chunks = Vec::new();
    while let Some(chunk) = stream.next_chunk().await? {
        if !chunk.is_empty() {
            chunks.push(chunk);
        }
    }
    Ok(chunks)
}

impl<D> Drop for AudioAdapter<D> {
    fn drop(&mut self) {
        if let Some(mut active) = self.active.take() {
            debug!("releasing microphone held by an unfinished recording");
            active.stream.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::FakeCaptureDevice;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn adapter_with(chunks: Vec<Vec<u8>>) -> AudioAdapter<FakeCaptureDevice> {
        AudioAdapter::new(FakeCaptureDevice::granted(chunks))
    }

    #[tokio::test]
    async fn probe_moves_to_idle_when_granted() {
        let mut adapter = adapter_with(Vec::new());
        assert_eq!(adapter.state(), RecorderState::Unavailable);
        assert_eq!(adapter.probe().await, RecorderState::Idle);
    }

    #[tokio::test]
    async fn denied_probe_blocks_start_until_retry_succeeds() {
        let mut adapter = AudioAdapter::new(FakeCaptureDevice::denied());
        assert_eq!(adapter.probe().await, RecorderState::Unavailable);
        assert!(matches!(
            adapter.start().await,
            Err(CaptureError::Unavailable)
        ));

        adapter.device().grant();
        assert_eq!(adapter.probe().await, RecorderState::Idle);
        adapter.start().await.unwrap();
        assert!(adapter.is_recording());
    }

    #[tokio::test(start_paused = true)]
    async fn duration_uses_wall_clock_not_display_counter() {
        let mut adapter = adapter_with(vec![b"ab".to_vec(), b"cd".to_vec()]);
        adapter.probe().await;
        adapter.start().await.unwrap();

        tokio::time::advance(Duration::from_millis(2300)).await;
        assert_eq!(adapter.elapsed_display_seconds(), 2);

        let clip = adapter.stop().await.unwrap().unwrap();
        assert!((clip.duration_seconds - 2.3).abs() < 0.01);
        assert_eq!(clip.data, b"abcd");
        assert_eq!(adapter.state(), RecorderState::Idle);
        assert_eq!(adapter.elapsed_display_seconds(), 0);
    }

    #[tokio::test]
    async fn stop_without_recording_is_a_noop() {
        let mut adapter = adapter_with(Vec::new());
        adapter.probe().await;
        assert!(adapter.stop().await.unwrap().is_none());
        assert_eq!(adapter.device().release_count(), 0);
        assert_eq!(adapter.device().stops.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stop_releases_device_once_and_second_stop_does_nothing() {
        let mut adapter = adapter_with(vec![b"x".to_vec()]);
        adapter.probe().await;
        adapter.start().await.unwrap();
        adapter.stop().await.unwrap();
        assert!(adapter.stop().await.unwrap().is_none());

        let releases = std::sync::Arc::clone(&adapter.device().releases);
        drop(adapter);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn teardown_while_recording_releases_exactly_once() {
        let mut adapter = adapter_with(vec![b"x".to_vec()]);
        adapter.probe().await;
        adapter.start().await.unwrap();
        assert!(adapter.is_recording());

        let releases = std::sync::Arc::clone(&adapter.device().releases);
        let stops = std::sync::Arc::clone(&adapter.device().stops);
        drop(adapter);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
        assert_eq!(stops.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn each_recording_reacquires_the_device() {
        let mut adapter = adapter_with(vec![b"x".to_vec()]);
        adapter.probe().await;
        for _ in 0..2 {
            adapter.start().await.unwrap();
            adapter.stop().await.unwrap();
        }
        assert_eq!(adapter.device().opens.load(Ordering::SeqCst), 2);
        assert_eq!(adapter.device().release_count(), 2);
    }

    #[tokio::test]
    async fn start_while_recording_keeps_the_first_stream() {
        let mut adapter = adapter_with(Vec::new());
        adapter.probe().await;
        adapter.start().await.unwrap();
        adapter.start().await.unwrap();
        assert_eq!(adapter.device().opens.load(Ordering::SeqCst), 1);
    }
}
