//! Shared constants used across the application

/// Largest file the client will upload: 10 MiB.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Seeded assistant message every session starts with.
pub const GREETING: &str = "Hello! I'm Sage, your log analysis assistant. Send a message, \
attach a log or document with /file, or record a voice note with /record.";

pub const TEXT_FALLBACK: &str =
    "I received your message. The analysis finished without a detailed response.";
pub const FILE_FALLBACK: &str =
    "I received your file. The analysis finished without a detailed response.";

pub const TEXT_ERROR: &str =
    "Sorry, I couldn't process your message right now. Please try again.";
pub const FILE_ERROR: &str = "Sorry, I couldn't process your file right now. Please try again.";
pub const AUDIO_ERROR: &str =
    "Sorry, I couldn't process your voice message right now. Please try again.";

pub const AUDIO_CAPTION: &str = "Voice message recorded";
pub const AUDIO_FILE_NAME: &str = "voice-message.webm";
pub const AUDIO_MIME: &str = "audio/webm";

/// Acknowledgement for a voice message whose analysis came back empty.
/// Carries the rounded duration.
pub fn audio_fallback(duration_seconds: f64) -> String {
    format!(
        "I received your {}-second voice message. The analysis finished without a detailed response.",
        duration_seconds.round() as u64
    )
}

pub fn file_caption(file_name: &str) -> String {
    format!("Uploaded file: {file_name}")
}
