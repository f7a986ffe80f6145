use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Voice-message recorder settings.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct AudioConfig {
    /// Recorder program and arguments. The program must write the encoded
    /// stream to stdout. Defaults to ffmpeg capturing PulseAudio into WebM.
    pub command: Option<Vec<String>>,
    /// Sent to the recorder's stdin to end a recording ("q" for ffmpeg).
    pub stop_input: Option<String>,
}

/// Log relay settings.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct RelayConfig {
    /// Address the relay listens on, e.g. "127.0.0.1:8000".
    pub bind: Option<String>,
    /// Analysis service URL that receives forwarded log batches.
    pub downstream_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Base URL of the analysis service; `/analyze` is appended.
    pub backend_url: Option<String>,
    /// Seconds to wait for an analysis reply. Unset waits indefinitely.
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub relay: RelayConfig,
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
