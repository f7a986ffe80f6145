//! Log files for `sagechat upload-logs`: read them, clean each line, and
//! post the batch to a relay.

pub mod clean;
pub mod ingest;
pub mod upload;

pub use clean::LogCleaner;
pub use ingest::{ingest_paths, source_files, IngestError, LogEntry};
pub use upload::{upload_logs, UploadError};
