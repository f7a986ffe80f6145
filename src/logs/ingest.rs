use std::error::Error as StdError;
use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

/// One line read from a log file.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub source_file: String,
    pub line: String,
}

#[derive(Debug)]
pub enum IngestError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::Read { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
        }
    }
}

impl StdError for IngestError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            IngestError::Read { source, .. } => Some(source),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Plain,
    JsonLines,
}

fn format_for(path: &Path) -> Option<LogFormat> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "log" | "txt" => Some(LogFormat::Plain),
        "json" | "jsonl" => Some(LogFormat::JsonLines),
        _ => None,
    }
}

/// Reads every supported file in `paths`. Directories contribute their
/// supported files, sorted by name; unsupported files are skipped.
pub async fn ingest_paths(paths: &[PathBuf]) -> Result<Vec<LogEntry>, IngestError> {
    let mut entries = Vec::new();
    for path in expand_directories(paths).await? {
        let Some(format) = format_for(&path) else {
            warn!(file = %path.display(), "skipping unsupported log file");
            continue;
        };
        let contents = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| IngestError::Read {
                path: path.clone(),
                source,
            })?;
        let before = entries.len();
        parse_contents(&path, format, &contents, &mut entries);
        debug!(file = %path.display(), lines = entries.len() - before, "ingested log file");
    }
    Ok(entries)
}

/// Distinct source file names, in the order they were read.
pub fn source_files(entries: &[LogEntry]) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for entry in entries {
        if names.last() != Some(&entry.source_file.as_str()) {
            names.push(&entry.source_file);
        }
    }
    names
}

async fn expand_directories(paths: &[PathBuf]) -> Result<Vec<PathBuf>, IngestError> {
    let mut files = Vec::new();
    for path in paths {
        let read_error = |source| IngestError::Read {
            path: path.clone(),
            source,
        };
        let metadata = tokio::fs::metadata(path).await.map_err(read_error)?;
        if !metadata.is_dir() {
            files.push(path.clone());
            continue;
        }

        let mut listing = tokio::fs::read_dir(path).await.map_err(read_error)?;
        let mut found = Vec::new();
        while let Some(entry) = listing.next_entry().await.map_err(read_error)? {
            let candidate = entry.path();
            if candidate.is_file() && format_for(&candidate).is_some() {
                found.push(candidate);
            }
        }
        found.sort();
        files.extend(found);
    }
    Ok(files)
}

fn parse_contents(path: &Path, format: LogFormat, contents: &str, out: &mut Vec<LogEntry>) {
    let source_file = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    for (index, raw) in contents.lines().enumerate() {
        let line = match format {
            LogFormat::Plain => raw.to_string(),
            LogFormat::JsonLines => {
                if raw.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<Value>(raw.trim()) {
                    Ok(value) => value.to_string(),
                    Err(err) => {
                        warn!(file = %source_file, line = index + 1, error = %err, "invalid JSON log line");
                        continue;
                    }
                }
            }
        };
        out.push(LogEntry {
            source_file: source_file.clone(),
            line,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn reads_plain_and_json_lines_files() {
        let dir = TempDir::new().unwrap();
        let plain = dir.path().join("app.log");
        std::fs::write(&plain, "INFO boot\nERROR disk full\n").unwrap();
        let json = dir.path().join("events.json");
        std::fs::write(
            &json,
            "{\"level\":\"warn\",\"msg\":\"slow\"}\nnot json\n\n{\"level\":\"error\"}\n",
        )
        .unwrap();

        let entries = ingest_paths(&[plain, json]).await.unwrap();
        let lines: Vec<_> = entries.iter().map(|e| e.line.as_str()).collect();
        assert_eq!(
            lines,
            [
                "INFO boot",
                "ERROR disk full",
                r#"{"level":"warn","msg":"slow"}"#,
                r#"{"level":"error"}"#,
            ]
        );
        assert_eq!(entries[0].source_file, "app.log");
        assert_eq!(entries[3].source_file, "events.json");
        assert_eq!(source_files(&entries), ["app.log", "events.json"]);
    }

    #[tokio::test]
    async fn directories_expand_to_supported_files_in_order() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.txt"), "second").unwrap();
        std::fs::write(dir.path().join("a.log"), "first").unwrap();
        std::fs::write(dir.path().join("image.png"), [0_u8, 1]).unwrap();

        let entries = ingest_paths(&[dir.path().to_path_buf()]).await.unwrap();
        let lines: Vec<_> = entries.iter().map(|e| e.line.as_str()).collect();
        assert_eq!(lines, ["first", "second"]);
    }

    #[tokio::test]
    async fn unsupported_files_are_skipped_and_missing_files_fail() {
        let dir = TempDir::new().unwrap();
        let csv = dir.path().join("table.csv");
        std::fs::write(&csv, "a,b").unwrap();
        assert!(ingest_paths(&[csv]).await.unwrap().is_empty());

        let missing = dir.path().join("gone.log");
        let err = ingest_paths(&[missing]).await.unwrap_err();
        assert!(err.to_string().contains("gone.log"));
    }
}
