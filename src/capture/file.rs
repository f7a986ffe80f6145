//! File attachments: validation against the upload limits and recognition of
//! paths dropped into the terminal.

use std::error::Error as StdError;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::constants::MAX_UPLOAD_BYTES;

/// MIME types the analysis service accepts, keyed by file extension.
const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("txt", "text/plain"),
    ("log", "text/plain"),
    ("pdf", "application/pdf"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("csv", "text/csv"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
];

fn allowed_mime(mime: &str) -> Option<&'static str> {
    ALLOWED_TYPES
        .iter()
        .map(|(_, allowed)| *allowed)
        .find(|allowed| *allowed == mime)
}

pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    ALLOWED_TYPES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime)| *mime)
}

/// Why a file was refused before upload.
#[derive(Debug)]
pub enum FileRejection {
    TooLarge { file_name: String, size: u64 },
    UnsupportedType { file_name: String, mime: Option<String> },
    Unreadable { path: PathBuf, source: std::io::Error },
}

impl fmt::Display for FileRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileRejection::TooLarge { file_name, size } => write!(
                f,
                "{file_name} is {:.1} MB; files must be 10 MB or smaller",
                *size as f64 / (1024.0 * 1024.0)
            ),
            FileRejection::UnsupportedType { file_name, mime } => match mime {
                Some(mime) => write!(
                    f,
                    "{file_name} has unsupported type {mime}; use text, PDF, Word, CSV or image files"
                ),
                None => write!(
                    f,
                    "{file_name} has an unsupported type; use text, PDF, Word, CSV or image files"
                ),
            },
            FileRejection::Unreadable { path, source } => {
                write!(f, "could not read {}: {source}", path.display())
            }
        }
    }
}

impl StdError for FileRejection {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            FileRejection::Unreadable { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// A file that passed validation. Only this module can build one, so
/// anything holding it has been checked for size and type.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedFile {
    file_name: String,
    mime: &'static str,
    bytes: Vec<u8>,
}

impl ValidatedFile {
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime(&self) -> &'static str {
        self.mime
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn into_parts(self) -> (String, &'static str, Vec<u8>) {
        (self.file_name, self.mime, self.bytes)
    }
}

/// Checks name, declared MIME type and size. Size is checked first so an
/// oversized file is never read.
pub fn validate(
    file_name: &str,
    mime: Option<&str>,
    size: u64,
) -> Result<&'static str, FileRejection> {
    if size > MAX_UPLOAD_BYTES {
        return Err(FileRejection::TooLarge {
            file_name: file_name.to_string(),
            size,
        });
    }
    let declared = mime.map(str::to_string);
    let resolved = match mime {
        Some(mime) => allowed_mime(mime),
        None => mime_for_path(Path::new(file_name)),
    };
    resolved.ok_or(FileRejection::UnsupportedType {
        file_name: file_name.to_string(),
        mime: declared,
    })
}

/// Validates and loads bytes that are already in memory.
pub fn accept_bytes(
    file_name: &str,
    mime: Option<&str>,
    bytes: Vec<u8>,
) -> Result<ValidatedFile, FileRejection> {
    let mime = validate(file_name, mime, bytes.len() as u64)?;
    Ok(ValidatedFile {
        file_name: file_name.to_string(),
        mime,
        bytes,
    })
}

/// Validates a file on disk and reads it. The MIME type comes from the
/// extension.
pub async fn load(path: &Path) -> Result<ValidatedFile, FileRejection> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let unreadable = |source: std::io::Error| FileRejection::Unreadable {
        path: path.to_path_buf(),
        source,
    };

    let metadata = tokio::fs::metadata(path).await.map_err(unreadable)?;
    if !metadata.is_file() {
        return Err(unreadable(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "not a regular file",
        )));
    }
    let mime = validate(&file_name, None, metadata.len())?;
    let bytes = tokio::fs::read(path).await.map_err(unreadable)?;
    // The file may have grown between the metadata check and the read.
    validate(&file_name, Some(mime), bytes.len() as u64)?;

    debug!(file = %file_name, mime, size = bytes.len(), "file accepted for upload");
    Ok(ValidatedFile {
        file_name,
        mime,
        bytes,
    })
}

/// Recognises a path pasted by a terminal drag-and-drop. Handles quoting,
/// `file://` URLs, backslash-escaped spaces and a leading `~`. Returns the
/// path only when it names an existing file.
pub fn parse_dropped_path(input: &str) -> Option<PathBuf> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed.contains('\n') {
        return None;
    }

    let unquoted = strip_matching_quotes(trimmed);
    let candidate = if let Some(rest) = unquoted.strip_prefix("file://") {
        percent_decode(rest)?
    } else if unquoted != trimmed {
        unquoted.to_string()
    } else {
        unescape_backslashes(unquoted)
    };

    let path = expand_home(&candidate);
    path.is_file().then_some(path)
}

fn strip_matching_quotes(input: &str) -> &str {
    for quote in ['\'', '"'] {
        if input.len() >= 2 && input.starts_with(quote) && input.ends_with(quote) {
            return &input[1..input.len() - 1];
        }
    }
    input
}

fn unescape_backslashes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
                continue;
            }
        }
        out.push(ch);
    }
    out
}

fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        if bytes[index] == b'%' {
            let hex = input.get(index + 1..index + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            index += 3;
        } else {
            out.push(bytes[index]);
            index += 1;
        }
    }
    String::from_utf8(out).ok()
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(dirs) = directories::UserDirs::new() {
            return dirs.home_dir().join(rest);
        }
    }
    PathBuf::from(path)
}
