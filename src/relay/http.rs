//! Just enough HTTP/1.1 for the relay: one request per connection,
//! `Content-Length` or chunked bodies, JSON responses, `Connection: close`.

use std::error::Error as StdError;
use std::fmt;
use std::io;

use reqwest::StatusCode;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const MAX_HEAD_BYTES: usize = 64 * 1024;
const READ_CHUNK: usize = 8 * 1024;

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug)]
pub enum RequestError {
    Io(io::Error),
    /// Peer closed the connection before a full request arrived.
    Closed,
    Malformed(&'static str),
    TooLarge { limit: usize },
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::Io(source) => write!(f, "failed to read request: {source}"),
            RequestError::Closed => write!(f, "connection closed before request completed"),
            RequestError::Malformed(what) => write!(f, "malformed request: {what}"),
            RequestError::TooLarge { limit } => {
                write!(f, "request exceeds {limit} bytes")
            }
        }
    }
}

impl StdError for RequestError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            RequestError::Io(source) => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for RequestError {
    fn from(source: io::Error) -> Self {
        RequestError::Io(source)
    }
}

async fn fill<R: AsyncRead + Unpin>(
    reader: &mut R,
    buffer: &mut Vec<u8>,
) -> Result<(), RequestError> {
    let mut chunk = [0_u8; READ_CHUNK];
    let read = reader.read(&mut chunk).await?;
    if read == 0 {
        return Err(RequestError::Closed);
    }
    buffer.extend_from_slice(&chunk[..read]);
    Ok(())
}

fn find_head_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|window| window == b"\r\n\r\n")
}

pub async fn read_request<R: AsyncRead + Unpin>(
    reader: &mut R,
    max_body: usize,
) -> Result<HttpRequest, RequestError> {
    let mut buffer = Vec::with_capacity(READ_CHUNK);
    let head_end = loop {
        if let Some(end) = find_head_end(&buffer) {
            break end;
        }
        if buffer.len() > MAX_HEAD_BYTES {
            return Err(RequestError::TooLarge {
                limit: MAX_HEAD_BYTES,
            });
        }
        fill(reader, &mut buffer).await?;
    };

    let head = std::str::from_utf8(&buffer[..head_end])
        .map_err(|_| RequestError::Malformed("request head is not UTF-8"))?;
    let mut lines = head.split("\r\n");
    let request_line = lines
        .next()
        .ok_or(RequestError::Malformed("request line missing"))?;
    let mut parts = request_line.split_whitespace();
    let method = parts
        .next()
        .ok_or(RequestError::Malformed("method missing"))?
        .to_string();
    let target = parts
        .next()
        .ok_or(RequestError::Malformed("target missing"))?;
    let path = target.split('?').next().unwrap_or(target).to_string();

    let mut headers = Vec::new();
    for line in lines.filter(|line| !line.is_empty()) {
        let (name, value) = line
            .split_once(':')
            .ok_or(RequestError::Malformed("header without colon"))?;
        headers.push((name.trim().to_string(), value.trim().to_string()));
    }

    let mut request = HttpRequest {
        method,
        path,
        headers,
        body: Vec::new(),
    };
    let mut rest = buffer.split_off(head_end + 4);

    let chunked = request
        .header("transfer-encoding")
        .is_some_and(|value| value.eq_ignore_ascii_case("chunked"));
    if chunked {
        request.body = loop {
            if let Some(body) = decode_chunked(&rest, max_body)? {
                break body;
            }
            if rest.len() > max_body + MAX_HEAD_BYTES {
                return Err(RequestError::TooLarge { limit: max_body });
            }
            fill(reader, &mut rest).await?;
        };
        return Ok(request);
    }

    let length = match request.header("content-length") {
        Some(value) => value
            .parse::<usize>()
            .map_err(|_| RequestError::Malformed("invalid content-length"))?,
        None => 0,
    };
    if length > max_body {
        return Err(RequestError::TooLarge { limit: max_body });
    }
    while rest.len() < length {
        fill(reader, &mut rest).await?;
    }
    rest.truncate(length);
    request.body = rest;
    Ok(request)
}

/// Decodes a complete chunked body, or returns `None` when more input is
/// needed. Trailers are skipped.
fn decode_chunked(input: &[u8], max_body: usize) -> Result<Option<Vec<u8>>, RequestError> {
    let mut body = Vec::new();
    let mut cursor = 0;
    loop {
        let Some(line_len) = input[cursor..].windows(2).position(|w| w == b"\r\n") else {
            return Ok(None);
        };
        let size_line = std::str::from_utf8(&input[cursor..cursor + line_len])
            .map_err(|_| RequestError::Malformed("chunk size is not UTF-8"))?;
        let size_text = size_line.split(';').next().unwrap_or("").trim();
        let size = usize::from_str_radix(size_text, 16)
            .map_err(|_| RequestError::Malformed("invalid chunk size"))?;
        cursor += line_len + 2;

        if size == 0 {
            // Final chunk: either a bare CRLF, or trailer lines ending in a
            // blank line.
            let trailer = &input[cursor..];
            let complete = trailer.starts_with(b"\r\n")
                || trailer.windows(4).any(|w| w == b"\r\n\r\n");
            return Ok(complete.then_some(body));
        }
        let too_large = || RequestError::TooLarge { limit: max_body };
        let total = body.len().checked_add(size).ok_or_else(too_large)?;
        if total > max_body {
            return Err(too_large());
        }
        let chunk_end = cursor
            .checked_add(size)
            .and_then(|end| end.checked_add(2))
            .ok_or_else(too_large)?;
        if input.len() < chunk_end {
            return Ok(None);
        }
        body.extend_from_slice(&input[cursor..cursor + size]);
        cursor = chunk_end;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn json<T: Serialize>(status: StatusCode, value: &T) -> Self {
        let body = serde_json::to_vec(value).unwrap_or_else(|_| b"{}".to_vec());
        Self { status, body }
    }

    pub fn body_json(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

pub async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &HttpResponse,
) -> io::Result<()> {
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status.as_u16(),
        response.status.canonical_reason().unwrap_or(""),
        response.body.len()
    );
    writer.write_all(head.as_bytes()).await?;
    writer.write_all(&response.body).await?;
    writer.flush().await?;
    Ok(())
}
