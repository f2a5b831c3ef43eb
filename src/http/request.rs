use regex::Regex;
use std::net::SocketAddr;
use std::sync::LazyLock;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::TcpStream;

/// Longest request or header line accepted, terminator included.
pub const MAX_LINE_BYTES: usize = 8 * 1024;

pub const CONTENT_LENGTH: &str = "Content-Length";

static HEADER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9-]+):\s*(.+)$").expect("header pattern is a valid regex")
});

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed request line: {0:?}")]
    MalformedRequestLine(String),

    #[error("Line exceeds {MAX_LINE_BYTES} bytes")]
    LineTooLong,

    #[error("Invalid Content-Length: {0:?}")]
    InvalidContentLength(String),

    #[error("Body of {length} bytes exceeds limit of {limit}")]
    BodyTooLarge { length: usize, limit: usize },

    #[error("Connection closed after {read} of {expected} body bytes")]
    TruncatedBody { expected: usize, read: usize },
}

/// Header block as received: names keep their original case, and a repeated
/// name keeps only its first value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: &str) {
        if self.get(name).is_none() {
            self.entries.push((name.to_string(), value.to_string()));
        }
    }

    /// Looks a header up by name, ignoring ASCII case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything read off the wire for one request, independent of the socket.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestFrame {
    pub method: String,
    pub target: String,
    pub version: String,
    pub headers: Headers,
    pub body: String,
}

impl RequestFrame {
    /// Request target without any `?query` suffix.
    pub fn path(&self) -> &str {
        self.target
            .split_once('?')
            .map_or(self.target.as_str(), |(path, _)| path)
    }
}

/// One parsed request together with the connection it arrived on.
///
/// Whoever consumes the request owns the stream, and dropping it closes the
/// connection, so a request can only ever be answered and closed once.
#[derive(Debug)]
pub struct Request {
    pub stream: TcpStream,
    pub peer_addr: SocketAddr,
    pub frame: RequestFrame,
}

impl Request {
    /// Reads one request off `stream`.
    ///
    /// Returns `Ok(None)` when the client closed without sending anything or
    /// sent a blank request line; callers skip such connections.
    pub async fn read(
        stream: TcpStream,
        peer_addr: SocketAddr,
        max_body: usize,
    ) -> Result<Option<Self>, (TcpStream, ParseError)> {
        let mut reader = BufReader::new(stream);
        match read_frame(&mut reader, max_body).await {
            Ok(Some(frame)) => Ok(Some(Self {
                stream: reader.into_inner(),
                peer_addr,
                frame,
            })),
            Ok(None) => Ok(None),
            Err(e) => Err((reader.into_inner(), e)),
        }
    }
}

/// Reads a line, stripping `\r\n` or `\n`. `Ok(None)` on a clean EOF.
async fn read_line<R>(reader: &mut R) -> Result<Option<String>, ParseError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let read = (&mut *reader)
        .take(MAX_LINE_BYTES as u64)
        .read_line(&mut line)
        .await?;

    if read == 0 {
        return Ok(None);
    }
    if !line.ends_with('\n') && read == MAX_LINE_BYTES {
        return Err(ParseError::LineTooLong);
    }

    let trimmed = line.trim_end_matches(['\r', '\n']).len();
    line.truncate(trimmed);
    Ok(Some(line))
}

/// Parses one request frame: request line, headers, optional body.
pub async fn read_frame<R>(reader: &mut R, max_body: usize) -> Result<Option<RequestFrame>, ParseError>
where
    R: AsyncBufRead + Unpin,
{
    let request_line = match read_line(reader).await? {
        Some(line) if !line.trim().is_empty() => line,
        _ => return Ok(None),
    };

    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
        return Err(ParseError::MalformedRequestLine(request_line));
    };
    let method = method.to_string();
    let target = target.to_string();
    let version = parts.next().unwrap_or_default().to_string();

    let headers = read_headers(reader).await?;
    let body = read_body(reader, &headers, max_body).await?;

    Ok(Some(RequestFrame {
        method,
        target,
        version,
        headers,
        body,
    }))
}

/// Reads header lines up to the blank terminator (or EOF). Lines that do not
/// look like `Name: value` are dropped with a warning.
async fn read_headers<R>(reader: &mut R) -> Result<Headers, ParseError>
where
    R: AsyncBufRead + Unpin,
{
    let mut headers = Headers::new();

    while let Some(line) = read_line(reader).await? {
        if line.is_empty() {
            break;
        }
        match HEADER_LINE.captures(&line) {
            Some(caps) => headers.insert(&caps[1], caps[2].trim_end()),
            None => tracing::warn!("Invalid header format: {:?}", line),
        }
    }

    Ok(headers)
}

async fn read_body<R>(reader: &mut R, headers: &Headers, max_body: usize) -> Result<String, ParseError>
where
    R: AsyncBufRead + Unpin,
{
    let Some(raw) = headers.get(CONTENT_LENGTH) else {
        return Ok(String::new());
    };
    let length: usize = raw
        .trim()
        .parse()
        .map_err(|_| ParseError::InvalidContentLength(raw.to_string()))?;
    if length > max_body {
        return Err(ParseError::BodyTooLarge {
            length,
            limit: max_body,
        });
    }

    let mut body = Vec::with_capacity(length);
    let read = (&mut *reader)
        .take(length as u64)
        .read_to_end(&mut body)
        .await?;
    if read < length {
        return Err(ParseError::TruncatedBody {
            expected: length,
            read,
        });
    }

    Ok(String::from_utf8_lossy(&body).into_owned())
}
