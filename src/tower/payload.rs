//! Request and response body encoding
//!
//! Outgoing bodies are either JSON or a single-part `multipart/form-data`
//! file upload. Incoming bodies are decoded as JSON when the server says so
//! and handed back untouched otherwise.

use super::error::{Result, TowerError};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::io::{Read, Seek, SeekFrom};

pub const JSON_CONTENT_TYPE: &str = "application/json";
const OCTET_STREAM: &str = "application/octet-stream";
/// Bytes inspected when sniffing an upload.
const SNIFF_LEN: usize = 3072;

/// An encoded request body plus the `Content-Type` to send with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Empty,
    Bytes { data: Bytes, content_type: String },
}

impl Body {
    pub fn content_type(&self) -> Option<&str> {
        match self {
            Self::Empty => None,
            Self::Bytes { content_type, .. } => Some(content_type),
        }
    }

    pub fn bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Empty => None,
            Self::Bytes { data, .. } => Some(data),
        }
    }
}

/// Serialize a request structure.
///
/// Field omission is decided by the structure itself (`Option` fields with
/// `skip_serializing_if`), never by inspecting values here.
pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<Body> {
    let data = serde_json::to_vec(value).map_err(|e| TowerError::Encode(e.to_string()))?;
    Ok(Body::Bytes {
        data: Bytes::from(data),
        content_type: JSON_CONTENT_TYPE.to_string(),
    })
}

/// Build a `multipart/form-data` body with a single `file` part.
///
/// The part content type is sniffed from the first bytes of `source`, which
/// is then rewound so the uploaded bytes are exactly the sniffed ones.
pub fn encode_multipart<R: Read + Seek>(mut source: R, filename: &str) -> Result<Body> {
    let mut head = Vec::with_capacity(SNIFF_LEN);
    (&mut source)
        .take(SNIFF_LEN as u64)
        .read_to_end(&mut head)
        .map_err(|e| TowerError::Encode(format!("failed to read upload: {e}")))?;
    let part_type = sniff_content_type(&head);

    source
        .seek(SeekFrom::Start(0))
        .map_err(|e| TowerError::Encode(format!("failed to rewind upload: {e}")))?;
    let mut contents = Vec::new();
    source
        .read_to_end(&mut contents)
        .map_err(|e| TowerError::Encode(format!("failed to read upload: {e}")))?;

    let boundary = format!("nftower-{}", uuid::Uuid::new_v4().simple());
    let filename = filename.replace(['"', '\r', '\n'], "_");

    let mut data = Vec::with_capacity(contents.len() + 256);
    data.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    data.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    data.extend_from_slice(format!("Content-Type: {part_type}\r\n\r\n").as_bytes());
    data.extend_from_slice(&contents);
    data.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Ok(Body::Bytes {
        data: Bytes::from(data),
        content_type: format!("multipart/form-data; boundary={boundary}"),
    })
}

/// Guess a MIME type from leading bytes.
///
/// Binary formats go through magic-number detection; text is classified by
/// shape (JSON, CSV, TSV, plain).
pub fn sniff_content_type(head: &[u8]) -> String {
    if head.is_empty() {
        return "text/plain".to_string();
    }
    if let Some(kind) = infer::get(head) {
        return kind.mime_type().to_string();
    }

    let Some(text) = utf8_prefix(head) else {
        return OCTET_STREAM.to_string();
    };
    if text.chars().any(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t')) {
        return OCTET_STREAM.to_string();
    }

    let trimmed = text.trim_start();
    if (trimmed.starts_with('{') || trimmed.starts_with('['))
        && serde_json::from_str::<Value>(text).is_ok()
    {
        return JSON_CONTENT_TYPE.to_string();
    }
    let truncated = head.len() >= SNIFF_LEN;
    if looks_delimited(text, '\t', truncated) {
        return "text/tab-separated-values".to_string();
    }
    if looks_delimited(text, ',', truncated) {
        return "text/csv".to_string();
    }
    "text/plain".to_string()
}

/// Decode the sniff window as UTF-8, tolerating a codepoint cut at the end.
fn utf8_prefix(head: &[u8]) -> Option<&str> {
    match std::str::from_utf8(head) {
        Ok(text) => Some(text),
        Err(e) if e.error_len().is_none() && e.valid_up_to() > 0 => {
            std::str::from_utf8(&head[..e.valid_up_to()]).ok()
        }
        Err(_) => None,
    }
}

/// At least two complete lines, each with the same non-zero delimiter count.
fn looks_delimited(text: &str, delimiter: char, truncated: bool) -> bool {
    let mut lines: Vec<&str> = text.lines().filter(|l| !l.is_empty()).collect();
    // The last line may be cut by the sniff window.
    if truncated && !text.ends_with('\n') {
        lines.pop();
    }
    if lines.len() < 2 {
        return false;
    }
    let columns = lines[0].matches(delimiter).count();
    columns > 0 && lines.iter().all(|l| l.matches(delimiter).count() == columns)
}

/// A decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Empty,
    Json(Value),
    Raw(Bytes),
}

impl Payload {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Strictly decode a JSON payload into `T`.
    pub fn into_json<T: DeserializeOwned>(self) -> Result<T> {
        match self {
            Self::Json(value) => Ok(serde_json::from_value(value)?),
            Self::Empty => Err(TowerError::EmptyResponse),
            Self::Raw(_) => Err(TowerError::Decode(
                "expected a JSON response body".to_string(),
            )),
        }
    }

    /// Raw response bytes; JSON payloads are re-serialized.
    pub fn into_bytes(self) -> Bytes {
        match self {
            Self::Empty => Bytes::new(),
            Self::Raw(bytes) => bytes,
            Self::Json(value) => Bytes::from(value.to_string()),
        }
    }
}

/// Whether a `Content-Type` header value denotes JSON.
pub fn is_json_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|essence| essence.trim().eq_ignore_ascii_case(JSON_CONTENT_TYPE))
        .unwrap_or(false)
}

/// Decode a response body according to its declared content type.
pub fn decode(body: Bytes, content_type: Option<&str>) -> Result<Payload> {
    if body.is_empty() {
        return Ok(Payload::Empty);
    }
    match content_type {
        Some(ct) if is_json_content_type(ct) => Ok(Payload::Json(serde_json::from_slice(&body)?)),
        _ => Ok(Payload::Raw(body)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_sniff_csv() {
        assert_eq!(sniff_content_type(b"a,b\n1,2\n"), "text/csv");
    }

    #[test]
    fn test_sniff_tsv() {
        assert_eq!(
            sniff_content_type(b"a\tb\n1\t2\n"),
            "text/tab-separated-values"
        );
    }

    #[test]
    fn test_sniff_json_and_text() {
        assert_eq!(sniff_content_type(br#"{"a": 1}"#), JSON_CONTENT_TYPE);
        assert_eq!(sniff_content_type(b"hello world"), "text/plain");
    }

    #[test]
    fn test_sniff_binary_magic() {
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        assert_eq!(sniff_content_type(&png), "image/png");
        assert_eq!(sniff_content_type(&[0u8, 1, 2, 3]), OCTET_STREAM);
    }

    #[test]
    fn test_multipart_embeds_original_bytes() {
        let body = encode_multipart(Cursor::new(b"a,b\n1,2\n".to_vec()), "x.csv").unwrap();
        let content_type = body.content_type().unwrap().to_string();
        assert!(content_type.starts_with("multipart/form-data; boundary="));

        let text = String::from_utf8(body.bytes().unwrap().to_vec()).unwrap();
        assert!(text.contains("name=\"file\"; filename=\"x.csv\""));
        assert!(text.contains("Content-Type: text/csv\r\n\r\na,b\n1,2\n\r\n"));
        let boundary = content_type.split("boundary=").nth(1).unwrap();
        assert!(text.ends_with(&format!("--{boundary}--\r\n")));
    }

    #[test]
    fn test_multipart_rewinds_partially_read_source() {
        let mut cursor = Cursor::new(b"a,b\n1,2\n".to_vec());
        cursor.set_position(4);
        let body = encode_multipart(cursor, "x.csv").unwrap();
        let text = String::from_utf8(body.bytes().unwrap().to_vec()).unwrap();
        assert!(text.contains("\r\n\r\na,b\n1,2\n\r\n"));
    }

    #[test]
    fn test_decode_by_content_type() {
        let json = decode(Bytes::from_static(b"{\"a\":1}"), Some("application/json")).unwrap();
        assert_eq!(json, Payload::Json(serde_json::json!({"a": 1})));

        let json = decode(
            Bytes::from_static(b"[1]"),
            Some("application/json; charset=utf-8"),
        )
        .unwrap();
        assert!(matches!(json, Payload::Json(_)));

        let raw = decode(Bytes::from_static(b"a,b\n"), Some("text/csv")).unwrap();
        assert_eq!(raw, Payload::Raw(Bytes::from_static(b"a,b\n")));

        assert_eq!(decode(Bytes::new(), Some("application/json")).unwrap(), Payload::Empty);
    }

    #[test]
    fn test_decode_invalid_json_is_error() {
        let err = decode(Bytes::from_static(b"{nope"), Some("application/json")).unwrap_err();
        assert!(matches!(err, TowerError::Decode(_)));
    }
}
