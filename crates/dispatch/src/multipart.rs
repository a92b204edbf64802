//! Buffered `multipart/form-data` bodies
//!
//! The body is encoded once into `Bytes` so a request carrying it stays
//! re-sendable: a replay after credential renewal sends the same boundary
//! and the same bytes.

use bytes::{BufMut, Bytes, BytesMut};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use uuid::Uuid;

use crate::RequestDescriptor;

/// One file field of a multipart form.
#[derive(Debug, Clone)]
pub struct FilePart<'a> {
    pub field: &'a str,
    pub filename: &'a str,
    pub content_type: &'a str,
    pub data: &'a [u8],
}

/// Encode `part` as a single-field form. Returns the `Content-Type` value
/// (with boundary) and the body.
pub fn encode_file(part: &FilePart<'_>) -> (String, Bytes) {
    let boundary = format!("----dashboard-{}", Uuid::new_v4().simple());
    let body = encode_with_boundary(part, &boundary);
    (format!("multipart/form-data; boundary={boundary}"), body)
}

fn encode_with_boundary(part: &FilePart<'_>, boundary: &str) -> Bytes {
    let mut body = BytesMut::with_capacity(part.data.len() + 256);
    body.put_slice(format!("--{boundary}\r\n").as_bytes());
    body.put_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            quote(part.field),
            quote(part.filename)
        )
        .as_bytes(),
    );
    body.put_slice(format!("Content-Type: {}\r\n\r\n", part.content_type).as_bytes());
    body.put_slice(part.data);
    body.put_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body.freeze()
}

/// Escape a disposition parameter the way browsers do.
fn quote(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

impl RequestDescriptor {
    /// Attach a single-file multipart body and the matching content type.
    pub fn with_file_part(mut self, part: &FilePart<'_>) -> Self {
        let (content_type, body) = encode_file(part);
        if let Ok(value) = HeaderValue::from_str(&content_type) {
            self.headers.insert(CONTENT_TYPE, value);
        }
        self.body = Some(body);
        self
    }
}
