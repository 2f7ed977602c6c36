//! `multipart/parallel` GetObject bodies
//!
//! A GetObject request for several objects is answered with one body holding
//! every object, each part introduced by `CRLF--boundary`:
//!
//! ```text
//! preamble
//! --simple boundary
//! Content-Type: image/jpeg
//! Content-ID: 1001
//! Object-ID: 1
//!
//! <jpeg bytes>
//! --simple boundary
//! ...
//! --simple boundary--
//! ```
//!
//! Part data is sliced out of the received [`Bytes`] without copying.

use crate::object::{DataObject, ObjectHeaders};
use bytes::Bytes;
use tracing::{debug, trace};

const BLANK_LINE: &[u8] = b"\r\n\r\n";

/// Extract the `boundary` parameter of a Content-Type header
///
/// The value may be wrapped in double or single quotes.
pub fn boundary_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("boundary") {
            return None;
        }
        let boundary = unquote(value.trim());
        (!boundary.is_empty()).then(|| boundary.to_string())
    })
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

/// Decode every part of a multipart body
pub fn decode(body: &Bytes, boundary: &str) -> Vec<DataObject> {
    parts(body, boundary).collect()
}

/// Iterate the parts of a multipart body in source order
///
/// The preamble before the first boundary is discarded, parts without a
/// blank line separating headers from data are skipped, and iteration stops
/// at the closing `--boundary--` marker.
pub fn parts(body: &Bytes, boundary: &str) -> Parts {
    let delimiter = format!("\r\n--{boundary}").into_bytes();
    let opening = &delimiter[2..];

    // A body that opens directly with the boundary has an empty preamble
    let cursor = if body.starts_with(opening) {
        Some(opening.len())
    } else {
        find(body, &delimiter, 0).map(|pos| pos + delimiter.len())
    };

    if cursor.is_none() {
        debug!("Boundary '{}' not found in {} byte body", boundary, body.len());
    }

    Parts {
        body: body.clone(),
        delimiter,
        cursor,
    }
}

/// Lazy iterator over multipart parts, see [`parts`]
#[derive(Debug, Clone)]
pub struct Parts {
    body: Bytes,
    delimiter: Vec<u8>,
    cursor: Option<usize>,
}

impl Iterator for Parts {
    type Item = DataObject;

    fn next(&mut self) -> Option<DataObject> {
        loop {
            let start = self.cursor?;
            let end = find(&self.body, &self.delimiter, start);
            self.cursor = end.map(|pos| pos + self.delimiter.len());

            let segment = self.body.slice(start..end.unwrap_or(self.body.len()));
            if segment.starts_with(b"--") {
                self.cursor = None;
                return None;
            }

            match decode_part(&segment) {
                Some(object) => return Some(object),
                None => trace!("Skipping {} byte part without data", segment.len()),
            }
        }
    }
}

fn decode_part(segment: &Bytes) -> Option<DataObject> {
    let split = find(segment, BLANK_LINE, 0)?;
    let headers = ObjectHeaders::parse(&String::from_utf8_lossy(&segment[..split]));
    let data = segment.slice(split + BLANK_LINE.len()..);

    trace!(
        "Decoded part: {} headers, {} bytes of data",
        headers.len(),
        data.len()
    );
    Some(DataObject::new(headers, data))
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() || needle.is_empty() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}
