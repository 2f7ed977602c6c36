//! GetObject results

use bytes::Bytes;
use serde::Serialize;

/// Ordered object headers with case-insensitive lookup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ObjectHeaders(Vec<(String, String)>);

impl ObjectHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a header block of `Name: value` lines
    ///
    /// Lines without a colon are ignored. Names and values are trimmed.
    pub fn parse(block: &str) -> Self {
        let mut headers = Self::new();
        for line in block.lines() {
            if let Some((name, value)) = line.split_once(':') {
                let name = name.trim();
                if !name.is_empty() {
                    headers.insert(name, value.trim());
                }
            }
        }
        headers
    }

    /// Set a header, replacing an existing value of the same name
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .0
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A binary or text object returned by GetObject, e.g. a listing photo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataObject {
    headers: ObjectHeaders,
    data: Bytes,
}

impl DataObject {
    pub fn new(headers: ObjectHeaders, data: Bytes) -> Self {
        Self { headers, data }
    }

    pub fn headers(&self) -> &ObjectHeaders {
        &self.headers
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn into_parts(self) -> (ObjectHeaders, Bytes) {
        (self.headers, self.data)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("Content-Type")
    }

    /// Resource entity the object belongs to, usually the listing key
    pub fn content_id(&self) -> Option<&str> {
        self.headers.get("Content-ID")
    }

    /// Position of the object within its entity (1-based, 0 for the preferred object)
    pub fn object_id(&self) -> Option<&str> {
        self.headers.get("Object-ID")
    }

    pub fn description(&self) -> Option<&str> {
        self.headers.get("Content-Description")
    }

    /// URL of the object when it was requested with `Location=1`
    pub fn location(&self) -> Option<&str> {
        self.headers.get("Location")
    }

    /// Conventional file extension for the object's content type
    pub fn extension(&self) -> Option<&'static str> {
        let content_type = self.content_type()?;
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match mime.as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("jpg"),
            "image/gif" => Some("gif"),
            "image/png" => Some("png"),
            "image/tiff" => Some("tif"),
            "image/webp" => Some("webp"),
            "application/pdf" => Some("pdf"),
            "text/plain" => Some("txt"),
            "text/xml" | "application/xml" => Some("xml"),
            _ => None,
        }
    }
}
