//! Results of a completed RETS exchange

use crate::compact::Table;
use crate::reply;
use bytes::Bytes;
use std::collections::BTreeMap;

/// Decoded body of a transaction
#[derive(Debug, Clone)]
pub enum Payload {
    /// `Key=Value` pairs, e.g. the capability list of a login reply
    KeyValue(BTreeMap<String, String>),
    /// COMPACT rows from Search or GetMetadata
    Table(Table),
    /// Envelope without a body
    Empty,
}

/// Raw reply from the action URL a server may name at login
#[derive(Debug, Clone)]
pub struct ActionResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// One completed protocol exchange
#[derive(Debug, Clone)]
pub struct Transaction {
    reply_code: u32,
    reply_text: String,
    payload: Payload,
    count: Option<u64>,
    max_rows: bool,
    secondary: Option<ActionResponse>,
}

impl Transaction {
    pub fn new(reply_code: u32, reply_text: impl Into<String>, payload: Payload) -> Self {
        Self {
            reply_code,
            reply_text: reply_text.into(),
            payload,
            count: None,
            max_rows: false,
            secondary: None,
        }
    }

    /// Attach the `<COUNT Records="n"/>` value
    pub fn with_count(mut self, count: Option<u64>) -> Self {
        self.count = count;
        self
    }

    /// Mark that the server truncated the result (`<MAXROWS/>`)
    pub fn with_max_rows(mut self, max_rows: bool) -> Self {
        self.max_rows = max_rows;
        self
    }

    /// Attach the result of following the login action URL
    pub fn with_secondary(mut self, secondary: Option<ActionResponse>) -> Self {
        self.secondary = secondary;
        self
    }

    pub fn reply_code(&self) -> u32 {
        self.reply_code
    }

    pub fn reply_text(&self) -> &str {
        &self.reply_text
    }

    /// Reply code is 0 or "No Records Found"
    pub fn success(&self) -> bool {
        reply::is_success(self.reply_code)
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn into_payload(self) -> Payload {
        self.payload
    }

    pub fn count(&self) -> Option<u64> {
        self.count
    }

    pub fn max_rows(&self) -> bool {
        self.max_rows
    }

    pub fn secondary(&self) -> Option<&ActionResponse> {
        self.secondary.as_ref()
    }

    /// Key/value payload, if this is a login or logout reply
    pub fn key_values(&self) -> Option<&BTreeMap<String, String>> {
        match &self.payload {
            Payload::KeyValue(map) => Some(map),
            _ => None,
        }
    }

    /// Table payload, if this is a search or metadata reply
    pub fn table(&self) -> Option<&Table> {
        match &self.payload {
            Payload::Table(table) => Some(table),
            _ => None,
        }
    }
}
