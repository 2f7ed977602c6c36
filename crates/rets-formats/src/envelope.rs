//! The `<RETS>` response envelope
//!
//! Every RETS body is an XML document rooted at `RETS` carrying `ReplyCode`
//! and `ReplyText` attributes. The functions here validate the envelope, turn
//! a failing reply code into [`FormatError::Reply`] and decode the payload
//! the transaction expects.

use crate::error::{FormatError, Result};
use crate::format::Format;
use crate::reply;
use crate::transaction::{Payload, Transaction};
use roxmltree::{Document, Node, ParsingOptions};
use std::collections::BTreeMap;
use tracing::{debug, trace};

const ROOT: &str = "RETS";
const RESPONSE: &str = "RETS-RESPONSE";

/// Parse a Login or Logout reply
///
/// The payload is the text of the `RETS-RESPONSE` element, or of the root
/// element when servers omit it, read as `Key=Value` lines. An envelope with
/// no such text yields [`Payload::Empty`].
pub fn parse_key_value(body: &[u8]) -> Result<Transaction> {
    parse_envelope(body, |document| {
        let root = document.root_element();
        let text = match root.children().find(|n| n.has_tag_name(RESPONSE)) {
            Some(response) => own_text(response),
            None => own_text(root),
        };

        if text.trim().is_empty() {
            return Ok(Payload::Empty);
        }
        Ok(Payload::KeyValue(key_values(&text)))
    })
}

/// Parse a Search or GetMetadata reply with the decoder for `format`
///
/// `entity` selects the metadata block (e.g. `METADATA-CLASS`); pass `None`
/// for Search replies.
pub fn parse_tabular(body: &[u8], format: Format, entity: Option<&str>) -> Result<Transaction> {
    parse_envelope(body, |document| {
        let table = format.decoder().decode(document, entity)?;
        Ok(Payload::Table(table))
    })
}

/// Parse the XML reply a server sends instead of objects
///
/// A successful reply carries nothing; failures surface as
/// [`FormatError::Reply`].
pub fn parse_object_error(body: &[u8]) -> Result<Transaction> {
    parse_envelope(body, |_| Ok(Payload::Empty))
}

/// Split `Key=Value` lines
///
/// Keys and values are trimmed, only the first `=` separates them, and blank
/// lines or lines without `=` are skipped. A repeated key keeps its last value.
pub fn key_values(text: &str) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for line in text.lines() {
        let Some((key, value)) = line.split_once('=') else {
            if !line.trim().is_empty() {
                trace!("Skipping key/value line without '=': {}", line.trim());
            }
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        map.insert(key.to_string(), value.trim().to_string());
    }
    map
}

fn parse_envelope<F>(body: &[u8], payload: F) -> Result<Transaction>
where
    F: FnOnce(&Document<'_>) -> Result<Payload>,
{
    let text = String::from_utf8_lossy(body);
    let text = text.trim_start_matches('\u{feff}').trim();
    if text.is_empty() {
        return Err(FormatError::EmptyBody);
    }

    let mut options = ParsingOptions::default();
    options.allow_dtd = true;
    let document = Document::parse_with_options(text, options)?;

    let root = document.root_element();
    if root.tag_name().name() != ROOT {
        return Err(FormatError::InvalidRoot(root.tag_name().name().to_string()));
    }

    let code = root
        .attribute("ReplyCode")
        .ok_or(FormatError::MissingReplyCode)?;
    let reply_code = code
        .trim()
        .parse::<u32>()
        .map_err(|_| FormatError::InvalidReplyCode(code.to_string()))?;
    let reply_text = root.attribute("ReplyText").unwrap_or_default();

    debug!("RETS reply {}: {}", reply_code, reply_text);
    reply::check(reply_code, reply_text)?;

    let count = root
        .children()
        .find(|n| n.has_tag_name("COUNT"))
        .and_then(|n| n.attribute("Records"))
        .and_then(|records| records.trim().parse::<u64>().ok());
    let max_rows = root.children().any(|n| n.has_tag_name("MAXROWS"));

    let payload = payload(&document)?;

    Ok(Transaction::new(reply_code, reply_text, payload)
        .with_count(count)
        .with_max_rows(max_rows))
}

/// Concatenated text children of an element, ignoring nested elements
fn own_text(node: Node<'_, '_>) -> String {
    node.children()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}
