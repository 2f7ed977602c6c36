//! JSON rendering of transactions and objects

use rets_client::{DataObject, Payload, Transaction};
use serde::Serialize;
use serde_json::{Value, json};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Render a transaction with its reply, counters and payload
pub fn transaction_json(transaction: &Transaction) -> Value {
    let mut value = json!({
        "reply_code": transaction.reply_code(),
        "reply_text": transaction.reply_text(),
    });

    if let Some(count) = transaction.count() {
        value["count"] = json!(count);
    }
    if transaction.max_rows() {
        value["max_rows"] = json!(true);
    }

    match transaction.payload() {
        Payload::KeyValue(pairs) => value["response"] = json!(pairs),
        Payload::Table(table) => {
            value["columns"] = json!(table.columns());
            value["rows"] = json!(table);
        }
        Payload::Empty => {}
    }

    if let Some(action) = transaction.secondary() {
        value["action"] = json!({
            "status": action.status,
            "content_type": action.content_type,
            "body": String::from_utf8_lossy(&action.body),
        });
    }
    value
}

/// Summary of one retrieved object
#[derive(Debug, Serialize)]
pub struct ObjectSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl ObjectSummary {
    pub fn new(object: &DataObject, path: Option<PathBuf>) -> Self {
        Self {
            content_id: object.content_id().map(str::to_string),
            object_id: object.object_id().map(str::to_string),
            content_type: object.content_type().map(str::to_string),
            location: object.location().map(str::to_string),
            description: object.description().map(str::to_string),
            size: object.data().len(),
            path,
        }
    }
}

/// File name for an object: `<Content-ID>_<Object-ID>.<ext>`
///
/// `index` stands in for a missing Object-ID. Path separators in the IDs are
/// replaced so the name stays inside the output directory.
pub fn object_file_name(object: &DataObject, index: usize) -> String {
    let content_id = object.content_id().unwrap_or("object");
    let object_id = object
        .object_id()
        .map_or_else(|| index.to_string(), str::to_string);
    let extension = object.extension().unwrap_or("bin");

    format!(
        "{}_{}.{}",
        sanitize(content_id),
        sanitize(&object_id),
        extension
    )
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c => c,
        })
        .collect()
}

/// Write an object's data into `dir`, returning the file path
pub fn write_object(dir: &Path, object: &DataObject, index: usize) -> io::Result<PathBuf> {
    let path = dir.join(object_file_name(object, index));
    fs::write(&path, object.data())?;
    Ok(path)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use pretty_assertions::assert_eq;
    use rets_client::ObjectHeaders;
    use std::collections::BTreeMap;

    fn photo(content_id: &str, object_id: Option<&str>, content_type: &str) -> DataObject {
        let mut headers = ObjectHeaders::new();
        headers.insert("Content-ID", content_id);
        if let Some(object_id) = object_id {
            headers.insert("Object-ID", object_id);
        }
        headers.insert("Content-Type", content_type);
        DataObject::new(headers, Bytes::from_static(b"\xff\xd8\xff"))
    }

    #[test]
    fn test_object_file_name() {
        assert_eq!(
            object_file_name(&photo("1001", Some("3"), "image/jpeg"), 0),
            "1001_3.jpg"
        );
        assert_eq!(
            object_file_name(&photo("A/B", None, "application/x-unknown"), 4),
            "A_B_4.bin"
        );
    }

    #[test]
    fn test_write_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_object(dir.path(), &photo("1001", Some("1"), "image/gif"), 0).unwrap();
        assert_eq!(path, dir.path().join("1001_1.gif"));
        assert_eq!(fs::read(&path).unwrap(), b"\xff\xd8\xff");

        let summary = serde_json::to_value(ObjectSummary::new(
            &photo("1001", Some("1"), "image/gif"),
            Some(path),
        ))
        .unwrap();
        assert_eq!(summary["size"], 3);
        assert_eq!(summary["content_type"], "image/gif");
        assert!(summary.get("location").is_none());
    }

    #[test]
    fn test_key_value_transaction() {
        let mut pairs = BTreeMap::new();
        pairs.insert("Search".to_string(), "/rets/search".to_string());
        let transaction = Transaction::new(0, "Operation Successful", Payload::KeyValue(pairs));

        let value = transaction_json(&transaction);
        assert_eq!(
            value,
            json!({
                "reply_code": 0,
                "reply_text": "Operation Successful",
                "response": { "Search": "/rets/search" },
            })
        );
    }

    #[test]
    fn test_empty_transaction_with_count() {
        let transaction = Transaction::new(20201, "No Records Found", Payload::Empty)
            .with_count(Some(0))
            .with_max_rows(true);

        let value = transaction_json(&transaction);
        assert_eq!(value["count"], 0);
        assert_eq!(value["max_rows"], true);
        assert!(value.get("rows").is_none());
    }
}
