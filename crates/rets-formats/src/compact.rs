//! COMPACT table decoding
//!
//! COMPACT bodies embed a delimiter separated table in the RETS envelope:
//!
//! ```text
//! <RETS ReplyCode="0" ReplyText="Success">
//! <DELIMITER value="09"/>
//! <COLUMNS>\tListingID\tCity\t</COLUMNS>
//! <DATA>\t1001\tSpringfield\t</DATA>
//! </RETS>
//! ```
//!
//! Metadata replies wrap the same `COLUMNS`/`DATA` pair in one block per
//! metadata entity, e.g. `<METADATA-TABLE Resource="Property" Class="RES">`.
//!
//! Decoding keeps the raw data lines and splits them on demand, so
//! [`Table::rows`] is lazy and can be iterated any number of times.

use crate::error::{FormatError, Result};
use crate::format::TabularDecoder;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::sync::Arc;
use tracing::{debug, trace};

/// Delimiter used when the body declares none
pub const DEFAULT_DELIMITER: char = '\t';

/// Metadata entity that carries a single `SYSTEM` element instead of columns
const METADATA_SYSTEM: &str = "METADATA-SYSTEM";

/// Decoder for `COMPACT` and `COMPACT-DECODED` bodies
#[derive(Debug, Clone, Copy, Default)]
pub struct CompactDecoder;

impl TabularDecoder for CompactDecoder {
    fn decode(&self, document: &roxmltree::Document<'_>, entity: Option<&str>) -> Result<Table> {
        let root = document.root_element();
        let delimiter = declared_delimiter(root)?;

        let table = match entity {
            None => decode_block(root, delimiter),
            Some(entity) => decode_metadata(root, entity, delimiter),
        };

        debug!(
            "Decoded COMPACT table: {} columns, {} rows",
            table.columns.len(),
            table.records.len()
        );
        Ok(table)
    }
}

/// Read `<DELIMITER value="HH"/>`, a two digit hex ASCII code
fn declared_delimiter(root: roxmltree::Node<'_, '_>) -> Result<char> {
    let Some(element) = root.children().find(|n| n.has_tag_name("DELIMITER")) else {
        return Ok(DEFAULT_DELIMITER);
    };
    let Some(value) = element.attribute("value") else {
        return Ok(DEFAULT_DELIMITER);
    };

    u8::from_str_radix(value.trim(), 16)
        .map(char::from)
        .map_err(|_| FormatError::InvalidDelimiter(value.to_string()))
}

fn decode_block(block: roxmltree::Node<'_, '_>, delimiter: char) -> Table {
    let Some(header) = block.children().find(|n| n.has_tag_name("COLUMNS")) else {
        return Table::empty(delimiter);
    };

    let columns: Arc<[String]> = split_line(header.text().unwrap_or_default(), delimiter)
        .into_iter()
        .map(str::to_string)
        .collect();

    Table {
        columns,
        records: data_lines(block),
        delimiter,
    }
}

fn decode_metadata(root: roxmltree::Node<'_, '_>, entity: &str, delimiter: char) -> Table {
    let mut blocks = root
        .children()
        .filter(|n| n.is_element() && n.tag_name().name().eq_ignore_ascii_case(entity));

    let Some(first) = blocks.next() else {
        debug!("No {} block in metadata reply", entity);
        return Table::empty(delimiter);
    };

    if entity.eq_ignore_ascii_case(METADATA_SYSTEM) && !has_child(first, "COLUMNS") {
        return system_table(first, delimiter);
    }

    let mut table = decode_block(first, delimiter);
    for block in blocks {
        // ID=* returns one block per parent entity, all sharing one column set
        table.records.extend(data_lines(block));
    }
    table
}

/// `METADATA-SYSTEM` has no COLUMNS; its `SYSTEM` attributes become one row
fn system_table(block: roxmltree::Node<'_, '_>, delimiter: char) -> Table {
    let mut columns = Vec::new();
    let mut cells = Vec::new();

    if let Some(system) = block.children().find(|n| n.has_tag_name("SYSTEM")) {
        for attribute in system.attributes() {
            columns.push(attribute.name().to_string());
            cells.push(attribute.value().to_string());
        }
    }
    if let Some(comments) = block.children().find(|n| n.has_tag_name("COMMENTS")) {
        columns.push("COMMENTS".to_string());
        cells.push(comments.text().unwrap_or_default().trim().to_string());
    }

    if columns.is_empty() {
        return Table::empty(delimiter);
    }

    Table {
        columns: columns.into(),
        records: vec![Record::Cells(cells)],
        delimiter,
    }
}

fn has_child(node: roxmltree::Node<'_, '_>, name: &str) -> bool {
    node.children().any(|n| n.has_tag_name(name))
}

fn data_lines(block: roxmltree::Node<'_, '_>) -> Vec<Record> {
    block
        .children()
        .filter(|n| n.has_tag_name("DATA"))
        .map(|n| Record::Line(n.text().unwrap_or_default().to_string()))
        .collect()
}

/// Split a COLUMNS or DATA line
///
/// Lines are normally framed by a leading and a trailing delimiter, which
/// produce one empty token at each end. Those two tokens are dropped; empty
/// tokens in between are real empty cells.
pub fn split_line(line: &str, delimiter: char) -> Vec<&str> {
    let line = line.trim_matches(|c: char| c == '\r' || c == '\n');
    let mut tokens: Vec<&str> = line.split(delimiter).collect();

    if tokens.first().is_some_and(|t| t.is_empty()) {
        tokens.remove(0);
    }
    if tokens.last().is_some_and(|t| t.is_empty()) {
        tokens.pop();
    }
    tokens
}

#[derive(Debug, Clone)]
enum Record {
    /// Raw DATA text, split when the row is built
    Line(String),
    /// Pre-split cells
    Cells(Vec<String>),
}

/// A decoded COMPACT table
#[derive(Debug, Clone)]
pub struct Table {
    columns: Arc<[String]>,
    records: Vec<Record>,
    delimiter: char,
}

impl Table {
    fn empty(delimiter: char) -> Self {
        Self {
            columns: Arc::from(Vec::new()),
            records: Vec::new(),
            delimiter,
        }
    }

    /// Column names in declared order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Delimiter the table was decoded with
    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table has no data rows
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate rows in source order
    pub fn rows(&self) -> Rows<'_> {
        Rows {
            table: self,
            index: 0,
        }
    }

    /// Get a row by position
    pub fn row(&self, index: usize) -> Option<Row> {
        self.records.get(index).map(|record| self.build_row(record))
    }

    fn build_row(&self, record: &Record) -> Row {
        let width = self.columns.len();
        let mut values: Vec<String> = match record {
            Record::Line(line) => split_line(line, self.delimiter)
                .into_iter()
                .map(str::to_string)
                .collect(),
            Record::Cells(cells) => cells.clone(),
        };

        if values.len() > width {
            trace!(
                "Dropping {} surplus cells from row with {} columns",
                values.len() - width,
                width
            );
        }
        values.resize(width, String::new());

        Row {
            columns: Arc::clone(&self.columns),
            values,
        }
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = Row;
    type IntoIter = Rows<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows()
    }
}

impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.rows())
    }
}

/// Lazy iterator over the rows of a [`Table`]
#[derive(Debug, Clone)]
pub struct Rows<'a> {
    table: &'a Table,
    index: usize,
}

impl Iterator for Rows<'_> {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        let row = self.table.row(self.index)?;
        self.index += 1;
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.table.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Rows<'_> {}

/// One table row: column name to cell value, in column order
///
/// Every row of a table has exactly one value per column; short DATA lines
/// are padded with empty strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<String>,
}

impl Row {
    /// Get a cell by column name
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
            .map(String::as_str)
    }

    /// Get a cell by column position
    pub fn get_index(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    /// Column names in order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Cell values in column order
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// `(column, value)` pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn decode(xml: &str, entity: Option<&str>) -> Table {
        let document = roxmltree::Document::parse(xml).expect("Test XML should parse");
        CompactDecoder
            .decode(&document, entity)
            .expect("Test operation should succeed")
    }

    fn cells(row: &Row) -> Vec<(&str, &str)> {
        row.iter().collect()
    }

    #[test]
    fn test_pipe_delimited_rows() {
        let table = decode(
            r#"<RETS ReplyCode="0" ReplyText="OK">
<DELIMITER value="7C"/>
<COLUMNS>A|B|C</COLUMNS>
<DATA>1|2|3</DATA>
<DATA>4||6</DATA>
</RETS>"#,
            None,
        );

        assert_eq!(table.columns(), ["A", "B", "C"]);
        let rows: Vec<Row> = table.rows().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(cells(&rows[0]), vec![("A", "1"), ("B", "2"), ("C", "3")]);
        assert_eq!(cells(&rows[1]), vec![("A", "4"), ("B", ""), ("C", "6")]);
    }

    #[test]
    fn test_boundary_delimiters_are_dropped() {
        let table = decode(
            "<RETS ReplyCode=\"0\" ReplyText=\"OK\">\
             <COLUMNS>\tListingID\tCity\tPrice\t</COLUMNS>\
             <DATA>\t1001\tSpringfield\t\t</DATA>\
             </RETS>",
            None,
        );

        assert_eq!(table.delimiter(), '\t');
        assert_eq!(table.columns(), ["ListingID", "City", "Price"]);
        let row = table.row(0).unwrap();
        assert_eq!(row.get("ListingID"), Some("1001"));
        assert_eq!(row.get("City"), Some("Springfield"));
        assert_eq!(row.get("Price"), Some(""));
    }

    #[test]
    fn test_short_line_is_padded() {
        let table = decode(
            r#"<RETS ReplyCode="0" ReplyText="OK">
<DELIMITER value="7C"/>
<COLUMNS>|A|B|C|</COLUMNS>
<DATA>|1|</DATA>
<DATA></DATA>
</RETS>"#,
            None,
        );

        let rows: Vec<Row> = table.rows().collect();
        assert_eq!(rows[0].values(), ["1", "", ""]);
        assert_eq!(rows[1].values(), ["", "", ""]);
    }

    #[test]
    fn test_surplus_cells_are_ignored() {
        let table = decode(
            r#"<RETS ReplyCode="0" ReplyText="OK">
<DELIMITER value="7C"/>
<COLUMNS>A|B</COLUMNS>
<DATA>1|2|3</DATA>
</RETS>"#,
            None,
        );

        assert_eq!(table.row(0).unwrap().values(), ["1", "2"]);
    }

    #[test]
    fn test_rows_are_restartable() {
        let table = decode(
            r#"<RETS ReplyCode="0" ReplyText="OK">
<DELIMITER value="2C"/>
<COLUMNS>X,Y</COLUMNS>
<DATA>1,2</DATA>
<DATA>3,4</DATA>
</RETS>"#,
            None,
        );

        let first: Vec<Row> = table.rows().collect();
        let second: Vec<Row> = (&table).into_iter().collect();
        assert_eq!(first, second);
        assert_eq!(table.rows().len(), 2);
    }

    #[test]
    fn test_no_columns_yields_empty_table() {
        let table = decode(
            r#"<RETS ReplyCode="20201" ReplyText="No Records Found"/>"#,
            None,
        );
        assert!(table.is_empty());
        assert!(table.columns().is_empty());
    }

    #[test]
    fn test_invalid_delimiter() {
        let document =
            roxmltree::Document::parse(r#"<RETS ReplyCode="0"><DELIMITER value="zz"/></RETS>"#)
                .unwrap();
        let result = CompactDecoder.decode(&document, None);
        assert!(matches!(result, Err(FormatError::InvalidDelimiter(_))));
    }

    #[test]
    fn test_metadata_blocks_are_concatenated() {
        let table = decode(
            "<RETS ReplyCode=\"0\" ReplyText=\"Operation Successful\">\
             <METADATA-TABLE Resource=\"Property\" Class=\"RES\" Version=\"1.0\">\
             <COLUMNS>\tSystemName\tLongName\t</COLUMNS>\
             <DATA>\tL_ListPrice\tList Price\t</DATA>\
             </METADATA-TABLE>\
             <METADATA-TABLE Resource=\"Property\" Class=\"LND\" Version=\"1.0\">\
             <COLUMNS>\tSystemName\tLongName\t</COLUMNS>\
             <DATA>\tL_Acres\tAcres\t</DATA>\
             </METADATA-TABLE>\
             </RETS>",
            Some("METADATA-TABLE"),
        );

        assert_eq!(table.columns(), ["SystemName", "LongName"]);
        let names: Vec<String> = table
            .rows()
            .map(|r| r.get("LongName").unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["List Price", "Acres"]);
    }

    #[test]
    fn test_metadata_system_row() {
        let table = decode(
            r#"<RETS ReplyCode="0" ReplyText="OK">
<METADATA-SYSTEM Version="1.00.000" Date="2024-01-01T00:00:00">
<SYSTEM SystemID="DEMO" SystemDescription="Demo MLS"/>
<COMMENTS>Test server</COMMENTS>
</METADATA-SYSTEM>
</RETS>"#,
            Some("METADATA-SYSTEM"),
        );

        assert_eq!(
            table.columns(),
            ["SystemID", "SystemDescription", "COMMENTS"]
        );
        let row = table.row(0).unwrap();
        assert_eq!(row.get("SystemID"), Some("DEMO"));
        assert_eq!(row.get("COMMENTS"), Some("Test server"));
    }

    #[test]
    fn test_missing_metadata_block() {
        let table = decode(
            r#"<RETS ReplyCode="0" ReplyText="OK"></RETS>"#,
            Some("METADATA-CLASS"),
        );
        assert!(table.is_empty());
    }

    #[test]
    fn test_row_serializes_in_column_order() {
        let table = decode(
            r#"<RETS ReplyCode="0" ReplyText="OK">
<DELIMITER value="7C"/>
<COLUMNS>Zeta|Alpha</COLUMNS>
<DATA>z|a</DATA>
</RETS>"#,
            None,
        );

        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"[{"Zeta":"z","Alpha":"a"}]"#);
    }
}
