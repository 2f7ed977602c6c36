//! Response formats for the RETS (Real Estate Transaction Standard) protocol
//!
//! This crate holds everything that turns a raw RETS HTTP body into structured
//! data. It performs no I/O; `rets-client` feeds it the bytes it received.
//!
//! # Supported Payloads
//!
//! - **Envelope**: the `<RETS ReplyCode=".." ReplyText="..">` wrapper every
//!   transaction answers with, see [`envelope`]
//! - **Key/value**: login and logout bodies (`Key=Value` lines)
//! - **COMPACT**: delimiter separated `<COLUMNS>` / `<DATA>` tables used by
//!   Search and GetMetadata, see [`compact`]
//! - **Multipart**: `multipart/parallel` GetObject bodies, see [`multipart`]
//!
//! # Example
//!
//! ```
//! use rets_formats::{Format, envelope};
//!
//! let body = "<RETS ReplyCode=\"0\" ReplyText=\"Success\">\n\
//!             <DELIMITER value=\"7C\"/>\n\
//!             <COLUMNS>|ListingID|City|</COLUMNS>\n\
//!             <DATA>|1001|Springfield|</DATA>\n\
//!             </RETS>";
//!
//! let transaction = envelope::parse_tabular(body.as_bytes(), Format::Compact, None)
//!     .expect("valid COMPACT body");
//! let table = transaction.table().expect("search replies carry a table");
//! let row = table.rows().next().expect("one row");
//! assert_eq!(row.get("City"), Some("Springfield"));
//! ```

pub mod compact;
pub mod envelope;
pub mod error;
pub mod format;
pub mod multipart;
pub mod object;
pub mod reply;
pub mod transaction;

pub use compact::{CompactDecoder, Row, Rows, Table};
pub use error::{FormatError, Result};
pub use format::{Format, TabularDecoder};
pub use object::{DataObject, ObjectHeaders};
pub use reply::{NO_RECORDS_FOUND, ReplyError, ReplyKind};
pub use transaction::{ActionResponse, Payload, Transaction};
