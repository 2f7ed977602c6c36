//! Supported tabular response formats

use crate::compact::{CompactDecoder, Table};
use crate::error::{FormatError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Decodes the body of a validated envelope into a [`Table`]
///
/// `entity` is the metadata type (e.g. `METADATA-TABLE`) for GetMetadata
/// replies and `None` for Search replies.
pub trait TabularDecoder: Send + Sync {
    fn decode(&self, document: &roxmltree::Document<'_>, entity: Option<&str>) -> Result<Table>;
}

/// Value of the `Format` request parameter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    /// Raw lookup values
    #[default]
    #[serde(rename = "COMPACT")]
    Compact,
    /// Lookup values decoded to their long names by the server
    #[serde(rename = "COMPACT-DECODED")]
    CompactDecoded,
}

impl Format {
    /// Wire name sent as the `Format` parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compact => "COMPACT",
            Self::CompactDecoded => "COMPACT-DECODED",
        }
    }

    /// Decoder for bodies in this format
    pub fn decoder(&self) -> &'static dyn TabularDecoder {
        static COMPACT: CompactDecoder = CompactDecoder;
        match self {
            Self::Compact | Self::CompactDecoded => &COMPACT,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "COMPACT" => Ok(Self::Compact),
            "COMPACT-DECODED" => Ok(Self::CompactDecoded),
            _ => Err(FormatError::UnsupportedFormat(s.to_string())),
        }
    }
}
