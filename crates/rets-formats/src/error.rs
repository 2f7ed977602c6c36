//! Error types for RETS response decoding

use crate::reply::ReplyError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("No transaction body was returned")]
    EmptyBody,

    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Response had invalid root element '{0}', expected 'RETS'")]
    InvalidRoot(String),

    #[error("Response is missing the ReplyCode attribute")]
    MissingReplyCode,

    #[error("Invalid ReplyCode '{0}'")]
    InvalidReplyCode(String),

    #[error("Response carries no key/value section")]
    MissingResponse,

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid DELIMITER value '{0}'")]
    InvalidDelimiter(String),

    #[error("Multipart content type '{0}' has no boundary")]
    MissingBoundary(String),

    #[error(transparent)]
    Reply(#[from] ReplyError),
}

impl FormatError {
    /// The server reply carried by this error, if it is one
    pub fn reply(&self) -> Option<&ReplyError> {
        match self {
            Self::Reply(reply) => Some(reply),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FormatError>;
