//! Error types for RETS client operations

use crate::session::Capability;
use reqwest::StatusCode;
use rets_formats::{FormatError, ReplyError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetsError {
    /// Login was refused, or the server kept challenging past the retry budget
    #[error("Login failed ({code}): {reason}")]
    Login { code: u32, reason: String },

    #[error("Unsupported RETS version: {0}")]
    UnsupportedVersion(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The server answered with a failing reply code
    #[error(transparent)]
    Reply(ReplyError),

    #[error("Parse error: {0}")]
    Parse(FormatError),

    #[error("HTTP status {status} from {url}")]
    HttpStatus { status: StatusCode, url: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Server did not advertise the {0} capability")]
    MissingCapability(Capability),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Action URL could not be followed: {reason}")]
    ActionFailed { reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RetsError {
    /// The server reply behind this error, if it is one
    pub fn reply(&self) -> Option<&ReplyError> {
        match self {
            Self::Reply(reply) => Some(reply),
            _ => None,
        }
    }

    /// Reply code for login and reply failures
    pub fn reply_code(&self) -> Option<u32> {
        match self {
            Self::Login { code, .. } => Some(*code),
            Self::Reply(reply) => Some(reply.code),
            _ => None,
        }
    }
}

impl From<FormatError> for RetsError {
    fn from(err: FormatError) -> Self {
        match err {
            FormatError::Reply(reply) => Self::Reply(reply),
            FormatError::UnsupportedFormat(format) => Self::UnsupportedFormat(format),
            other => Self::Parse(other),
        }
    }
}

impl From<ReplyError> for RetsError {
    fn from(err: ReplyError) -> Self {
        Self::Reply(err)
    }
}

impl From<url::ParseError> for RetsError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RetsError>;

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_is_flattened() {
        let err: RetsError = FormatError::Reply(ReplyError::new(20203, "Bad query")).into();
        assert!(matches!(err, RetsError::Reply(_)));
        assert_eq!(err.reply_code(), Some(20203));
        assert_eq!(err.reply().unwrap().text, "Bad query");
    }

    #[test]
    fn test_parse_errors_stay_wrapped() {
        let err: RetsError = FormatError::EmptyBody.into();
        assert!(matches!(err, RetsError::Parse(FormatError::EmptyBody)));
        assert_eq!(err.reply_code(), None);
    }

    #[test]
    fn test_login_display() {
        let err = RetsError::Login {
            code: 20036,
            reason: "Missing User-Agent".to_string(),
        };
        assert_eq!(err.to_string(), "Login failed (20036): Missing User-Agent");
    }
}
