//! RETS reply codes
//!
//! Every RETS transaction answers with a numeric `ReplyCode`. `0` is success and
//! [`NO_RECORDS_FOUND`] is an empty but successful result; any other code is a
//! failure surfaced as a [`ReplyError`]. The [`ReplyKind`] groups the codes
//! defined by RETS 1.x so callers can branch without memorising numbers.

use std::fmt;
use thiserror::Error;

/// Successful transaction
pub const SUCCESS: u32 = 0;

/// "No Records Found": the end-of-results sentinel, treated as success
pub const NO_RECORDS_FOUND: u32 = 20201;

/// Classification of a non-zero reply code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyKind {
    /// Login, user-agent or account problems (200xx)
    Authentication,
    /// Unknown resource, class, type, field, key or malformed query
    InvalidRequest,
    /// The requested object or metadata does not exist
    NotFound,
    /// The account may not perform this retrieval
    Unauthorized,
    /// Record, size or concurrency limits were hit
    LimitExceeded,
    /// The server gave up on the request
    Timeout,
    /// Resource or server temporarily unavailable
    Unavailable,
    /// Any code without a specific mapping
    Transaction,
}

impl ReplyKind {
    /// Map a reply code to its kind
    pub fn from_code(code: u32) -> Self {
        match code {
            20003 | 20012 | 20013 | 20022 | 20036 | 20037 | 20041 | 20701 | 20702 => {
                Self::Authentication
            }
            20200 | 20202 | 20203 | 20206 | 20212 | 20213 | 20400 | 20401 | 20402 | 20406
            | 20500 | 20501 | 20502 | 20506 => Self::InvalidRequest,
            20403 | 20503 => Self::NotFound,
            20207 | 20407 | 20507 => Self::Unauthorized,
            20208 | 20210 | 20211 | 20410 | 20412 | 20510 | 20512 => Self::LimitExceeded,
            20209 | 20411 | 20511 => Self::Timeout,
            20050 | 20408 | 20409 | 20508 | 20509 | 20514 => Self::Unavailable,
            _ => Self::Transaction,
        }
    }
}

impl fmt::Display for ReplyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Authentication => "authentication",
            Self::InvalidRequest => "invalid request",
            Self::NotFound => "not found",
            Self::Unauthorized => "unauthorized",
            Self::LimitExceeded => "limit exceeded",
            Self::Timeout => "timeout",
            Self::Unavailable => "unavailable",
            Self::Transaction => "transaction",
        };
        f.write_str(name)
    }
}

/// A non-success reply from the server, with code and text intact
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("RETS {kind} error {code}: {text}")]
pub struct ReplyError {
    /// Reply code as delivered by the server
    pub code: u32,
    /// Reply text as delivered by the server
    pub text: String,
    /// Classification of `code`
    pub kind: ReplyKind,
}

impl ReplyError {
    /// Create a reply error, deriving its kind from the code
    pub fn new(code: u32, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
            kind: ReplyKind::from_code(code),
        }
    }
}

/// Whether a reply code denotes a successful transaction
pub fn is_success(code: u32) -> bool {
    code == SUCCESS || code == NO_RECORDS_FOUND
}

/// Turn a reply code and text into `Ok(())` or the matching [`ReplyError`]
pub fn check(code: u32, text: &str) -> Result<(), ReplyError> {
    if is_success(code) {
        Ok(())
    } else {
        Err(ReplyError::new(code, text))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_success_codes() {
        assert!(check(0, "Success").is_ok());
        assert!(check(NO_RECORDS_FOUND, "No Records Found").is_ok());
    }

    #[test]
    fn test_failure_keeps_code_and_text() {
        let err = check(20203, "Miscellaneous search error").unwrap_err();
        assert_eq!(err.code, 20203);
        assert_eq!(err.text, "Miscellaneous search error");
        assert_eq!(err.kind, ReplyKind::InvalidRequest);
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(ReplyKind::from_code(20036), ReplyKind::Authentication);
        assert_eq!(ReplyKind::from_code(20403), ReplyKind::NotFound);
        assert_eq!(ReplyKind::from_code(20507), ReplyKind::Unauthorized);
        assert_eq!(ReplyKind::from_code(20208), ReplyKind::LimitExceeded);
        assert_eq!(ReplyKind::from_code(20411), ReplyKind::Timeout);
        assert_eq!(ReplyKind::from_code(20509), ReplyKind::Unavailable);
        assert_eq!(ReplyKind::from_code(1), ReplyKind::Transaction);
        assert_eq!(ReplyKind::from_code(29999), ReplyKind::Transaction);
    }

    #[test]
    fn test_display() {
        let err = ReplyError::new(20037, "Authentication failed");
        assert_eq!(
            err.to_string(),
            "RETS authentication error 20037: Authentication failed"
        );
    }
}
