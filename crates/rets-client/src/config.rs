//! Client configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{RetsError, Result};
use rets_formats::Format;

/// Read timeout applied to every network call
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(600);

/// Authentication retries allowed per request
pub const DEFAULT_AUTH_RETRIES: u32 = 2;

/// A single-object GetObject body must be larger than this to be kept
pub const DEFAULT_OBJECT_SIZE_THRESHOLD: u64 = 100;

/// Protocol versions the client can speak
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RetsVersion {
    #[serde(rename = "1.5")]
    V1_5,
    #[default]
    #[serde(rename = "1.7")]
    V1_7,
    #[serde(rename = "1.7.2")]
    V1_7_2,
    #[serde(rename = "1.8")]
    V1_8,
}

impl RetsVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1_5 => "1.5",
            Self::V1_7 => "1.7",
            Self::V1_7_2 => "1.7.2",
            Self::V1_8 => "1.8",
        }
    }

    /// Value of the `RETS-Version` header, e.g. `RETS/1.7`
    pub fn header_value(&self) -> String {
        format!("RETS/{}", self.as_str())
    }
}

impl fmt::Display for RetsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetsVersion {
    type Err = RetsError;

    /// Accepts both `1.7` and `RETS/1.7`
    fn from_str(s: &str) -> Result<Self> {
        let version = s.trim();
        let version = version.strip_prefix("RETS/").unwrap_or(version);
        match version {
            "1.5" => Ok(Self::V1_5),
            "1.7" => Ok(Self::V1_7),
            "1.7.2" => Ok(Self::V1_7_2),
            "1.8" => Ok(Self::V1_8),
            _ => Err(RetsError::UnsupportedVersion(s.to_string())),
        }
    }
}

/// HTTP method used for transactions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
    /// Parameters in the query string
    #[default]
    Get,
    /// Parameters form-encoded in the body
    Post,
}

impl RequestMethod {
    pub fn as_method(&self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
        }
    }
}

impl FromStr for RequestMethod {
    type Err = RetsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            _ => Err(RetsError::Config(format!("unsupported request method '{s}'"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Login capability URL, the entry point of every session
    pub login_url: String,

    /// `User-Agent` header; many servers authorize by agent name
    pub user_agent: String,

    /// Enables `RETS-UA-Authorization` when set
    pub user_agent_password: Option<String>,

    pub rets_version: RetsVersion,

    /// Format requested for Search and GetMetadata
    pub format: Format,

    pub request_method: RequestMethod,

    /// Authentication attempts per request before giving up
    pub auth_retries: u32,

    /// Bound on each network call
    pub read_timeout: Duration,

    /// Minimum body size of a single-object GetObject reply
    pub object_size_threshold: u64,

    /// MIME types sent as the GetObject `Accept` header
    pub object_accept: Vec<String>,
}

impl ClientConfig {
    pub fn new(login_url: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            login_url: login_url.into(),
            user_agent: user_agent.into(),
            user_agent_password: None,
            rets_version: RetsVersion::default(),
            format: Format::default(),
            request_method: RequestMethod::default(),
            auth_retries: DEFAULT_AUTH_RETRIES,
            read_timeout: DEFAULT_READ_TIMEOUT,
            object_size_threshold: DEFAULT_OBJECT_SIZE_THRESHOLD,
            object_accept: vec!["image/jpeg".to_string(), "image/gif".to_string()],
        }
    }

    /// Create configuration from environment variables
    ///
    /// `RETS_LOGIN_URL` and `RETS_USER_AGENT` are required. Unknown version,
    /// format or method names and malformed numbers are rejected here rather
    /// than at request time.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build configuration from `RETS_*` values supplied by `var`
    pub(crate) fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let login_url = var("RETS_LOGIN_URL")
            .ok_or_else(|| RetsError::Config("RETS_LOGIN_URL is not set".to_string()))?;
        let user_agent = var("RETS_USER_AGENT")
            .ok_or_else(|| RetsError::Config("RETS_USER_AGENT is not set".to_string()))?;

        let mut config = Self::new(login_url, user_agent);
        config.user_agent_password = var("RETS_USER_AGENT_PASSWORD");

        if let Some(version) = var("RETS_VERSION") {
            config.rets_version = version.parse()?;
        }
        if let Some(format) = var("RETS_FORMAT") {
            config.format = format.parse()?;
        }
        if let Some(method) = var("RETS_REQUEST_METHOD") {
            config.request_method = method.parse()?;
        }
        if let Some(retries) = var("RETS_AUTH_RETRIES") {
            config.auth_retries = parse_number("RETS_AUTH_RETRIES", &retries)?;
        }
        if let Some(seconds) = var("RETS_READ_TIMEOUT") {
            let seconds = parse_number("RETS_READ_TIMEOUT", &seconds)?;
            config.read_timeout = Duration::from_secs(seconds);
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_user_agent_password(mut self, password: impl Into<String>) -> Self {
        self.user_agent_password = Some(password.into());
        self
    }

    #[must_use]
    pub fn with_rets_version(mut self, version: RetsVersion) -> Self {
        self.rets_version = version;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_request_method(mut self, method: RequestMethod) -> Self {
        self.request_method = method;
        self
    }

    #[must_use]
    pub fn with_auth_retries(mut self, retries: u32) -> Self {
        self.auth_retries = retries;
        self
    }

    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_object_size_threshold(mut self, threshold: u64) -> Self {
        self.object_size_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_object_accept(mut self, accept: Vec<String>) -> Self {
        self.object_accept = accept;
        self
    }
}

fn parse_number<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| RetsError::Config(format!("{name} must be a number, got '{value}'")))
}
