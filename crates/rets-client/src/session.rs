//! Session state owned by one client
//!
//! A [`Session`] holds the capability URL table, the outgoing headers, the
//! digest nonce-count and the credentials used to answer challenges. It is
//! plain data; [`crate::RetsClient`] guards it and decides when it changes.

use crate::config::RetsVersion;
use crate::error::{RetsError, Result};
use reqwest::header::{
    ACCEPT, AUTHORIZATION, COOKIE, HeaderMap, HeaderName, HeaderValue, SET_COOKIE, USER_AGENT,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, trace};
use url::Url;

pub const RETS_VERSION: &str = "RETS-Version";
pub const RETS_SESSION_ID: &str = "RETS-Session-ID";
pub const RETS_REQUEST_ID: &str = "RETS-Request-ID";
pub const RETS_UA_AUTHORIZATION: &str = "RETS-UA-Authorization";

/// Named server endpoints advertised in the login reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Capability {
    Action,
    ChangePassword,
    GetObject,
    Login,
    LoginComplete,
    Logout,
    Search,
    GetMetadata,
    Update,
}

impl Capability {
    pub const ALL: [Self; 9] = [
        Self::Action,
        Self::ChangePassword,
        Self::GetObject,
        Self::Login,
        Self::LoginComplete,
        Self::Logout,
        Self::Search,
        Self::GetMetadata,
        Self::Update,
    ];

    /// Key used in the login reply
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Action => "Action",
            Self::ChangePassword => "ChangePassword",
            Self::GetObject => "GetObject",
            Self::Login => "Login",
            Self::LoginComplete => "LoginComplete",
            Self::Logout => "Logout",
            Self::Search => "Search",
            Self::GetMetadata => "GetMetadata",
            Self::Update => "Update",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, ()> {
        Self::ALL
            .into_iter()
            .find(|capability| capability.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or(())
    }
}

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    /// Login request in flight
    Authenticating,
    Authenticated,
    /// Answering a challenge on an authenticated request
    Reauthenticating,
}

#[derive(Clone)]
pub(crate) struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug)]
pub struct Session {
    urls: BTreeMap<Capability, Url>,
    headers: HeaderMap,
    nonce_count: u32,
    credentials: Option<Credentials>,
    state: SessionState,
    version: RetsVersion,
}

impl Session {
    /// Start a session at `login_url` with the standard request headers
    pub fn new(login_url: Url, user_agent: &str, version: RetsVersion) -> Result<Self> {
        let mut session = Self {
            urls: BTreeMap::from([(Capability::Login, login_url)]),
            headers: HeaderMap::new(),
            nonce_count: 0,
            credentials: None,
            state: SessionState::Unauthenticated,
            version,
        };

        session.set_header(USER_AGENT.as_str(), Some(user_agent))?;
        session.set_header(ACCEPT.as_str(), Some("*/*"))?;
        session.set_header(RETS_VERSION, Some(&version.header_value()))?;
        Ok(session)
    }

    pub fn url(&self, capability: Capability) -> Option<&Url> {
        self.urls.get(&capability)
    }

    pub fn urls(&self) -> &BTreeMap<Capability, Url> {
        &self.urls
    }

    pub fn login_url(&self) -> Option<&Url> {
        self.url(Capability::Login)
    }

    /// Store every recognized capability of a login reply
    ///
    /// Keys match case-insensitively; unknown keys and empty values are
    /// ignored.
    pub fn absorb_capabilities(&mut self, reply: &BTreeMap<String, String>) -> Result<()> {
        for (key, value) in reply {
            let Ok(capability) = key.parse::<Capability>() else {
                continue;
            };
            if value.trim().is_empty() {
                debug!("Capability {} has no URL, skipping", capability);
                continue;
            }
            let url = self.resolve(value)?;
            debug!("Capability {} -> {}", capability, url);
            self.urls.insert(capability, url);
        }
        Ok(())
    }

    /// Resolve a capability URL from a login reply
    ///
    /// Absolute URLs are kept verbatim. Anything else is a path (with an
    /// optional query) on the login URL's scheme, host and port.
    pub fn resolve(&self, value: &str) -> Result<Url> {
        let value = value.trim();
        if let Ok(url) = Url::parse(value)
            && url.has_host()
        {
            return Ok(url);
        }

        let mut url = self
            .login_url()
            .cloned()
            .ok_or(RetsError::MissingCapability(Capability::Login))?;
        let (path, query) = match value.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (value, None),
        };

        url.set_path(path);
        url.set_query(query);
        url.set_fragment(None);
        Ok(url)
    }

    /// Set or, with `None`, remove an outgoing header
    pub fn set_header(&mut self, name: &str, value: Option<&str>) -> Result<()> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| RetsError::InvalidHeader(format!("{name}: {e}")))?;

        match value {
            Some(value) => {
                let value = HeaderValue::from_str(value)
                    .map_err(|e| RetsError::InvalidHeader(format!("{name}: {e}")))?;
                if name == AUTHORIZATION {
                    trace!("Set header '{}'", name);
                } else {
                    trace!("Set header '{}' to '{:?}'", name, value);
                }
                self.headers.insert(name, value);
            }
            None => {
                trace!("Removed header '{}'", name);
                self.headers.remove(name);
            }
        }
        Ok(())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Take over cookies and the session id from a successful response
    ///
    /// Every `Set-Cookie` value is cut at its first `;`; the pairs are joined
    /// with `"; "` into one `Cookie` header.
    pub fn absorb_response(&mut self, headers: &HeaderMap) -> Result<()> {
        let cookies: Vec<&str> = headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|cookie| cookie.split(';').next())
            .map(str::trim)
            .filter(|cookie| !cookie.is_empty())
            .collect();

        if !cookies.is_empty() {
            self.set_header(COOKIE.as_str(), Some(&cookies.join("; ")))?;
        }

        if let Some(session_id) = headers.get(RETS_SESSION_ID).and_then(|v| v.to_str().ok()) {
            self.set_header(RETS_SESSION_ID, Some(session_id))?;
        }
        Ok(())
    }

    /// Count one more authentication attempt and return the new value
    pub fn next_nonce_count(&mut self) -> u32 {
        self.nonce_count += 1;
        self.nonce_count
    }

    pub fn nonce_count(&self) -> u32 {
        self.nonce_count
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            trace!("Session state {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    pub fn version(&self) -> RetsVersion {
        self.version
    }

    pub fn set_version(&mut self, version: RetsVersion) -> Result<()> {
        self.set_header(RETS_VERSION, Some(&version.header_value()))?;
        self.version = version;
        Ok(())
    }

    pub(crate) fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub(crate) fn set_credentials(&mut self, username: &str, password: &str) {
        self.credentials = Some(Credentials {
            username: username.to_string(),
            password: password.to_string(),
        });
    }

    /// Forget everything a login established; capability URLs stay
    pub(crate) fn end(&mut self) {
        self.headers.remove(AUTHORIZATION);
        self.headers.remove(COOKIE);
        self.headers.remove(RETS_SESSION_ID);
        self.set_state(SessionState::Unauthenticated);
    }
}
