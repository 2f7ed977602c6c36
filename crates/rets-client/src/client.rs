//! RETS session client
//!
//! [`RetsClient`] drives the request lifecycle: it prepares a request from
//! the session, sends it through the [`Transport`], answers authentication
//! challenges within a fixed budget and hands successful bodies to the
//! decoders in `rets-formats`.
//!
//! Operations on one client are serialized. Each public operation holds a
//! flight permit for its whole duration, network waits included. The session
//! itself is locked only while a request is built or a response's headers
//! are taken over, so accessors such as [`RetsClient::state`] never wait on
//! the network.

use crate::auth::{self, AuthChallenge, DigestRequest};
use crate::config::{ClientConfig, RequestMethod, RetsVersion};
use crate::error::{RetsError, Result};
use crate::request::{ObjectRequest, SearchRequest};
use crate::session::{
    Capability, RETS_REQUEST_ID, RETS_SESSION_ID, RETS_UA_AUTHORIZATION, Session, SessionState,
};
use crate::transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
use bytes::Bytes;
use parking_lot::Mutex;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderName, HeaderValue};
use rets_formats::{
    ActionResponse, DataObject, Format, FormatError, ObjectHeaders, Transaction, envelope,
    multipart,
};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, trace, warn};
use url::Url;

const METADATA_ACCEPT: &str = "text/xml,text/plain;q=0.5";

/// Response headers copied onto a single-object GetObject result
const OBJECT_HEADERS: [&str; 6] = [
    "Content-Type",
    "Content-ID",
    "Object-ID",
    "Content-Description",
    "Location",
    "Preferred",
];

/// Outcome of one HTTP exchange
#[derive(Debug)]
enum Exchange {
    /// 2xx response
    Complete(HttpResponse),
    /// 401 with a challenge we can answer
    NeedsAuth(AuthChallenge),
    Failed(RetsError),
}

/// A RETS client bound to one server and one session
pub struct RetsClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    session: Mutex<Session>,
    flight: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for RetsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetsClient")
            .field("login_url", &self.config.login_url)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl RetsClient {
    /// Create a client using the default reqwest transport
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config.read_timeout)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a client on a caller supplied transport
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let login_url = Url::parse(&config.login_url)?;
        let session = Session::new(login_url, &config.user_agent, config.rets_version)?;

        Ok(Self {
            config,
            transport,
            session: Mutex::new(session),
            flight: tokio::sync::Mutex::new(()),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn format(&self) -> Format {
        self.config.format
    }

    pub fn state(&self) -> SessionState {
        self.session.lock().state()
    }

    /// Resolved URL of a capability, once known
    pub fn capability_url(&self, capability: Capability) -> Option<Url> {
        self.session.lock().url(capability).cloned()
    }

    /// Number of authentication attempts made so far
    pub fn nonce_count(&self) -> u32 {
        self.session.lock().nonce_count()
    }

    pub fn rets_version(&self) -> RetsVersion {
        self.session.lock().version()
    }

    /// Switch the protocol version announced in `RETS-Version`
    pub fn set_rets_version(&self, version: &str) -> Result<()> {
        let version: RetsVersion = version.parse()?;
        self.session.lock().set_version(version)
    }

    /// Set or, with `None`, remove a header sent on every request
    pub fn set_header(&self, name: &str, value: Option<&str>) -> Result<()> {
        self.session.lock().set_header(name, value)
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.session.lock().header(name).map(str::to_string)
    }

    /// Log in and discover the server's capability URLs
    ///
    /// A failing reply code becomes [`RetsError::Login`]. When the server
    /// names an Action URL it is fetched and attached as the transaction's
    /// secondary response; if that fetch fails the session stays logged in
    /// and [`RetsError::ActionFailed`] is returned.
    pub async fn login(&self, username: &str, password: &str) -> Result<Transaction> {
        let _flight = self.flight.lock().await;
        {
            let mut session = self.session.lock();
            session.set_credentials(username, password);
            session.set_state(SessionState::Authenticating);
        }

        let transaction = match self.login_exchange().await {
            Ok(transaction) => transaction,
            Err(err) => {
                self.session.lock().set_state(SessionState::Unauthenticated);
                return Err(err);
            }
        };

        let secondary = self.perform_action().await?;
        Ok(transaction.with_secondary(secondary))
    }

    async fn login_exchange(&self) -> Result<Transaction> {
        let url = self.url(Capability::Login)?;
        debug!("Logging in at {}", url);

        let response = self.request(&url, Vec::new(), Vec::new(), None).await?;
        let transaction = envelope::parse_key_value(&response.body).map_err(|err| match err {
            FormatError::Reply(reply) => RetsError::Login {
                code: reply.code,
                reason: reply.text,
            },
            other => other.into(),
        })?;

        let capabilities = transaction
            .key_values()
            .ok_or(RetsError::Parse(FormatError::MissingResponse))?;

        let mut session = self.session.lock();
        session.absorb_capabilities(capabilities)?;
        session.set_state(SessionState::Authenticated);
        debug!("Logged in, {} capability URLs", session.urls().len());
        Ok(transaction)
    }

    /// Follow the Action URL, if the login reply named one
    async fn perform_action(&self) -> Result<Option<ActionResponse>> {
        let Some(url) = self.capability_url(Capability::Action) else {
            return Ok(None);
        };

        debug!("Following action URL {}", url);
        match self
            .request(&url, Vec::new(), Vec::new(), Some(RequestMethod::Get))
            .await
        {
            Ok(response) => Ok(Some(ActionResponse {
                status: response.status.as_u16(),
                content_type: response.content_type().map(str::to_string),
                body: response.body,
            })),
            Err(err) => Err(RetsError::ActionFailed {
                reason: err.to_string(),
            }),
        }
    }

    /// End the session
    ///
    /// The Logout URL is called when the server advertised one. Failures are
    /// logged and otherwise ignored; the session is always reset.
    pub async fn logout(&self) -> Option<Transaction> {
        let _flight = self.flight.lock().await;

        let transaction = match self.capability_url(Capability::Logout) {
            Some(url) => match self.request(&url, Vec::new(), Vec::new(), None).await {
                Ok(response) => match envelope::parse_key_value(&response.body) {
                    Ok(transaction) => Some(transaction),
                    Err(err) => {
                        warn!("Logout reply could not be parsed: {}", err);
                        None
                    }
                },
                Err(err) => {
                    warn!("Logout failed: {}", err);
                    None
                }
            },
            None => {
                debug!("Server has no Logout capability");
                None
            }
        };

        self.session.lock().end();
        transaction
    }

    /// Log in, run `f` with the login transaction, then log out
    ///
    /// Logout happens whether or not `f` succeeds; `f`'s result is returned.
    pub async fn with_session<F, Fut, T>(&self, username: &str, password: &str, f: F) -> Result<T>
    where
        F: FnOnce(Transaction) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let transaction = match self.login(username, password).await {
            Ok(transaction) => transaction,
            Err(err) => {
                if self.state() == SessionState::Authenticated {
                    self.logout().await;
                }
                return Err(err);
            }
        };

        let result = f(transaction).await;
        self.logout().await;
        result
    }

    /// Fetch metadata of `metadata_type` (e.g. `METADATA-CLASS`) for `id`
    ///
    /// The rows of every block of that type are returned as one table.
    pub async fn get_metadata(&self, metadata_type: &str, id: &str) -> Result<Transaction> {
        let _flight = self.flight.lock().await;
        let url = self.url(Capability::GetMetadata)?;
        let format = self.config.format;

        let params = vec![
            ("Type".to_string(), metadata_type.to_string()),
            ("ID".to_string(), id.to_string()),
            ("Format".to_string(), format.to_string()),
        ];
        let headers = vec![(ACCEPT, METADATA_ACCEPT.to_string())];

        let response = self.request(&url, params, headers, None).await?;
        Ok(envelope::parse_tabular(
            &response.body,
            format,
            Some(metadata_type),
        )?)
    }

    /// Run a search and decode its rows
    pub async fn search(&self, request: &SearchRequest) -> Result<Transaction> {
        let _flight = self.flight.lock().await;
        let url = self.url(Capability::Search)?;
        let format = self.config.format;

        debug!(
            "Search {}:{} {}",
            request.search_type, request.class, request.query
        );
        let response = self
            .request(&url, request.params(format.as_str()), Vec::new(), None)
            .await?;
        Ok(envelope::parse_tabular(&response.body, format, None)?)
    }

    /// Retrieve objects and collect them in server order
    pub async fn get_object(&self, request: &ObjectRequest) -> Result<Vec<DataObject>> {
        let mut objects = Vec::new();
        self.get_object_each(request, |object| objects.push(object))
            .await?;
        Ok(objects)
    }

    /// Retrieve objects, handing each to `on_object`; returns how many
    ///
    /// An XML reply is a server error envelope and yields no objects, or
    /// the reply error. A `multipart/*` reply is split into its parts.
    /// Anything else is one object when it is chunked or larger than
    /// `object_size_threshold`, or a zero-length object when it only carries
    /// a `Location` header.
    pub async fn get_object_each<F>(&self, request: &ObjectRequest, mut on_object: F) -> Result<usize>
    where
        F: FnMut(DataObject),
    {
        let _flight = self.flight.lock().await;
        let url = self.url(Capability::GetObject)?;
        let headers = vec![(ACCEPT, self.config.object_accept.join(","))];

        let response = self.request(&url, request.params(), headers, None).await?;
        let content_type = response.content_type().unwrap_or_default().to_string();
        let mime = content_type.to_ascii_lowercase();

        if mime.contains("text/xml") {
            envelope::parse_object_error(&response.body)?;
            debug!("GetObject returned a successful reply without objects");
            return Ok(0);
        }

        if mime.starts_with("multipart/") {
            let boundary = multipart::boundary_from_content_type(&content_type)
                .ok_or_else(|| FormatError::MissingBoundary(content_type.clone()))?;
            let mut count = 0;
            for object in multipart::parts(&response.body, &boundary) {
                on_object(object);
                count += 1;
            }
            debug!("GetObject returned {} parts", count);
            return Ok(count);
        }

        let mut object_headers = ObjectHeaders::new();
        for name in OBJECT_HEADERS {
            if let Some(value) = response.header(name) {
                object_headers.insert(name, value);
            }
        }

        let size = response
            .content_length()
            .unwrap_or(response.body.len() as u64);
        if response.is_chunked() || size > self.config.object_size_threshold {
            on_object(DataObject::new(object_headers, response.body));
            Ok(1)
        } else if object_headers.get("Location").is_some() {
            on_object(DataObject::new(object_headers, Bytes::new()));
            Ok(1)
        } else {
            debug!(
                "Ignoring {} byte object body at or below the {} byte threshold",
                size, self.config.object_size_threshold
            );
            Ok(0)
        }
    }

    fn url(&self, capability: Capability) -> Result<Url> {
        self.capability_url(capability)
            .ok_or(RetsError::MissingCapability(capability))
    }

    /// Send a request, answering up to `auth_retries` challenges
    async fn request(
        &self,
        url: &Url,
        params: Vec<(String, String)>,
        headers: Vec<(HeaderName, String)>,
        method: Option<RequestMethod>,
    ) -> Result<HttpResponse> {
        let method = method.unwrap_or(self.config.request_method);
        let mut retries_left = self.config.auth_retries;

        loop {
            let request = self.prepare(url, &params, &headers, method)?;
            debug!("{} {}", request.method, request.url);

            match self.exchange(request).await {
                Exchange::Complete(response) => {
                    let mut session = self.session.lock();
                    session.absorb_response(&response.headers)?;
                    if session.state() == SessionState::Reauthenticating {
                        session.set_state(SessionState::Authenticated);
                    }
                    return Ok(response);
                }
                Exchange::Failed(err) => return Err(err),
                Exchange::NeedsAuth(challenge) => {
                    if retries_left == 0 {
                        debug!("Challenge budget of {} exhausted", self.config.auth_retries);
                        {
                            // Only this request failed; the login stands
                            let mut session = self.session.lock();
                            if session.state() == SessionState::Reauthenticating {
                                session.set_state(SessionState::Authenticated);
                            }
                        }
                        return Err(RetsError::Login {
                            code: u32::from(StatusCode::UNAUTHORIZED.as_u16()),
                            reason: format!(
                                "authentication failed after {} attempts",
                                self.config.auth_retries
                            ),
                        });
                    }
                    retries_left -= 1;
                    self.authenticate(&challenge, url, method)?;
                }
            }
        }
    }

    /// Build the outgoing request from the session
    fn prepare(
        &self,
        url: &Url,
        params: &[(String, String)],
        headers: &[(HeaderName, String)],
        method: RequestMethod,
    ) -> Result<HttpRequest> {
        let session = self.session.lock();
        let mut request_headers = session.headers().clone();

        if let Some(password) = &self.config.user_agent_password {
            let value = auth::user_agent_authorization(
                &self.config.user_agent,
                password,
                session.header(RETS_REQUEST_ID),
                session.header(RETS_SESSION_ID),
                &session.version().header_value(),
            );
            request_headers.insert(RETS_UA_AUTHORIZATION, header_value(&value)?);
        }
        drop(session);

        for (name, value) in headers {
            request_headers.insert(name.clone(), header_value(value)?);
        }

        let mut url = url.clone();
        let body = match method {
            RequestMethod::Get => {
                if !params.is_empty() {
                    url.query_pairs_mut().extend_pairs(params);
                }
                None
            }
            RequestMethod::Post => {
                request_headers.insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static("application/x-www-form-urlencoded"),
                );
                let body = url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(params)
                    .finish();
                Some(Bytes::from(body))
            }
        };

        Ok(HttpRequest {
            method: method.as_method(),
            url,
            headers: request_headers,
            body,
        })
    }

    async fn exchange(&self, request: HttpRequest) -> Exchange {
        let url = request.url.to_string();
        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(err) => return Exchange::Failed(err),
        };

        let status = response.status;
        if status == StatusCode::UNAUTHORIZED {
            return match AuthChallenge::from_headers(&response.headers) {
                Some(challenge) => Exchange::NeedsAuth(challenge),
                None => {
                    warn!("401 from {} without a usable challenge", url);
                    Exchange::Failed(RetsError::HttpStatus { status, url })
                }
            };
        }
        if status.as_u16() >= 300 {
            return Exchange::Failed(RetsError::HttpStatus { status, url });
        }

        trace!("{} returned {} bytes", url, response.body.len());
        Exchange::Complete(response)
    }

    /// Answer a challenge and store the credential for the retry
    fn authenticate(
        &self,
        challenge: &AuthChallenge,
        url: &Url,
        method: RequestMethod,
    ) -> Result<()> {
        let mut session = self.session.lock();
        let credentials = session
            .credentials()
            .cloned()
            .ok_or_else(|| RetsError::Login {
                code: u32::from(StatusCode::UNAUTHORIZED.as_u16()),
                reason: "server requested authentication before login".to_string(),
            })?;

        if session.state() == SessionState::Authenticated {
            session.set_state(SessionState::Reauthenticating);
        }

        let nonce_count = session.next_nonce_count();
        let cnonce = auth::cnonce();
        let request_id = session.header(RETS_REQUEST_ID).map(str::to_string);
        let method_name = method.as_method();

        let value = auth::authorization(
            challenge,
            &DigestRequest {
                username: &credentials.username,
                password: &credentials.password,
                method: method_name.as_str(),
                uri: url.path(),
                nonce_count,
                cnonce: &cnonce,
                request_id: request_id.as_deref(),
            },
        );
        debug!(
            "Answering {:?} challenge for realm '{}' (nc={})",
            challenge.scheme, challenge.realm, nonce_count
        );
        session.set_header(AUTHORIZATION.as_str(), Some(&value))
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| RetsError::InvalidHeader(format!("{value}: {e}")))
}
