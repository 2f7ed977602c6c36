//! Client for the RETS (Real Estate Transaction Standard) protocol
//!
//! RETS tunnels listing data over HTTP. A session starts at the server's
//! Login URL; the login reply advertises capability URLs for Search,
//! GetMetadata, GetObject and friends, and every later transaction is sent
//! to one of them. Servers guard all of it with HTTP Digest authentication.
//!
//! # Quick Start
//!
//! ```no_run
//! use rets_client::{ClientConfig, RetsClient, SearchRequest};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::new("https://rets.example.com/rets/login", "MyApp/1.0");
//! let client = RetsClient::new(config)?;
//!
//! client.login("agent", "secret").await?;
//!
//! let request = SearchRequest::new("Property", "RES", "(ListPrice=300000+)").limit(10);
//! let result = client.search(&request).await?;
//! if let Some(table) = result.table() {
//!     for row in table.rows() {
//!         println!("{:?} {:?}", row.get("ListingID"), row.get("City"));
//!     }
//! }
//!
//! client.logout().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`RetsClient`]: public operations, the authentication retry loop and
//!   GetObject response dispatch
//! - [`session`]: capability URLs, outgoing headers, nonce-count
//! - [`auth`]: challenge parsing and digest computation
//! - [`transport`]: the [`Transport`] seam and its reqwest implementation
//! - [`rets_formats`]: envelope, COMPACT and multipart decoding

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod request;
pub mod session;
pub mod transport;

pub use client::RetsClient;
pub use config::{ClientConfig, RequestMethod, RetsVersion};
pub use error::{Result, RetsError};
pub use request::{ObjectRequest, SearchRequest};
pub use session::{Capability, Session, SessionState};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};

pub use rets_formats::{
    ActionResponse, DataObject, Format, FormatError, ObjectHeaders, Payload, ReplyError,
    ReplyKind, Row, Table, Transaction,
};
