//! HTTP authentication for RETS sessions
//!
//! RETS servers challenge with `WWW-Authenticate: Digest ...` (RFC 2617) and
//! occasionally `Basic`. Everything here is a pure function of its inputs:
//! the caller owns the nonce-count and supplies the client nonce.
//!
//! The user-agent authentication of RETS 1.5+ (`RETS-UA-Authorization`) is
//! computed here as well.

use base64::{Engine as _, engine::general_purpose};
use reqwest::header::{HeaderMap, WWW_AUTHENTICATE};
use std::collections::HashMap;
use std::fmt::Write as _;

/// Challenge scheme named by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Digest,
    Basic,
}

/// A parsed `WWW-Authenticate` challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChallenge {
    pub scheme: Scheme,
    pub realm: String,
    pub nonce: String,
    pub opaque: Option<String>,
    /// `auth` when the server offers it, otherwise whatever it named
    pub qop: Option<String>,
    pub algorithm: Option<String>,
}

impl AuthChallenge {
    /// Parse one challenge value
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let (scheme, params) = value.split_once(char::is_whitespace).unwrap_or((value, ""));

        let scheme = if scheme.eq_ignore_ascii_case("digest") {
            Scheme::Digest
        } else if scheme.eq_ignore_ascii_case("basic") {
            Scheme::Basic
        } else {
            return None;
        };

        let params = parse_params(params);
        let qop = params.get("qop").map(|qop| {
            if qop.split(',').any(|q| q.trim().eq_ignore_ascii_case("auth")) {
                "auth".to_string()
            } else {
                qop.trim().to_string()
            }
        });

        Some(Self {
            scheme,
            realm: params.get("realm").cloned().unwrap_or_default(),
            nonce: params.get("nonce").cloned().unwrap_or_default(),
            opaque: params.get("opaque").cloned(),
            qop,
            algorithm: params.get("algorithm").cloned(),
        })
    }

    /// The challenge of a 401 response, preferring Digest over Basic
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let challenges: Vec<Self> = headers
            .get_all(WWW_AUTHENTICATE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(Self::parse)
            .collect();

        challenges
            .iter()
            .find(|c| c.scheme == Scheme::Digest)
            .or_else(|| challenges.first())
            .cloned()
    }

    fn is_md5_sess(&self) -> bool {
        self.algorithm
            .as_deref()
            .is_some_and(|a| a.eq_ignore_ascii_case("MD5-sess"))
    }
}

/// `key=value` and `key="quoted, value"` pairs, keys lowercased
fn parse_params(input: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    let mut rest = input.trim();

    while !rest.is_empty() {
        let Some((key, after)) = rest.split_once('=') else {
            break;
        };
        let key = key.trim().trim_start_matches(',').trim().to_ascii_lowercase();
        let after = after.trim_start();

        let (value, remaining) = if let Some(quoted) = after.strip_prefix('"') {
            let mut value = String::new();
            let mut chars = quoted.char_indices();
            let mut end = quoted.len();
            while let Some((i, c)) = chars.next() {
                match c {
                    '\\' => {
                        if let Some((_, escaped)) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    '"' => {
                        end = i + 1;
                        break;
                    }
                    _ => value.push(c),
                }
            }
            (value, &quoted[end..])
        } else {
            let end = after.find(',').unwrap_or(after.len());
            (after[..end].trim().to_string(), &after[end..])
        };

        params.insert(key, value);
        rest = remaining.trim_start().trim_start_matches(',').trim_start();
    }
    params
}

/// Everything besides the challenge that goes into a digest response
#[derive(Debug, Clone, Copy)]
pub struct DigestRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    /// HTTP method name, e.g. `GET`
    pub method: &'a str,
    /// Request path the credential is bound to
    pub uri: &'a str,
    pub nonce_count: u32,
    pub cnonce: &'a str,
    /// `RETS-Request-ID`, quoted into the header when present
    pub request_id: Option<&'a str>,
}

fn md5_hex(input: &str) -> String {
    hex::encode(md5::compute(input.as_bytes()).0)
}

/// A random client nonce for digest responses
pub fn cnonce() -> String {
    hex::encode(rand::random::<[u8; 8]>())
}

/// Digest `response` value
///
/// `HA1 = md5(user:realm:password)`, or for MD5-sess
/// `md5(md5(user:realm:password):nonce:cnonce)`; `HA2 = md5(method:uri)`.
/// With `qop=auth` the response is `md5(HA1:nonce:nc:cnonce:auth:HA2)`,
/// without qop it is `md5(HA1:nonce:HA2)`.
pub fn digest_response(challenge: &AuthChallenge, request: &DigestRequest<'_>) -> String {
    let mut ha1 = md5_hex(&format!(
        "{}:{}:{}",
        request.username, challenge.realm, request.password
    ));
    if challenge.is_md5_sess() {
        ha1 = md5_hex(&format!("{ha1}:{}:{}", challenge.nonce, request.cnonce));
    }
    let ha2 = md5_hex(&format!("{}:{}", request.method, request.uri));

    match challenge.qop.as_deref() {
        Some(qop) => md5_hex(&format!(
            "{ha1}:{}:{:08x}:{}:{qop}:{ha2}",
            challenge.nonce, request.nonce_count, request.cnonce
        )),
        None => md5_hex(&format!("{ha1}:{}:{ha2}", challenge.nonce)),
    }
}

/// Full `Authorization` header value answering `challenge`
pub fn authorization(challenge: &AuthChallenge, request: &DigestRequest<'_>) -> String {
    match challenge.scheme {
        Scheme::Basic => basic_authorization(request.username, request.password),
        Scheme::Digest => digest_authorization(challenge, request),
    }
}

fn digest_authorization(challenge: &AuthChallenge, request: &DigestRequest<'_>) -> String {
    let response = digest_response(challenge, request);

    let mut header = format!(
        "Digest username=\"{}\", realm=\"{}\", nonce=\"{}\", uri=\"{}\", response=\"{}\"",
        request.username, challenge.realm, challenge.nonce, request.uri, response
    );
    if let Some(algorithm) = &challenge.algorithm {
        let _ = write!(header, ", algorithm={algorithm}");
    }
    if let Some(qop) = &challenge.qop {
        let _ = write!(
            header,
            ", qop={qop}, nc={:08x}, cnonce=\"{}\"",
            request.nonce_count, request.cnonce
        );
    }
    if let Some(opaque) = &challenge.opaque {
        let _ = write!(header, ", opaque=\"{opaque}\"");
    }
    if let Some(request_id) = request.request_id {
        let _ = write!(header, ", RETS-Request-ID=\"{request_id}\"");
    }
    header
}

fn basic_authorization(username: &str, password: &str) -> String {
    format!(
        "Basic {}",
        general_purpose::STANDARD.encode(format!("{username}:{password}"))
    )
}

/// `RETS-UA-Authorization` header value
///
/// `Digest md5(md5(agent:agent-password):request-id:session-id:RETS/version)`
/// with empty strings standing in for a missing request or session id.
pub fn user_agent_authorization(
    user_agent: &str,
    user_agent_password: &str,
    request_id: Option<&str>,
    session_id: Option<&str>,
    version_header: &str,
) -> String {
    let a1 = md5_hex(&format!("{user_agent}:{user_agent_password}"));
    let digest = md5_hex(&format!(
        "{a1}:{}:{}:{version_header}",
        request_id.unwrap_or_default(),
        session_id.unwrap_or_default()
    ));
    format!("Digest {digest}")
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use reqwest::header::HeaderValue;

    // RFC 2617 section 3.5
    const RFC_CHALLENGE: &str = r#"Digest realm="testrealm@host.com", qop="auth,auth-int", nonce="dcd98b7102dd2f0e8b11d0f600bfb0c093", opaque="5ccc069c403ebaf9f0171e9517f40e41""#;

    fn rfc_request() -> DigestRequest<'static> {
        DigestRequest {
            username: "Mufasa",
            password: "Circle Of Life",
            method: "GET",
            uri: "/dir/index.html",
            nonce_count: 1,
            cnonce: "0a4f113b",
            request_id: None,
        }
    }

    #[test]
    fn test_parse_challenge() {
        let challenge = AuthChallenge::parse(RFC_CHALLENGE).unwrap();
        assert_eq!(challenge.scheme, Scheme::Digest);
        assert_eq!(challenge.realm, "testrealm@host.com");
        assert_eq!(challenge.nonce, "dcd98b7102dd2f0e8b11d0f600bfb0c093");
        assert_eq!(
            challenge.opaque.as_deref(),
            Some("5ccc069c403ebaf9f0171e9517f40e41")
        );
        assert_eq!(challenge.qop.as_deref(), Some("auth"));
        assert_eq!(challenge.algorithm, None);
    }

    #[test]
    fn test_rfc2617_response() {
        let challenge = AuthChallenge::parse(RFC_CHALLENGE).unwrap();
        assert_eq!(
            digest_response(&challenge, &rfc_request()),
            "6629fae49393a05397450978507c4ef1"
        );
    }

    #[test]
    fn test_authorization_header() {
        let challenge = AuthChallenge::parse(RFC_CHALLENGE).unwrap();
        let header = authorization(&challenge, &rfc_request());

        assert!(header.starts_with("Digest username=\"Mufasa\", realm=\"testrealm@host.com\""));
        assert!(header.contains("uri=\"/dir/index.html\""));
        assert!(header.contains("response=\"6629fae49393a05397450978507c4ef1\""));
        assert!(header.contains("qop=auth, nc=00000001, cnonce=\"0a4f113b\""));
        assert!(header.contains("opaque=\"5ccc069c403ebaf9f0171e9517f40e41\""));
    }

    #[test]
    fn test_nonce_count_changes_response() {
        let challenge = AuthChallenge::parse(RFC_CHALLENGE).unwrap();
        let second = DigestRequest {
            nonce_count: 2,
            ..rfc_request()
        };
        assert_ne!(
            digest_response(&challenge, &rfc_request()),
            digest_response(&challenge, &second)
        );
        assert!(authorization(&challenge, &second).contains("nc=00000002"));
    }

    #[test]
    fn test_legacy_digest_without_qop() {
        let challenge =
            AuthChallenge::parse(r#"Digest realm="rets", nonce="abc", algorithm=MD5"#).unwrap();
        let header = authorization(&challenge, &rfc_request());

        let ha1 = md5_hex("Mufasa:rets:Circle Of Life");
        let ha2 = md5_hex("GET:/dir/index.html");
        let expected = md5_hex(&format!("{ha1}:abc:{ha2}"));
        assert!(header.contains(&format!("response=\"{expected}\"")));
        assert!(header.contains("algorithm=MD5"));
        assert!(!header.contains("nc="));
    }

    #[test]
    fn test_md5_sess() {
        let challenge = AuthChallenge::parse(
            r#"Digest realm="rets", nonce="n1", qop="auth", algorithm="MD5-sess""#,
        )
        .unwrap();
        let request = rfc_request();

        let ha1 = md5_hex(&format!(
            "{}:n1:0a4f113b",
            md5_hex("Mufasa:rets:Circle Of Life")
        ));
        let ha2 = md5_hex("GET:/dir/index.html");
        let expected = md5_hex(&format!("{ha1}:n1:00000001:0a4f113b:auth:{ha2}"));
        assert_eq!(digest_response(&challenge, &request), expected);
    }

    #[test]
    fn test_basic_challenge() {
        let challenge = AuthChallenge::parse("Basic realm=\"WallyWorld\"").unwrap();
        assert_eq!(challenge.scheme, Scheme::Basic);
        let request = DigestRequest {
            username: "Aladdin",
            password: "open sesame",
            ..rfc_request()
        };
        assert_eq!(
            authorization(&challenge, &request),
            "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ=="
        );
    }

    #[test]
    fn test_digest_preferred_over_basic() {
        let mut headers = HeaderMap::new();
        headers.append(WWW_AUTHENTICATE, HeaderValue::from_static("Basic realm=\"r\""));
        headers.append(
            WWW_AUTHENTICATE,
            HeaderValue::from_static("Digest realm=\"r\", nonce=\"n\""),
        );
        let challenge = AuthChallenge::from_headers(&headers).unwrap();
        assert_eq!(challenge.scheme, Scheme::Digest);
        assert_eq!(challenge.nonce, "n");
    }

    #[test]
    fn test_unknown_scheme() {
        assert!(AuthChallenge::parse("Negotiate abc").is_none());
        assert!(AuthChallenge::from_headers(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_user_agent_authorization() {
        let a1 = md5_hex("MyAgent/1.0:uapass");
        let expected = md5_hex(&format!("{a1}:req-1:sess-9:RETS/1.7"));
        assert_eq!(
            user_agent_authorization("MyAgent/1.0", "uapass", Some("req-1"), Some("sess-9"), "RETS/1.7"),
            format!("Digest {expected}")
        );

        let expected = md5_hex(&format!("{a1}:::RETS/1.7"));
        assert_eq!(
            user_agent_authorization("MyAgent/1.0", "uapass", None, None, "RETS/1.7"),
            format!("Digest {expected}")
        );
    }

    #[test]
    fn test_cnonce_is_random_hex() {
        let a = cnonce();
        let b = cnonce();
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
