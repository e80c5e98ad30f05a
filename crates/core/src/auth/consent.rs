// crates/core/src/auth/consent.rs

//! Installed-app consent: a one-shot HTTP listener on loopback receives the
//! authorization redirect.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::distributions::{Alphanumeric, DistString};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use tracing::debug;
use url::Url;

use super::{AuthorizationGrant, ClientConfig, ConsentFlow};
use crate::error::AuthError;

/// How long an accepted connection may take to send its request line.
const CALLBACK_READ_TIMEOUT: Duration = Duration::from_secs(10);

const CALLBACK_PAGE: &str = "<html><body><h3>Authorization received.</h3>\
<p>You can close this window and return to the terminal.</p></body></html>";

/// Consent via the user's browser and a loopback redirect listener.
#[derive(Debug, Clone, Default)]
pub struct LocalServerConsent;

impl LocalServerConsent {
    pub fn new() -> Self {
        Self
    }
}

impl ConsentFlow for LocalServerConsent {
    fn authorize(
        &self,
        config: &ClientConfig,
        scopes: &[&str],
    ) -> Result<AuthorizationGrant, AuthError> {
        let listener = TcpListener::bind(("127.0.0.1", 0))
            .map_err(|e| AuthError::Consent(format!("cannot bind callback listener: {e}")))?;
        let port = listener
            .local_addr()
            .map_err(|e| AuthError::Consent(e.to_string()))?
            .port();
        let redirect_uri = format!("http://127.0.0.1:{port}/");

        let state = random_token(32);
        let code_verifier = random_token(64);
        let consent_url = build_consent_url(
            config,
            scopes,
            &redirect_uri,
            &state,
            &pkce_challenge(&code_verifier),
        )?;

        println!("Please visit this URL to authorize this application:\n{consent_url}\n");

        for stream in listener.incoming() {
            let stream = stream.map_err(|e| AuthError::Consent(e.to_string()))?;
            match answer_callback(stream, CALLBACK_READ_TIMEOUT)? {
                Some(callback) => {
                    let code = callback.into_code(&state)?;
                    return Ok(AuthorizationGrant {
                        code,
                        redirect_uri,
                        code_verifier,
                    });
                }
                None => continue,
            }
        }

        Err(AuthError::Consent(
            "callback listener closed before a redirect arrived".to_string(),
        ))
    }
}

/// Query parameters carried by an authorization redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Callback {
    code: Option<String>,
    error: Option<String>,
    state: Option<String>,
}

impl Callback {
    fn into_code(self, expected_state: &str) -> Result<String, AuthError> {
        if let Some(error) = self.error {
            return Err(AuthError::ConsentDenied(error));
        }
        if self.state.as_deref() != Some(expected_state) {
            return Err(AuthError::StateMismatch);
        }
        self.code
            .ok_or_else(|| AuthError::Consent("redirect carried no code".to_string()))
    }
}

/// Parse the request line of a redirect (`GET /?code=...&state=... HTTP/1.1`).
/// Requests without `code` or `error` (a favicon fetch, say) yield `None`.
pub(crate) fn parse_callback(request_line: &str) -> Option<Callback> {
    let mut parts = request_line.split_whitespace();
    let _method = parts.next()?;
    let target = parts.next()?;
    let url = Url::parse(&format!("http://127.0.0.1{target}")).ok()?;

    let mut callback = Callback {
        code: None,
        error: None,
        state: None,
    };
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => callback.code = Some(value.into_owned()),
            "error" => callback.error = Some(value.into_owned()),
            "state" => callback.state = Some(value.into_owned()),
            _ => {}
        }
    }

    if callback.code.is_none() && callback.error.is_none() {
        return None;
    }
    Some(callback)
}

/// Answer one connection. A client that stays silent past `read_timeout` is
/// dropped and yields `None`.
fn answer_callback(
    mut stream: TcpStream,
    read_timeout: Duration,
) -> Result<Option<Callback>, AuthError> {
    stream
        .set_read_timeout(Some(read_timeout))
        .map_err(|e| AuthError::Consent(format!("callback socket: {e}")))?;
    let mut request_line = String::new();
    match BufReader::new(&stream).read_line(&mut request_line) {
        Ok(_) => {}
        Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
            debug!("consent callback connection sent nothing; skipping");
            return Ok(None);
        }
        Err(e) => return Err(AuthError::Consent(format!("bad callback request: {e}"))),
    }
    debug!(request = request_line.trim(), "consent callback");

    let callback = parse_callback(&request_line);
    let response = match callback {
        Some(_) => format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            CALLBACK_PAGE.len(),
            CALLBACK_PAGE
        ),
        None => "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
            .to_string(),
    };
    // The browser page is cosmetic; a failed write does not invalidate the code.
    let _ = stream.write_all(response.as_bytes());
    Ok(callback)
}

fn build_consent_url(
    config: &ClientConfig,
    scopes: &[&str],
    redirect_uri: &str,
    state: &str,
    challenge: &str,
) -> Result<Url, AuthError> {
    let scope = scopes.join(" ");
    Url::parse_with_params(
        &config.auth_uri,
        &[
            ("client_id", config.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("scope", scope.as_str()),
            ("state", state),
            ("code_challenge", challenge),
            ("code_challenge_method", "S256"),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ],
    )
    .map_err(|e| AuthError::MissingClientConfig(format!("invalid auth_uri: {e}")))
}

/// S256 PKCE challenge for a code verifier.
pub fn pkce_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

fn random_token(len: usize) -> String {
    Alphanumeric.sample_string(&mut OsRng, len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pkce_matches_rfc7636_example() {
        assert_eq!(
            pkce_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn callback_with_code_and_state_is_parsed() {
        let cb = parse_callback("GET /?state=abc&code=4%2F0AX&scope=x HTTP/1.1\r\n").unwrap();
        assert_eq!(cb.clone().into_code("abc").unwrap(), "4/0AX");
        assert!(matches!(cb.into_code("other"), Err(AuthError::StateMismatch)));
    }

    #[test]
    fn access_denied_is_consent_denied() {
        let cb = parse_callback("GET /?error=access_denied&state=abc HTTP/1.1").unwrap();
        assert!(matches!(
            cb.into_code("abc"),
            Err(AuthError::ConsentDenied(reason)) if reason == "access_denied"
        ));
    }

    #[test]
    fn unrelated_requests_are_ignored() {
        assert_eq!(parse_callback("GET /favicon.ico HTTP/1.1"), None);
        assert_eq!(parse_callback(""), None);
    }

    #[test]
    fn consent_url_requests_offline_access_for_all_scopes() {
        let config = ClientConfig::from_json(r#"{"installed":{"client_id":"cid"}}"#).unwrap();
        let url = build_consent_url(
            &config,
            &super::super::REQUIRED_SCOPES,
            "http://127.0.0.1:5555/",
            "st",
            "ch",
        )
        .unwrap();

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let get = |k: &str| pairs.iter().find(|(key, _)| key == k).map(|(_, v)| v.clone());
        assert_eq!(get("client_id").as_deref(), Some("cid"));
        assert_eq!(get("access_type").as_deref(), Some("offline"));
        assert_eq!(get("code_challenge_method").as_deref(), Some("S256"));
        assert_eq!(
            get("scope").unwrap(),
            super::super::REQUIRED_SCOPES.join(" ")
        );
    }

    #[test]
    fn random_tokens_are_alphanumeric_and_distinct() {
        let a = random_token(32);
        let b = random_token(32);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn silent_connection_is_skipped_after_read_timeout() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let addr = listener.local_addr().unwrap();
        let _client = TcpStream::connect(addr).unwrap();
        let (stream, _) = listener.accept().unwrap();

        let answered = answer_callback(stream, Duration::from_millis(50)).unwrap();
        assert_eq!(answered, None);
    }

    #[test]
    fn redirect_on_the_socket_is_answered() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let addr = listener.local_addr().unwrap();
        let mut client = TcpStream::connect(addr).unwrap();
        client
            .write_all(b"GET /?code=abc&state=xyz HTTP/1.1\r\nHost: 127.0.0.1\r\n\r\n")
            .unwrap();
        let (stream, _) = listener.accept().unwrap();

        let callback = answer_callback(stream, Duration::from_secs(5)).unwrap().unwrap();
        assert_eq!(callback.into_code("xyz").unwrap(), "abc");
    }
}
