// crates/core/src/auth/mod.rs

//! Credential lifecycle: load, refresh, or re-consent, then persist.
//!
//! [`CredentialManager::acquire`] is the only entry point the driver uses.
//! Adapters never call into this module; they only read the resolved
//! [`Credential`].

mod config;
mod consent;
mod endpoint;
mod store;

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::AuthError;

pub use config::ClientConfig;
pub use consent::{pkce_challenge, LocalServerConsent};
pub use endpoint::GoogleTokenEndpoint;
pub use store::TokenStore;

/// Scopes requested on consent: read-only mail and full calendar access.
pub const REQUIRED_SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/gmail.readonly",
    "https://www.googleapis.com/auth/calendar",
];

/// Tokens within this margin of their expiry are treated as expired.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Bearer token plus the metadata needed to keep it usable.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    scopes: Vec<String>,
}

impl Credential {
    pub fn new(
        token: impl Into<String>,
        refresh_token: Option<String>,
        expiry: Option<DateTime<Utc>>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            token: token.into(),
            refresh_token,
            expiry,
            scopes,
        }
    }

    /// The bearer token to attach to provider calls.
    pub fn access_token(&self) -> &str {
        &self.token
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        self.expiry
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// A credential without an expiry never expires.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => expiry - Duration::seconds(EXPIRY_SKEW_SECS) <= now,
            None => false,
        }
    }

    /// Whether every scope in `required` was granted.
    pub fn covers(&self, required: &[&str]) -> bool {
        required
            .iter()
            .all(|scope| self.scopes.iter().any(|granted| granted == scope))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("expiry", &self.expiry)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Token endpoint reply for both the code exchange and refresh grants.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Build a credential, keeping the previous refresh token and scopes when
    /// the provider omits them.
    pub fn into_credential(
        self,
        previous_refresh: Option<&str>,
        previous_scopes: &[String],
        now: DateTime<Utc>,
    ) -> Credential {
        let scopes = match self.scope.as_deref() {
            Some(scope) if !scope.trim().is_empty() => {
                scope.split_whitespace().map(str::to_string).collect()
            }
            _ => previous_scopes.to_vec(),
        };

        Credential {
            token: self.access_token,
            refresh_token: self
                .refresh_token
                .or_else(|| previous_refresh.map(str::to_string)),
            expiry: self.expires_in.map(|secs| now + Duration::seconds(secs)),
            scopes,
        }
    }
}

/// Code returned by the consent flow, ready to be exchanged.
#[derive(Debug, Clone)]
pub struct AuthorizationGrant {
    pub code: String,
    pub redirect_uri: String,
    pub code_verifier: String,
}

/// The provider's token endpoint.
pub trait TokenEndpoint {
    fn exchange_code(
        &self,
        config: &ClientConfig,
        grant: &AuthorizationGrant,
    ) -> Result<TokenResponse, AuthError>;

    fn refresh(&self, config: &ClientConfig, refresh_token: &str)
        -> Result<TokenResponse, AuthError>;
}

/// Interactive user consent producing an authorization code.
pub trait ConsentFlow {
    fn authorize(
        &self,
        config: &ClientConfig,
        scopes: &[&str],
    ) -> Result<AuthorizationGrant, AuthError>;
}

/// Anything that can hand the driver a usable credential.
pub trait CredentialSource {
    fn acquire(&self) -> Result<Credential, AuthError>;
}

/// Owns the persisted credential and decides between reuse, refresh and
/// full re-consent.
pub struct CredentialManager<T: TokenEndpoint, C: ConsentFlow> {
    config: ClientConfig,
    store: TokenStore,
    endpoint: T,
    consent: C,
}

impl<T: TokenEndpoint, C: ConsentFlow> CredentialManager<T, C> {
    pub fn new(config: ClientConfig, store: TokenStore, endpoint: T, consent: C) -> Self {
        Self {
            config,
            store,
            endpoint,
            consent,
        }
    }

    /// Return the persisted credential if usable, refresh it if possible,
    /// otherwise run the consent flow. Anything newly obtained is persisted
    /// before it is returned.
    pub fn acquire(&self) -> Result<Credential, AuthError> {
        let now = Utc::now();

        if let Some(stored) = self.store.load() {
            if !stored.covers(&REQUIRED_SCOPES) {
                info!("stored credential lacks required scopes, requesting consent");
            } else if !stored.is_expired_at(now) {
                return Ok(stored);
            } else if let Some(refresh_token) = stored.refresh_token() {
                match self.endpoint.refresh(&self.config, refresh_token) {
                    Ok(response) => {
                        let refreshed =
                            response.into_credential(Some(refresh_token), stored.scopes(), now);
                        self.store.save(&refreshed)?;
                        info!("refreshed stored credential");
                        return Ok(refreshed);
                    }
                    Err(err) => {
                        warn!(error = %err, "refresh rejected, falling back to consent");
                    }
                }
            }
        }

        let grant = self.consent.authorize(&self.config, &REQUIRED_SCOPES)?;
        let response = self.endpoint.exchange_code(&self.config, &grant)?;
        let default_scopes: Vec<String> = REQUIRED_SCOPES.iter().map(|s| s.to_string()).collect();
        let credential = response.into_credential(None, &default_scopes, now);
        self.store.save(&credential)?;
        Ok(credential)
    }
}

impl<T: TokenEndpoint, C: ConsentFlow> CredentialSource for CredentialManager<T, C> {
    fn acquire(&self) -> Result<Credential, AuthError> {
        CredentialManager::acquire(self)
    }
}
