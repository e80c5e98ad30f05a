// crates/core/src/auth/config.rs

use std::fmt;
use std::fs;

use serde::Deserialize;

use crate::error::AuthError;

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// OAuth client application registration.
///
/// Read from `GOOGLE_CLIENT_SECRET_JSON` (the JSON itself) or
/// `GOOGLE_CLIENT_SECRET_FILE` (a path to it), in the shape the Google Cloud
/// console downloads: `{"installed": {...}}` or `{"web": {...}}`.
#[derive(Clone, Deserialize)]
pub struct ClientConfig {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientConfig>,
    web: Option<ClientConfig>,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ClientConfig {
    pub fn from_json(raw: &str) -> Result<Self, AuthError> {
        let file: ClientSecretFile = serde_json::from_str(raw)
            .map_err(|e| AuthError::MissingClientConfig(format!("malformed client JSON: {e}")))?;

        let config = file.installed.or(file.web).ok_or_else(|| {
            AuthError::MissingClientConfig(
                "client JSON has neither an 'installed' nor a 'web' section".to_string(),
            )
        })?;

        if config.client_id.trim().is_empty() {
            return Err(AuthError::MissingClientConfig(
                "client_id is empty".to_string(),
            ));
        }
        Ok(config)
    }

    pub fn from_env() -> Result<Self, AuthError> {
        if let Ok(raw) = std::env::var("GOOGLE_CLIENT_SECRET_JSON") {
            return Self::from_json(&raw);
        }
        if let Ok(path) = std::env::var("GOOGLE_CLIENT_SECRET_FILE") {
            let raw = fs::read_to_string(&path).map_err(|e| {
                AuthError::MissingClientConfig(format!("cannot read {path}: {e}"))
            })?;
            return Self::from_json(&raw);
        }
        Err(AuthError::MissingClientConfig(
            "set GOOGLE_CLIENT_SECRET_JSON or GOOGLE_CLIENT_SECRET_FILE".to_string(),
        ))
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("auth_uri", &self.auth_uri)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}
