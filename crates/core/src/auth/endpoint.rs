// crates/core/src/auth/endpoint.rs

use std::time::Duration;

use reqwest::blocking::Client;

use super::{AuthorizationGrant, ClientConfig, TokenEndpoint, TokenResponse};
use crate::error::AuthError;

/// Google OAuth token endpoint over blocking HTTPS.
pub struct GoogleTokenEndpoint {
    client: Client,
}

impl GoogleTokenEndpoint {
    pub fn new() -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(|e| AuthError::Consent(format!("could not build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    fn post_form(
        &self,
        config: &ClientConfig,
        params: &[(&str, &str)],
    ) -> Result<TokenResponse, AuthError> {
        let mut form: Vec<(&str, &str)> = params.to_vec();
        form.push(("client_id", config.client_id.as_str()));
        if let Some(secret) = config.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }

        let response = self
            .client
            .post(&config.token_uri)
            .form(&form)
            .send()
            .map_err(|e| AuthError::TokenRejected(format!("token endpoint unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AuthError::TokenRejected(format!("HTTP {status} - {body}")));
        }

        response
            .json::<TokenResponse>()
            .map_err(|e| AuthError::TokenRejected(format!("unparseable token response: {e}")))
    }
}

impl TokenEndpoint for GoogleTokenEndpoint {
    fn exchange_code(
        &self,
        config: &ClientConfig,
        grant: &AuthorizationGrant,
    ) -> Result<TokenResponse, AuthError> {
        self.post_form(
            config,
            &[
                ("grant_type", "authorization_code"),
                ("code", grant.code.as_str()),
                ("redirect_uri", grant.redirect_uri.as_str()),
                ("code_verifier", grant.code_verifier.as_str()),
            ],
        )
    }

    fn refresh(
        &self,
        config: &ClientConfig,
        refresh_token: &str,
    ) -> Result<TokenResponse, AuthError> {
        self.post_form(
            config,
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ],
        )
    }
}
