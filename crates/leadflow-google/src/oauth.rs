//! OAuth2 for Google APIs: consent URL, code exchange, refresh-token grant.

use serde::{Deserialize, Serialize};

use leadflow_core::config::GoogleCredentials;

pub const AUTH_URI: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Scopes the bot needs: send mail, create calendar events.
pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/gmail.send",
    "https://www.googleapis.com/auth/calendar.events",
];

#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("token endpoint rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("no refresh token configured")]
    MissingRefreshToken,
    #[error("no access_token in token response")]
    MissingAccessToken,
}

/// Token endpoint response. Only `access_token` is guaranteed.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TokenSet {
    #[serde(default)]
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

#[derive(Clone, Debug)]
pub struct OAuthClient {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    refresh_token: Option<String>,
    token_uri: String,
    http: reqwest::Client,
}

impl OAuthClient {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            refresh_token: None,
            token_uri: TOKEN_URI.to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn from_credentials(creds: &GoogleCredentials) -> Self {
        Self::new(&creds.client_id, &creds.client_secret, &creds.redirect_uri)
            .with_refresh_token(&creds.refresh_token)
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_token_uri(mut self, token_uri: impl Into<String>) -> Self {
        self.token_uri = token_uri.into();
        self
    }

    /// Consent URL requesting offline access (so Google returns a refresh token).
    pub fn authorization_url(&self, scopes: &[&str]) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &scopes.join(" "))
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .finish();
        format!("{AUTH_URI}?{query}")
    }

    /// Exchange a one-time authorization code for a token set.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenSet, OAuthError> {
        self.token_request(&[
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .await
    }

    /// Fresh access token from the refresh token. The result is not cached.
    pub async fn refresh_access_token(&self) -> Result<String, OAuthError> {
        let refresh_token = self
            .refresh_token
            .as_deref()
            .ok_or(OAuthError::MissingRefreshToken)?;

        let tokens = self
            .token_request(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .await?;
        Ok(tokens.access_token)
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenSet, OAuthError> {
        let resp = self.http.post(&self.token_uri).form(form).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(OAuthError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let tokens: TokenSet = resp.json().await?;
        if tokens.access_token.is_empty() {
            return Err(OAuthError::MissingAccessToken);
        }
        Ok(tokens)
    }
}
