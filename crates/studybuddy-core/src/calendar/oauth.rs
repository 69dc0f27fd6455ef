//! Server-side OAuth2 Authorization Code flow for Google Calendar.
//!
//! The server hands the authorization URL to the caller, receives the
//! authorization code over its own API, exchanges it for tokens, and keeps
//! the tokens in an explicit [`CalendarSession`] that refreshes access
//! tokens in place when they expire.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::GoogleConfig;
use crate::error::OAuthError;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<i64>, // Unix timestamp
    pub token_type: String,
    pub scope: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    pub scopes: Vec<String>,
    pub redirect_uri: String,
}

impl OAuthConfig {
    /// Build the Google Calendar OAuth config from application settings.
    ///
    /// # Errors
    /// Returns `CredentialsNotConfigured` when client id or secret is
    /// missing.
    pub fn google(config: &GoogleConfig) -> Result<Self, OAuthError> {
        let (Some(client_id), Some(client_secret)) =
            (config.client_id.clone(), config.client_secret.clone())
        else {
            return Err(OAuthError::CredentialsNotConfigured {
                service: "google".to_string(),
            });
        };

        Ok(Self {
            client_id,
            client_secret,
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            scopes: vec![
                "https://www.googleapis.com/auth/calendar.events".to_string(),
                "https://www.googleapis.com/auth/calendar".to_string(),
            ],
            redirect_uri: config.redirect_uri.clone(),
        })
    }

    /// Authorization URL for manual consent, requesting offline access so
    /// a refresh token is issued.
    pub fn authorization_url(&self) -> String {
        let scopes = self.scopes.join(" ");
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            self.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(&scopes),
        )
    }
}

/// Exchange an authorization code for tokens.
pub async fn exchange_code(config: &OAuthConfig, code: &str) -> Result<OAuthTokens, OAuthError> {
    let client = Client::new();
    let params = [
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
        ("code", code),
        ("grant_type", "authorization_code"),
        ("redirect_uri", config.redirect_uri.as_str()),
    ];

    let body: serde_json::Value = client
        .post(&config.token_url)
        .form(&params)
        .send()
        .await?
        .json()
        .await?;

    if let Some(error) = body.get("error") {
        return Err(OAuthError::TokenExchangeFailed(error.to_string()));
    }

    Ok(parse_token_response(&body, None))
}

/// Refresh an access token using a refresh token.
pub async fn refresh_token(config: &OAuthConfig, refresh: &str) -> Result<OAuthTokens, OAuthError> {
    let client = Client::new();
    let params = [
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
        ("refresh_token", refresh),
        ("grant_type", "refresh_token"),
    ];

    let body: serde_json::Value = client
        .post(&config.token_url)
        .form(&params)
        .send()
        .await?
        .json()
        .await?;

    if let Some(error) = body.get("error") {
        return Err(OAuthError::TokenRefreshFailed(error.to_string()));
    }

    Ok(parse_token_response(&body, Some(refresh)))
}

fn parse_token_response(body: &serde_json::Value, previous_refresh: Option<&str>) -> OAuthTokens {
    let expires_in = body.get("expires_in").and_then(|v| v.as_i64());
    let expires_at = expires_in.map(|ei| chrono::Utc::now().timestamp() + ei);

    OAuthTokens {
        access_token: body["access_token"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
        refresh_token: body
            .get("refresh_token")
            .and_then(|v| v.as_str())
            .map(String::from)
            .or_else(|| previous_refresh.map(String::from)),
        expires_at,
        token_type: body["token_type"].as_str().unwrap_or("Bearer").to_string(),
        scope: body.get("scope").and_then(|v| v.as_str()).map(String::from),
    }
}

/// Check if stored tokens are expired (with 60s buffer).
pub fn is_expired(tokens: &OAuthTokens) -> bool {
    match tokens.expires_at {
        Some(exp) => chrono::Utc::now().timestamp() > exp - 60,
        None => false,
    }
}

/// An authenticated Google Calendar session.
///
/// Holds the OAuth config and current tokens; callers construct one after
/// the code exchange (or from persisted tokens) and pass it to each
/// calendar call. Access tokens are refreshed in place when expired.
#[derive(Debug, Clone)]
pub struct CalendarSession {
    config: OAuthConfig,
    tokens: OAuthTokens,
}

impl CalendarSession {
    pub fn new(config: OAuthConfig, tokens: OAuthTokens) -> Self {
        Self { config, tokens }
    }

    pub fn tokens(&self) -> &OAuthTokens {
        &self.tokens
    }

    /// Return a valid access token, refreshing first when expired.
    ///
    /// # Errors
    /// Returns `TokenExpired` when the token is expired and no refresh
    /// token is available, or the refresh request's failure.
    pub async fn access_token(&mut self) -> Result<String, OAuthError> {
        if !is_expired(&self.tokens) {
            return Ok(self.tokens.access_token.clone());
        }

        let refresh = self
            .tokens
            .refresh_token
            .clone()
            .ok_or(OAuthError::TokenExpired)?;

        self.tokens = refresh_token(&self.config, &refresh).await?;
        Ok(self.tokens.access_token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> OAuthConfig {
        OAuthConfig::google(&GoogleConfig {
            client_id: Some("client-123".to_string()),
            client_secret: Some("secret".to_string()),
            calendar_id: "primary".to_string(),
            time_zone: "UTC".to_string(),
            redirect_uri: "urn:ietf:wg:oauth:2.0:oob".to_string(),
        })
        .unwrap()
    }

    fn fresh_tokens() -> OAuthTokens {
        OAuthTokens {
            access_token: "at".to_string(),
            refresh_token: Some("rt".to_string()),
            expires_at: Some(chrono::Utc::now().timestamp() + 3600),
            token_type: "Bearer".to_string(),
            scope: None,
        }
    }

    #[test]
    fn missing_credentials_is_an_error() {
        let result = OAuthConfig::google(&GoogleConfig::default());
        assert!(matches!(
            result,
            Err(OAuthError::CredentialsNotConfigured { .. })
        ));
    }

    #[test]
    fn authorization_url_requests_offline_access() {
        let url = test_config().authorization_url();
        assert!(url.starts_with(GOOGLE_AUTH_URL));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("response_type=code"));
    }

    #[test]
    fn expiry_uses_sixty_second_buffer() {
        let mut tokens = fresh_tokens();
        assert!(!is_expired(&tokens));

        tokens.expires_at = Some(chrono::Utc::now().timestamp() + 30);
        assert!(is_expired(&tokens));

        tokens.expires_at = None;
        assert!(!is_expired(&tokens));
    }

    #[tokio::test]
    async fn fresh_session_returns_token_without_refresh() {
        let mut session = CalendarSession::new(test_config(), fresh_tokens());
        assert_eq!(session.access_token().await.unwrap(), "at");
    }

    #[tokio::test]
    async fn expired_session_without_refresh_token_fails() {
        let mut tokens = fresh_tokens();
        tokens.expires_at = Some(0);
        tokens.refresh_token = None;
        let mut session = CalendarSession::new(test_config(), tokens);
        assert!(matches!(
            session.access_token().await,
            Err(OAuthError::TokenExpired)
        ));
    }

    #[tokio::test]
    async fn expired_session_refreshes_against_token_endpoint() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(r#"{"access_token":"new-at","token_type":"Bearer","expires_in":3600}"#)
            .create_async()
            .await;

        let mut config = test_config();
        config.token_url = format!("{}/token", server.url());

        let mut tokens = fresh_tokens();
        tokens.expires_at = Some(0);

        let mut session = CalendarSession::new(config, tokens);
        assert_eq!(session.access_token().await.unwrap(), "new-at");
        // The previous refresh token is carried over.
        assert_eq!(session.tokens().refresh_token.as_deref(), Some("rt"));
    }
}
