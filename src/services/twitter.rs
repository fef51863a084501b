use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Anything that can publish plain text to the platform and return the new post id
#[async_trait]
pub trait PostingClient: Send + Sync {
    async fn create_post(&self, text: &str) -> Result<String, PublishError>;
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("X API error (status {status}): {body}")]
    Api { status: u16, body: String },
    #[error("X credentials unusable: {0}")]
    Auth(String),
    /// No response arrived: connect failure or timeout
    #[error("{0}")]
    Network(String),
}

impl PublishError {
    /// Classify a failed `send()`; errors after a response stay `Http`
    fn from_send(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            PublishError::Network("timeout".into())
        } else if e.is_connect() {
            PublishError::Network(format!("connection failed: {e}"))
        } else {
            PublishError::Http(e)
        }
    }
}

/// OAuth 2.0 user credentials supplied at construction
#[derive(Debug, Clone)]
pub struct TwitterCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// None when the token does not expire (or expiry is unknown)
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
struct Tokens {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl Tokens {
    /// Expired, or expiring within a minute
    fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|at| at <= now + Duration::seconds(60))
    }
}

pub struct TwitterClient {
    client_id: String,
    client_secret: String,
    api_base: String,
    http: Client,
    tokens: Mutex<Tokens>,
}

impl TwitterClient {
    pub fn new(
        credentials: TwitterCredentials,
        api_base: &str,
        timeout: std::time::Duration,
    ) -> Result<Self, PublishError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client_id: credentials.client_id,
            client_secret: credentials.client_secret,
            api_base: api_base.trim_end_matches('/').to_string(),
            http,
            tokens: Mutex::new(Tokens {
                access_token: credentials.access_token,
                refresh_token: credentials.refresh_token,
                expires_at: credentials.expires_at,
            }),
        })
    }

    /// Build Basic auth header for OAuth token requests
    fn basic_auth_header(&self) -> String {
        let credentials = format!("{}:{}", self.client_id, self.client_secret);
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(credentials)
        )
    }

    /// Return a usable access token, refreshing first if it has expired.
    /// The lock is held across the refresh so concurrent posts refresh once.
    async fn access_token(&self) -> Result<String, PublishError> {
        let mut tokens = self.tokens.lock().await;
        if !tokens.needs_refresh(Utc::now()) {
            return Ok(tokens.access_token.clone());
        }

        let refresh_token = tokens.refresh_token.clone().ok_or_else(|| {
            PublishError::Auth("access token expired and no refresh token configured".into())
        })?;

        debug!("Refreshing X access token");
        let fresh = self.refresh_token(&refresh_token).await?;

        tokens.access_token = fresh.access_token;
        if fresh.refresh_token.is_some() {
            tokens.refresh_token = fresh.refresh_token;
        }
        tokens.expires_at = Some(Utc::now() + Duration::seconds(fresh.expires_in));
        info!(expires_at = ?tokens.expires_at, "Refreshed X access token");

        Ok(tokens.access_token.clone())
    }

    /// Exchange a refresh token for a new access token
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, PublishError> {
        let url = format!("{}/oauth2/token", self.api_base);

        let params = [
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
            ("client_id", self.client_id.as_str()),
        ];

        let resp = self
            .http
            .post(url)
            .header("Authorization", self.basic_auth_header())
            .header("Content-Type", "application/x-www-form-urlencoded")
            .form(&params)
            .send()
            .await
            .map_err(PublishError::from_send)?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await?;
            return Err(PublishError::Auth(format!(
                "token refresh failed (status {}): {}",
                status.as_u16(),
                text
            )));
        }

        let token: TokenResponse = resp.json().await?;
        Ok(token)
    }

    /// Post a single text-only tweet
    async fn post_tweet(&self, access_token: &str, text: &str) -> Result<TweetResponse, PublishError> {
        let url = format!("{}/tweets", self.api_base);

        let body = serde_json::json!({ "text": text });

        let resp = self
            .http
            .post(url)
            .header("Authorization", format!("Bearer {}", access_token))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(PublishError::from_send)?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await?;
            return Err(PublishError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        let wrapper: TweetResponseWrapper = resp.json().await?;
        Ok(wrapper.data)
    }
}

#[async_trait]
impl PostingClient for TwitterClient {
    async fn create_post(&self, text: &str) -> Result<String, PublishError> {
        let access_token = self.access_token().await?;
        let tweet = self.post_tweet(&access_token, text).await?;
        Ok(tweet.id)
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TweetResponseWrapper {
    data: TweetResponse,
}

#[derive(Debug, Deserialize)]
struct TweetResponse {
    id: String,
    #[allow(dead_code)]
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(expires_at: Option<DateTime<Utc>>) -> Tokens {
        Tokens {
            access_token: "a".into(),
            refresh_token: Some("r".into()),
            expires_at,
        }
    }

    #[test]
    fn tokens_without_expiry_never_refresh() {
        assert!(!tokens(None).needs_refresh(Utc::now()));
    }

    #[test]
    fn tokens_refresh_shortly_before_expiry() {
        let now = Utc::now();
        assert!(tokens(Some(now - Duration::minutes(5))).needs_refresh(now));
        assert!(tokens(Some(now + Duration::seconds(30))).needs_refresh(now));
        assert!(!tokens(Some(now + Duration::hours(1))).needs_refresh(now));
    }

    #[test]
    fn create_tweet_response_is_unwrapped() {
        let raw = r#"{"data":{"id":"1790000000000000000","text":"hello","edit_history_tweet_ids":["1790000000000000000"]}}"#;
        let wrapper: TweetResponseWrapper = serde_json::from_str(raw).unwrap();
        assert_eq!(wrapper.data.id, "1790000000000000000");
    }

    #[tokio::test]
    async fn expired_token_without_refresh_token_is_an_auth_error() {
        let client = TwitterClient::new(
            TwitterCredentials {
                client_id: "id".into(),
                client_secret: "secret".into(),
                access_token: "stale".into(),
                refresh_token: None,
                expires_at: Some(Utc::now() - Duration::hours(1)),
            },
            "http://127.0.0.1:9",
            std::time::Duration::from_secs(1),
        )
        .unwrap();

        let err = client.create_post("hello").await.unwrap_err();
        assert!(matches!(err, PublishError::Auth(_)));
    }

    #[tokio::test]
    async fn unreachable_api_is_a_network_error() {
        let client = TwitterClient::new(
            TwitterCredentials {
                client_id: "id".into(),
                client_secret: "secret".into(),
                access_token: "token".into(),
                refresh_token: None,
                expires_at: None,
            },
            "http://127.0.0.1:1",
            std::time::Duration::from_secs(2),
        )
        .unwrap();

        let err = client.create_post("hello").await.unwrap_err();
        match err {
            PublishError::Network(message) => assert!(message.starts_with("connection failed")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
