// OAuth2 token cache for the distribution API.
//
// The transformer core never touches this; it exists for the request
// pipeline around it. Contract: a valid cached token is reused by any
// number of concurrent callers, at most one refresh runs at a time, and a
// token is treated as expired `expiry_buffer` ahead of its real expiry so
// in-flight requests never ride a token that dies mid-call.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("missing required configuration: {0}")]
    MissingConfig(&'static str),

    #[error("token request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid token response: {0}")]
    InvalidTokenResponse(String),
}

#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub token_url: String,
    pub username: String,
    pub password: String,
    /// Tokens are considered expired this long before their real expiry.
    pub expiry_buffer: Duration,
}

impl TokenConfig {
    pub fn new(token_url: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            token_url: token_url.into(),
            username: username.into(),
            password: password.into(),
            expiry_buffer: Duration::from_secs(60),
        }
    }

    fn validate(&self) -> Result<(), AuthError> {
        if self.token_url.is_empty() {
            return Err(AuthError::MissingConfig("token_url"));
        }
        if self.username.is_empty() {
            return Err(AuthError::MissingConfig("username"));
        }
        if self.password.is_empty() {
            return Err(AuthError::MissingConfig("password"));
        }
        Ok(())
    }
}

/// A freshly issued token as returned by the credential endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Where fresh tokens come from; mocked in tests.
#[async_trait]
pub trait CredentialSource: Send + Sync + 'static {
    async fn fetch_token(&self) -> Result<TokenGrant, AuthError>;
}

/// Client-credentials grant against the API's token endpoint, authenticated
/// with HTTP basic auth.
pub struct OAuthClientCredentialsSource {
    http: reqwest::Client,
    config: TokenConfig,
}

impl OAuthClientCredentialsSource {
    pub fn new(http: reqwest::Client, config: TokenConfig) -> Result<Self, AuthError> {
        config.validate()?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl CredentialSource for OAuthClientCredentialsSource {
    async fn fetch_token(&self) -> Result<TokenGrant, AuthError> {
        debug!(url = %self.config.token_url, "requesting access token");
        let response = self
            .http
            .post(&self.config.token_url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?
            .error_for_status()?;

        let grant: TokenGrant = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidTokenResponse(e.to_string()))?;
        if grant.access_token.is_empty() {
            return Err(AuthError::InvalidTokenResponse(
                "empty access_token".to_string(),
            ));
        }
        Ok(grant)
    }
}

#[derive(Debug, Default)]
struct TokenCacheStats {
    token_requests: AtomicUsize,
    cache_hits: AtomicUsize,
    refreshes: AtomicUsize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TokenCacheStatsReport {
    pub token_requests: usize,
    pub cache_hits: usize,
    pub refreshes: usize,
}

#[derive(Clone)]
struct CachedToken {
    header: String,
    expires_at: Instant,
}

/// In-memory token cache with single-flight refresh.
pub struct TokenCache<S: CredentialSource> {
    source: S,
    expiry_buffer: Duration,
    current: RwLock<Option<CachedToken>>,
    refresh_lock: tokio::sync::Mutex<()>,
    stats: TokenCacheStats,
}

impl<S: CredentialSource> TokenCache<S> {
    pub fn new(source: S, expiry_buffer: Duration) -> Self {
        Self {
            source,
            expiry_buffer,
            current: RwLock::new(None),
            refresh_lock: tokio::sync::Mutex::new(()),
            stats: TokenCacheStats::default(),
        }
    }

    /// Returns an `Authorization`-ready header value, refreshing the token
    /// if the cached one is absent or inside the expiry buffer.
    pub async fn authorization_header(&self) -> Result<String, AuthError> {
        self.stats.token_requests.fetch_add(1, Ordering::SeqCst);

        if let Some(header) = self.valid_cached_header() {
            self.stats.cache_hits.fetch_add(1, Ordering::SeqCst);
            return Ok(header);
        }

        // Single-flight: concurrent callers queue here and then reuse the
        // token the first one fetched.
        let _guard = self.refresh_lock.lock().await;
        if let Some(header) = self.valid_cached_header() {
            self.stats.cache_hits.fetch_add(1, Ordering::SeqCst);
            return Ok(header);
        }

        let grant = self.source.fetch_token().await?;
        self.stats.refreshes.fetch_add(1, Ordering::SeqCst);

        let lifetime = Duration::from_secs(grant.expires_in)
            .saturating_sub(self.expiry_buffer);
        let token_type = if grant.token_type.is_empty() {
            "Bearer"
        } else {
            grant.token_type.as_str()
        };
        let cached = CachedToken {
            header: format!("{} {}", token_type, grant.access_token),
            expires_at: Instant::now() + lifetime,
        };
        let header = cached.header.clone();
        *self.current.write() = Some(cached);
        info!(expires_in = grant.expires_in, "cached fresh access token");
        Ok(header)
    }

    /// Drops the cached token; the next caller refreshes.
    pub fn invalidate(&self) {
        *self.current.write() = None;
    }

    pub fn stats(&self) -> TokenCacheStatsReport {
        TokenCacheStatsReport {
            token_requests: self.stats.token_requests.load(Ordering::SeqCst),
            cache_hits: self.stats.cache_hits.load(Ordering::SeqCst),
            refreshes: self.stats.refreshes.load(Ordering::SeqCst),
        }
    }

    fn valid_cached_header(&self) -> Option<String> {
        let guard = self.current.read();
        let cached = guard.as_ref()?;
        if cached.expires_at > Instant::now() {
            Some(cached.header.clone())
        } else {
            None
        }
    }
}
