// Thin client for the NDC distribution API.
//
// The transformer consumes the documents this client fetches but never
// depends on it; the client owns transport, auth headers and retry policy.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::token_cache::{AuthError, CredentialSource, TokenCache};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("API error: {status} - {message}")]
    Response {
        status: u16,
        message: String,
        is_retryable: bool,
    },

    #[error("retries exhausted after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Airline code sent as the ThirdpartyId header when targeting a
    /// specific carrier (extracted from the priced offer's Owner field).
    pub third_party_id: Option<String>,
    pub retry: RetryConfig,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            third_party_id: None,
            retry: RetryConfig::default(),
        }
    }
}

pub struct NdcApiClient<S: CredentialSource> {
    http: reqwest::Client,
    config: ClientConfig,
    tokens: TokenCache<S>,
}

impl<S: CredentialSource> NdcApiClient<S> {
    pub fn new(http: reqwest::Client, config: ClientConfig, tokens: TokenCache<S>) -> Self {
        Self {
            http,
            config,
            tokens,
        }
    }

    pub async fn air_shopping(&self, payload: &Value) -> Result<Value, ApiError> {
        self.post("/entrygate/rest/request:airShopping", payload).await
    }

    pub async fn flight_price(&self, payload: &Value) -> Result<Value, ApiError> {
        self.post("/entrygate/rest/request:flightPrice", payload).await
    }

    pub async fn order_create(&self, payload: &Value) -> Result<Value, ApiError> {
        self.post("/entrygate/rest/request:orderCreate", payload).await
    }

    async fn post(&self, endpoint: &str, payload: &Value) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint);

        let mut attempt = 0;
        loop {
            let authorization = self.tokens.authorization_header().await?;

            let mut request = self
                .http
                .post(&url)
                .header("Authorization", &authorization)
                .json(payload);
            if let Some(third_party) = &self.config.third_party_id {
                request = request.header("ThirdpartyId", third_party);
            }

            debug!(%url, attempt, "sending NDC request");
            let response = request.send().await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response.json().await?);
            }

            // An expired token slipping past the buffer comes back as 401;
            // drop it so the retry fetches a fresh one.
            if status.as_u16() == 401 {
                self.tokens.invalidate();
            }

            let retryable =
                status.as_u16() == 401 || status.as_u16() == 429 || status.is_server_error();
            let message = response.text().await.unwrap_or_default();

            if !retryable {
                return Err(ApiError::Response {
                    status: status.as_u16(),
                    message,
                    is_retryable: false,
                });
            }
            if attempt >= self.config.retry.max_retries {
                warn!(%url, attempts = attempt + 1, "retries exhausted");
                return Err(ApiError::RetriesExhausted {
                    attempts: attempt + 1,
                });
            }

            let backoff = calculate_backoff(attempt, &self.config.retry);
            warn!(%url, status = status.as_u16(), ?backoff, "retrying NDC request");
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }
}

/// Exponential backoff with jitter to spread concurrent retries.
pub fn calculate_backoff(retry_attempt: u32, config: &RetryConfig) -> Duration {
    let base_backoff_ms = (config.initial_backoff_ms as f64
        * config.backoff_multiplier.powf(retry_attempt as f64))
    .min(config.max_backoff_ms as f64);

    let jitter = rand::random::<f64>() * config.jitter_factor * base_backoff_ms;
    let backoff_ms = base_backoff_ms * (1.0 - config.jitter_factor / 2.0) + jitter;

    Duration::from_millis(backoff_ms as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_stays_bounded() {
        let config = RetryConfig::default();
        let first = calculate_backoff(0, &config);
        let second = calculate_backoff(1, &config);
        let far = calculate_backoff(20, &config);

        // Around 100ms and 200ms, within the jitter envelope.
        assert!(first >= Duration::from_millis(90) && first <= Duration::from_millis(115));
        assert!(second >= Duration::from_millis(180) && second <= Duration::from_millis(230));
        // Capped by max_backoff_ms plus jitter headroom.
        assert!(far <= Duration::from_millis(10_600));
    }

    #[test]
    fn client_config_defaults() {
        let config = ClientConfig::new("https://api.example.com/");
        assert!(config.third_party_id.is_none());
        assert_eq!(config.retry.max_retries, 3);
    }
}
