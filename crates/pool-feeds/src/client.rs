//! Rate-limited, caching HTTP client for the score and odds feeds.
//!
//! Explicitly constructed and passed by reference; there is no module-global
//! client. Requests flow through a token bucket, responses land in a TTL
//! cache keyed by URL, and a failed refresh falls back to a stale cache entry
//! before surfacing [`FeedError::Unavailable`].

use std::collections::HashMap;
use std::time::{Duration, Instant};

use anyhow::Context;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::FeedError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RetryDisposition {
    Retryable,
    NonRetryable,
}

fn classify_status(status: StatusCode) -> RetryDisposition {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        RetryDisposition::Retryable
    } else {
        RetryDisposition::NonRetryable
    }
}

fn classify_reqwest_error(err: &reqwest::Error) -> RetryDisposition {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        RetryDisposition::Retryable
    } else {
        RetryDisposition::NonRetryable
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub max_retries: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl BackoffPolicy {
    pub fn delay_for_attempt(&self, attempt_index: usize) -> Duration {
        let factor = 1u32.checked_shl(attempt_index as u32).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

#[derive(Debug)]
struct TokenBucketState {
    tokens: u32,
    last_refill: Instant,
}

/// Fixed-capacity token bucket refilled one token per `refill_every`.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: u32,
    refill_every: Duration,
    state: Mutex<TokenBucketState>,
}

impl TokenBucket {
    pub fn new(capacity: u32, refill_every: Duration) -> Self {
        Self {
            capacity,
            refill_every,
            state: Mutex::new(TokenBucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    pub async fn take(&self) {
        loop {
            let mut state = self.state.lock().await;
            let elapsed = state.last_refill.elapsed();
            if elapsed >= self.refill_every && self.refill_every.as_millis() > 0 {
                let refills = (elapsed.as_millis() / self.refill_every.as_millis()) as u32;
                state.tokens = state.tokens.saturating_add(refills).min(self.capacity);
                state.last_refill = Instant::now();
            }

            if state.tokens > 0 {
                state.tokens -= 1;
                return;
            }

            let sleep_for = self.refill_every;
            drop(state);
            tokio::time::sleep(sleep_for).await;
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeedClientConfig {
    pub timeout: Duration,
    pub user_agent: Option<String>,
    /// Token bucket sizing: `rate_limit` requests, one token back per
    /// `rate_window / rate_limit`.
    pub rate_limit: u32,
    pub rate_window: Duration,
    pub cache_ttl: Duration,
    pub backoff: BackoffPolicy,
}

impl Default for FeedClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: None,
            rate_limit: 10,
            rate_window: Duration::from_secs(60),
            cache_ttl: Duration::from_secs(300),
            backoff: BackoffPolicy::default(),
        }
    }
}

struct CacheEntry {
    fetched_at: Instant,
    body: Vec<u8>,
}

pub struct FeedClient {
    client: reqwest::Client,
    bucket: TokenBucket,
    cache: Mutex<HashMap<String, CacheEntry>>,
    cache_ttl: Duration,
    backoff: BackoffPolicy,
}

impl FeedClient {
    pub fn new(config: FeedClientConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder().gzip(true).timeout(config.timeout);
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let client = builder.build().context("building reqwest client")?;

        let rate_limit = config.rate_limit.max(1);
        let refill_every = config
            .rate_window
            .checked_div(rate_limit)
            .unwrap_or(Duration::from_secs(6));

        Ok(Self {
            client,
            bucket: TokenBucket::new(rate_limit, refill_every),
            cache: Mutex::new(HashMap::new()),
            cache_ttl: config.cache_ttl,
            backoff: config.backoff,
        })
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FeedError> {
        let body = self.get_bytes(url).await?;
        serde_json::from_slice(&body).map_err(|err| FeedError::Malformed {
            url: url.to_string(),
            reason: err.to_string(),
        })
    }

    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FeedError> {
        {
            let cache = self.cache.lock().await;
            if let Some(entry) = cache.get(url) {
                if entry.fetched_at.elapsed() < self.cache_ttl {
                    debug!(url, "feed cache hit");
                    return Ok(entry.body.clone());
                }
            }
        }

        self.bucket.take().await;

        match self.fetch_with_retries(url).await {
            Ok(body) => {
                let mut cache = self.cache.lock().await;
                cache.insert(
                    url.to_string(),
                    CacheEntry {
                        fetched_at: Instant::now(),
                        body: body.clone(),
                    },
                );
                Ok(body)
            }
            Err(err) => {
                // A stale answer beats no answer for an informational feed.
                let cache = self.cache.lock().await;
                if let Some(entry) = cache.get(url) {
                    warn!(url, error = %err, "feed refresh failed; serving stale cache");
                    return Ok(entry.body.clone());
                }
                Err(err)
            }
        }
    }

    async fn fetch_with_retries(&self, url: &str) -> Result<Vec<u8>, FeedError> {
        let unavailable = |reason: String| FeedError::Unavailable {
            url: url.to_string(),
            reason,
        };

        let mut last_error: Option<String> = None;
        for attempt in 0..=self.backoff.max_retries {
            match self.client.get(url).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return resp
                            .bytes()
                            .await
                            .map(|b| b.to_vec())
                            .map_err(|err| unavailable(err.to_string()));
                    }
                    if classify_status(status) == RetryDisposition::Retryable
                        && attempt < self.backoff.max_retries
                    {
                        tokio::time::sleep(self.backoff.delay_for_attempt(attempt)).await;
                        last_error = Some(format!("http status {status}"));
                        continue;
                    }
                    return Err(unavailable(format!("http status {status}")));
                }
                Err(err) => {
                    if classify_reqwest_error(&err) == RetryDisposition::Retryable
                        && attempt < self.backoff.max_retries
                    {
                        tokio::time::sleep(self.backoff.delay_for_attempt(attempt)).await;
                        last_error = Some(err.to_string());
                        continue;
                    }
                    return Err(unavailable(err.to_string()));
                }
            }
        }

        Err(unavailable(
            last_error.unwrap_or_else(|| "retries exhausted".to_string()),
        ))
    }
}
