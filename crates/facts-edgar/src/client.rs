//! Byte-level document transport with rate limiting and retry.

use async_trait::async_trait;
use facts_core::{DataError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

/// Default rate limit: 10 requests per second (the regulator's ceiling).
const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(100);

/// Delivery attempts before a fetch gives up.
const MAX_ATTEMPTS: u32 = 3;

/// Backoff before the second attempt, doubled after each further failure.
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);

/// Rate limiter to ensure we don't exceed the regulator's request ceiling.
#[derive(Debug)]
struct RateLimiter {
    last_request: Instant,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Instant::now() - min_interval,
            min_interval,
        }
    }

    async fn wait(&mut self) {
        let elapsed = self.last_request.elapsed();
        if elapsed < self.min_interval {
            sleep(self.min_interval - elapsed).await;
        }
        self.last_request = Instant::now();
    }
}

/// Fetches documents as raw bytes.
///
/// The production implementation is [`HttpTransport`]; tests substitute a
/// canned transport to drive the pipeline without a network.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetches the document at `url`.
    ///
    /// # Errors
    /// Returns [`DataError::Unavailable`] when the server reports the
    /// document does not exist, and [`DataError::Network`] for transport
    /// failures and other error statuses.
    async fn get(&self, url: &str) -> Result<Vec<u8>>;
}

/// HTTP transport with rate limiting, retry, and an identifying user agent.
///
/// The regulator requires identifying user agent headers and caps request
/// rates at 10 per second; both are enforced here so callers never have to
/// think about them.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    rate_limiter: Arc<Mutex<RateLimiter>>,
}

impl HttpTransport {
    /// Create a new transport with the specified user agent.
    ///
    /// Format should be: "AppName/Version (contact@email.com)"
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DataError::Network(e.to_string()))?;
        Ok(Self::with_client(client))
    }

    /// Create a transport over a pre-configured client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(DEFAULT_RATE_LIMIT))),
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<Vec<u8>> {
        self.rate_limiter.lock().await.wait().await;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DataError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DataError::Unavailable(url.to_string()));
        }
        if !status.is_success() {
            return Err(DataError::Network(format!(
                "Failed to fetch {}: HTTP {}",
                url, status
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| DataError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        let mut backoff = INITIAL_BACKOFF;
        let mut last_error = None;

        for attempt in 1..=MAX_ATTEMPTS {
            debug!("Fetching {} (attempt {}/{})", url, attempt, MAX_ATTEMPTS);
            match self.fetch_once(url).await {
                Ok(bytes) => {
                    debug!("Fetched {} bytes from {}", bytes.len(), url);
                    return Ok(bytes);
                }
                // A definitive "does not exist" is not worth retrying
                Err(e @ DataError::Unavailable(_)) => return Err(e),
                Err(e) => {
                    warn!("Attempt {}/{} for {} failed: {}", attempt, MAX_ATTEMPTS, url, e);
                    last_error = Some(e);
                    if attempt < MAX_ATTEMPTS {
                        sleep(backoff).await;
                        backoff *= 2;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DataError::Network(format!("Failed to fetch {}", url))))
    }
}
