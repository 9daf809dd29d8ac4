//! HTTP client with connection pooling and retry logic

use keg_errors::{Error, FetchError};
use keg_events::{AppEvent, DownloadEvent, EventEmitter};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use url::Url;

/// Network client configuration
#[derive(Debug, Clone)]
pub struct NetConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub pool_idle_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub retry_count: u32,
    pub retry_delay: Duration,
    pub user_agent: String,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300), // 5 minutes for large downloads
            connect_timeout: Duration::from_secs(30),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 4,
            retry_count: 3,
            retry_delay: Duration::from_secs(1),
            user_agent: format!("keg/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// HTTP client wrapper with retry logic
#[derive(Clone)]
pub struct NetClient {
    client: Client,
    config: NetConfig,
}

impl NetClient {
    /// Create a new network client
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to initialize.
    pub fn new(config: NetConfig) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| FetchError::ConnectionRefused(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Create with default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created with default settings.
    pub fn with_defaults() -> Result<Self, Error> {
        Self::new(NetConfig::default())
    }

    /// Execute a GET request with retries
    ///
    /// The response is returned whatever its status once retries are
    /// exhausted; callers decide what a non-2xx status means. Each retry
    /// emits `DownloadEvent::Retrying`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after all retry attempts, including
    /// network timeouts, connection failures, or rate limiting.
    pub async fn get<E>(&self, url: &Url, events: &E) -> Result<Response, Error>
    where
        E: EventEmitter + ?Sized,
    {
        self.retry_request(url, events, || self.client.get(url.clone()).send())
            .await
    }

    /// Execute a request with retries
    async fn retry_request<E, F, Fut>(
        &self,
        url: &Url,
        events: &E,
        mut f: F,
    ) -> Result<Response, Error>
    where
        E: EventEmitter + ?Sized,
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<Response, reqwest::Error>>,
    {
        let mut last_error = None;
        let mut reason = String::new();

        for attempt in 0..=self.config.retry_count {
            if attempt > 0 {
                tracing::debug!(%url, attempt, %reason, "retrying request");
                events.emit(AppEvent::Download(DownloadEvent::Retrying {
                    url: url.to_string(),
                    attempt,
                    max_attempts: self.config.retry_count,
                    reason: std::mem::take(&mut reason),
                }));
                tokio::time::sleep(self.config.retry_delay * attempt).await;
            }

            match f().await {
                Ok(response) => {
                    // Check for rate limiting
                    if response.status() == StatusCode::TOO_MANY_REQUESTS {
                        if let Some(retry_after) = response
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|s| s.parse::<u64>().ok())
                        {
                            return Err(FetchError::RateLimited {
                                seconds: retry_after,
                            }
                            .into());
                        }
                    }

                    // Server errors are transient; hand the last one back as-is
                    if response.status().is_server_error() && attempt < self.config.retry_count {
                        reason = format!("HTTP {}", response.status());
                        continue;
                    }

                    return Ok(response);
                }
                Err(e) => {
                    let retry = Self::should_retry(&e);
                    reason = e.to_string();
                    last_error = Some(e);

                    // Don't retry on certain errors
                    if !retry {
                        break;
                    }
                }
            }
        }

        // Convert the last error
        match last_error {
            Some(e) if e.is_timeout() => Err(FetchError::Timeout {
                url: url.to_string(),
            }
            .into()),
            Some(e) if e.is_connect() => Err(FetchError::ConnectionRefused(e.to_string()).into()),
            Some(e) => Err(FetchError::DownloadFailed {
                url: url.to_string(),
                message: e.to_string(),
            }
            .into()),
            None => Err(FetchError::DownloadFailed {
                url: url.to_string(),
                message: "unknown error".to_string(),
            }
            .into()),
        }
    }

    /// Determine if an error should be retried
    fn should_retry(error: &reqwest::Error) -> bool {
        // Retry on timeout, connection errors, and server errors
        error.is_timeout()
            || error.is_connect()
            || error.status().is_none_or(|s| s.is_server_error())
    }
}
