//! Rate-limited HTTP client shared by the exchange adapters.

use depthwatch_core::{CollectorError, FetchError, HttpSettings};
use governor::{Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

type DirectRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// HTTP client with request timeout, optional proxy and a rate limiter.
///
/// Clones share the same connection pool and rate limiter.
#[derive(Clone)]
pub struct HttpClient {
    http: Client,
    timeout: Duration,
    rate_limiter: Arc<DirectRateLimiter>,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Builds a client from the `[http]` settings.
    ///
    /// # Errors
    /// Returns `FatalConfiguration` for a zero rate, an unparseable proxy URL
    /// or a TLS backend that fails to initialise.
    pub fn new(settings: &HttpSettings) -> Result<Self, CollectorError> {
        let per_second = NonZeroU32::new(settings.requests_per_second)
            .ok_or_else(|| CollectorError::config("http.requests_per_second must be positive"))?;
        let timeout = settings.timeout();

        let mut builder = Client::builder()
            .timeout(timeout)
            .user_agent(settings.user_agent.clone());
        if let Some(proxy) = &settings.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| CollectorError::config(format!("invalid proxy '{proxy}': {e}")))?;
            builder = builder.proxy(proxy);
        }
        let http = builder
            .build()
            .map_err(|e| CollectorError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            timeout,
            rate_limiter: Arc::new(RateLimiter::direct(Quota::per_second(per_second))),
        })
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GETs `url` and decodes the JSON body.
    ///
    /// # Errors
    /// - `RateLimited` on HTTP 429, carrying `Retry-After` seconds if sent
    /// - `Http` on any other non-success status
    /// - `Timeout` / `Network` on transport failures
    /// - `InvalidResponse` if the body is not the expected JSON
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        self.rate_limiter.until_ready().await;

        tracing::debug!("GET {} {:?}", url, query);

        let response = self
            .http
            .get(url)
            .query(query)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse().ok());
            return Err(FetchError::RateLimited { retry_after_secs });
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(FetchError::http(status.as_u16(), text));
        }

        let body = response.bytes().await.map_err(|e| self.transport_error(&e))?;
        serde_json::from_slice(&body).map_err(|e| FetchError::invalid(format!("{url}: {e}")))
    }

    fn transport_error(&self, err: &reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else if err.is_connect() {
            FetchError::Network(format!("connection failed: {err}"))
        } else {
            FetchError::Network(err.to_string())
        }
    }
}
