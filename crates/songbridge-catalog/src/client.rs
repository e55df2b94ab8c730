// SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::{CatalogError, Result};
use crate::models::{
    NewPlaylist, Playlist, SearchResponse, SnapshotResponse, TrackQuery, UserProfile,
};
use crate::rate_limiter::RateLimiter;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, trace, warn};
use url::Url;

const CATALOG_API_BASE: &str = "https://api.spotify.com/v1";
const USER_AGENT: &str = concat!(
    "Songbridge/",
    env!("CARGO_PKG_VERSION"),
    " ( https://github.com/SvetaKrava/songbridge )"
);

/// Upper bound the catalog accepts for one add-tracks call.
pub const MAX_TRACKS_PER_REQUEST: usize = 100;

/// Characters escaped inside the `q` value. `:` stays literal so field
/// filters such as `artist:` survive.
const QUERY_VALUE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'?');

/// Catalog API client with shared rate limiting and a single 429 retry.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
    base_url: String,
    access_token: String,
    rate_limiter: RateLimiter,
    retry_margin: Duration,
}

impl CatalogClient {
    /// Create a client against the public catalog with default settings.
    pub fn new(access_token: impl Into<String>) -> Result<Self> {
        Self::builder().access_token(access_token).build()
    }

    /// Create a client builder for custom configuration.
    pub fn builder() -> CatalogClientBuilder {
        CatalogClientBuilder::default()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full request URL for a search, with the `q` value percent-encoded.
    pub fn search_url(&self, query: &TrackQuery) -> Result<String> {
        if query.is_empty() {
            return Err(CatalogError::InvalidQuery(
                "search requires a song, artist or album".to_string(),
            ));
        }

        let q = utf8_percent_encode(&query.render(), QUERY_VALUE).to_string();
        Ok(format!(
            "{}/search?q={}&type={}",
            self.base_url,
            q,
            query.kind.as_str()
        ))
    }

    /// Search the catalog.
    ///
    /// A response without items is a normal outcome, not an error.
    ///
    /// # Example
    /// ```no_run
    /// # use songbridge_catalog::{CatalogClient, TrackQuery};
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = CatalogClient::new("token")?;
    /// let query = TrackQuery::new("Hello").artist("Adele");
    /// let response = client.search(&query).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn search(&self, query: &TrackQuery) -> Result<SearchResponse> {
        let url = self.search_url(query)?;
        let response: SearchResponse = self.execute(Method::GET, &url, None).await?;
        debug!(
            target: "catalog",
            query = %query.render(),
            items = response.items().len(),
            "search complete"
        );
        Ok(response)
    }

    /// Profile of the user owning the access token.
    pub async fn current_user(&self) -> Result<UserProfile> {
        let url = format!("{}/me", self.base_url);
        self.execute(Method::GET, &url, None).await
    }

    pub async fn create_playlist(&self, user_id: &str, playlist: &NewPlaylist) -> Result<Playlist> {
        let url = format!(
            "{}/users/{}/playlists",
            self.base_url,
            utf8_percent_encode(user_id, PATH_SEGMENT)
        );
        let body = serde_json::to_value(playlist)?;
        self.execute(Method::POST, &url, Some(&body)).await
    }

    /// Append tracks to a playlist. At most [`MAX_TRACKS_PER_REQUEST`] per call.
    pub async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<SnapshotResponse> {
        if uris.len() > MAX_TRACKS_PER_REQUEST {
            return Err(CatalogError::BatchTooLarge {
                size: uris.len(),
                max: MAX_TRACKS_PER_REQUEST,
            });
        }

        let url = format!(
            "{}/playlists/{}/tracks",
            self.base_url,
            utf8_percent_encode(playlist_id, PATH_SEGMENT)
        );
        let body = serde_json::json!({ "uris": uris });
        self.execute(Method::POST, &url, Some(&body)).await
    }

    /// Send a request, sleeping out one 429 and retrying exactly once.
    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T> {
        match self.send_once(method.clone(), url, body).await {
            Err(CatalogError::Transient { retry_after }) => {
                let wait = retry_after + self.retry_margin;
                warn!(target: "catalog", url, ?wait, "rate limited, retrying once");
                self.rate_limiter.back_off(wait).await;

                match self.send_once(method, url, body).await {
                    Err(CatalogError::Transient { .. }) => Err(CatalogError::Remote {
                        status: StatusCode::TOO_MANY_REQUESTS.as_u16(),
                        message: "still rate limited after retry".to_string(),
                    }),
                    other => other,
                }
            }
            other => other,
        }
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T> {
        self.rate_limiter.acquire().await?;

        trace!(target: "catalog", "{} {}", method, url);

        let mut request = self
            .client
            .request(method, url)
            .bearer_auth(&self.access_token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;

        let status = response.status();
        debug!(target: "catalog", "response status: {}", status);

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CatalogError::Auth {
                status: status.as_u16(),
                message,
            });
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let from_header = retry_after_header(response.headers());
            let body = response.text().await.unwrap_or_default();
            let retry_after = from_header
                .or_else(|| retry_after_body(&body))
                .unwrap_or(Duration::ZERO);
            return Err(CatalogError::Transient { retry_after });
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CatalogError::Remote {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        trace!(target: "catalog", "response body: {}", body);

        serde_json::from_str(&body).map_err(|e| {
            CatalogError::InvalidResponse(format!("Failed to parse response: {}", e))
        })
    }
}

/// Seconds from the `Retry-After` header.
fn retry_after_header(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Seconds from a `Retry-After` field in a JSON error body, number or string.
fn retry_after_body(body: &str) -> Option<Duration> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let field = value.get("Retry-After")?;
    field
        .as_u64()
        .or_else(|| field.as_str().and_then(|s| s.trim().parse().ok()))
        .map(Duration::from_secs)
}

/// Builder for configuring a catalog client.
#[derive(Debug)]
pub struct CatalogClientBuilder {
    base_url: String,
    access_token: Option<String>,
    timeout: Duration,
    rate_limit_interval: Duration,
    retry_margin: Duration,
    rate_limiter: Option<RateLimiter>,
}

impl Default for CatalogClientBuilder {
    fn default() -> Self {
        Self {
            base_url: CATALOG_API_BASE.to_string(),
            access_token: None,
            timeout: Duration::from_secs(30),
            rate_limit_interval: Duration::from_millis(100),
            retry_margin: Duration::from_secs(1),
            rate_limiter: None,
        }
    }
}

impl CatalogClientBuilder {
    /// Set a custom base URL (useful for testing with mock servers).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Set request timeout duration.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set rate limit interval between requests.
    pub fn rate_limit_interval(mut self, interval: Duration) -> Self {
        self.rate_limit_interval = interval;
        self
    }

    /// Safety margin added to the server's retry-after value.
    pub fn retry_margin(mut self, margin: Duration) -> Self {
        self.retry_margin = margin;
        self
    }

    /// Share an existing limiter with other clients hitting the same endpoint.
    pub fn rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    /// Build the catalog client.
    pub fn build(self) -> Result<CatalogClient> {
        let access_token = self
            .access_token
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| CatalogError::Configuration("access token is required".to_string()))?;

        Url::parse(&self.base_url).map_err(|e| {
            CatalogError::Configuration(format!("invalid base url '{}': {}", self.base_url, e))
        })?;

        let client = Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        let rate_limiter = self
            .rate_limiter
            .unwrap_or_else(|| RateLimiter::new(self.rate_limit_interval));

        Ok(CatalogClient {
            client,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            access_token,
            rate_limiter,
            retry_margin: self.retry_margin,
        })
    }
}
