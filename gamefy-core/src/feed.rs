//! Retrieval of the external ICS feed.
//!
//! The HTTP client is supplied by the caller so connection pools and
//! timeouts are shared with the rest of the process.

use std::time::Duration;

use tracing::debug;
use url::Url;

use crate::date_range::DateRange;
use crate::error::{CoreError, CoreResult};
use crate::event::SourceEvent;
use crate::expand::expand;
use crate::ics::parse_feed;
use crate::occurrence::Occurrence;

pub const USER_AGENT: &str = concat!("gamefy/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client used for feed requests.
pub fn http_client(timeout: Duration) -> CoreResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| CoreError::Config(format!("Could not build HTTP client: {}", e)))
}

/// A subscribed calendar feed.
#[derive(Clone, Debug)]
pub struct FeedClient {
    http: reqwest::Client,
    url: Url,
}

impl FeedClient {
    /// `webcal://` and `webcals://` subscription links are fetched over HTTPS.
    pub fn new(http: reqwest::Client, url: &str) -> CoreResult<Self> {
        let url = normalize_feed_url(url)?;
        Ok(FeedClient { http, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Download the raw feed body.
    pub async fn fetch(&self) -> CoreResult<String> {
        let response = self
            .http
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| CoreError::FeedUnavailable(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::FeedUnavailable(format!(
                "feed returned HTTP {}",
                status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| CoreError::FeedUnavailable(format!("could not read body: {}", e)))?;

        debug!(url = %self.url, bytes = body.len(), "Fetched calendar feed");
        Ok(body)
    }

    /// Fetch and parse the feed.
    pub async fn events(&self) -> CoreResult<Vec<SourceEvent>> {
        let body = self.fetch().await?;
        parse_feed(&body)
    }

    /// Fetch, parse and expand the feed over `range`.
    pub async fn occurrences(&self, range: &DateRange) -> CoreResult<Vec<Occurrence>> {
        let events = self.events().await?;
        Ok(expand(&events, range))
    }
}

fn normalize_feed_url(raw: &str) -> CoreResult<Url> {
    let raw = raw.trim();
    let rewritten = if let Some(rest) = raw.strip_prefix("webcals://") {
        format!("https://{}", rest)
    } else if let Some(rest) = raw.strip_prefix("webcal://") {
        format!("https://{}", rest)
    } else {
        raw.to_string()
    };

    let url = Url::parse(&rewritten)
        .map_err(|e| CoreError::Config(format!("Invalid feed URL '{}': {}", raw, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(CoreError::Config(format!(
            "Unsupported feed URL scheme '{}'",
            other
        ))),
    }
}
