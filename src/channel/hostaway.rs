//! HostAway channel-manager integration.
//!
//! The executor's single write path to the outside world. HostAway
//! wraps every payload in a `{ status, result }` envelope, enforces a
//! per-key rate limit surfaced through `X-RateLimit-*` headers, and
//! answers 429 with a `Retry-After` hint.
//!
//! Base URL: https://api.hostaway.com/v1
//! Auth: `Authorization: Bearer {key}` on every call.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{CalendarUpdate, ChannelCalendarDay, ChannelManager};
use crate::types::DateRange;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const BASE_URL: &str = "https://api.hostaway.com/v1";
const CHANNEL_NAME: &str = "hostaway";

/// Bounded 429 retries; beyond this the error surfaces to the caller.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Wait applied when a 429 arrives without a `Retry-After` header.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// API response types (HostAway JSON → Rust)
// ---------------------------------------------------------------------------

/// HostAway wraps payloads as `{ "status": "success", "result": … }`.
/// Some endpoints return the payload bare, so parsing falls back to
/// the raw body when no envelope is present.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HostawayCalendarDay {
    date: chrono::NaiveDate,
    #[serde(default)]
    price: f64,
    #[serde(default)]
    status: Option<String>,
}

/// Rate-limit state reported by the most recent response.
#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    pub remaining: u32,
    pub limit: u32,
    /// Unix timestamp at which the window resets.
    pub reset: i64,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HostAway channel client.
pub struct HostawayClient {
    http: Client,
    api_key: String,
    base_url: String,
    rate_limit: Mutex<Option<RateLimit>>,
}

impl HostawayClient {
    pub fn new(api_key: String) -> Result<Self> {
        Self::with_base_url(api_key, BASE_URL.to_string())
    }

    /// Client against a non-default base URL (staging, test server).
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("HELM/0.1.0 (revenue-agent)")
            .build()
            .context("Failed to build HTTP client for HostAway")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            rate_limit: Mutex::new(None),
        })
    }

    /// Rate-limit state from the most recent response, if reported.
    pub fn rate_limit(&self) -> Option<RateLimit> {
        *self.rate_limit.lock().unwrap()
    }

    // -- Internal helpers ------------------------------------------------

    fn record_rate_limit(&self, headers: &HeaderMap) {
        let parse = |name: &str| -> Option<i64> {
            headers.get(name)?.to_str().ok()?.trim().parse().ok()
        };

        if let (Some(remaining), Some(limit), Some(reset)) = (
            parse("X-RateLimit-Remaining"),
            parse("X-RateLimit-Limit"),
            parse("X-RateLimit-Reset"),
        ) {
            *self.rate_limit.lock().unwrap() = Some(RateLimit {
                remaining: remaining.max(0) as u32,
                limit: limit.max(0) as u32,
                reset,
            });
        }
    }

    fn retry_after(headers: &HeaderMap) -> Option<Duration> {
        let secs: u64 = headers.get("Retry-After")?.to_str().ok()?.trim().parse().ok()?;
        Some(Duration::from_secs(secs))
    }

    /// Send a request, tracking rate-limit headers and retrying a
    /// bounded number of times on 429.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let mut request = request;
        let mut attempts = 0;

        loop {
            let retry_copy = request.try_clone();
            let resp = request.send().await.context("HostAway request failed")?;
            self.record_rate_limit(resp.headers());

            if resp.status() == StatusCode::TOO_MANY_REQUESTS && attempts < MAX_RATE_LIMIT_RETRIES {
                if let Some(next) = retry_copy {
                    let wait = Self::retry_after(resp.headers()).unwrap_or(DEFAULT_RETRY_AFTER);
                    attempts += 1;
                    warn!(
                        attempt = attempts,
                        wait_secs = wait.as_secs(),
                        "HostAway rate limited, retrying"
                    );
                    tokio::time::sleep(wait).await;
                    request = next;
                    continue;
                }
            }

            return Ok(resp);
        }
    }

    /// Parse a response body, unwrapping the `{ result: … }` envelope
    /// when present and falling back to the bare payload otherwise.
    fn parse_result<T: serde::de::DeserializeOwned>(body: &str) -> Result<T> {
        if let Ok(Envelope { result: Some(inner) }) = serde_json::from_str::<Envelope<T>>(body) {
            return Ok(inner);
        }
        serde_json::from_str::<T>(body).context("Failed to parse HostAway response body")
    }
}

// ---------------------------------------------------------------------------
// ChannelManager trait implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl ChannelManager for HostawayClient {
    /// Push price updates via the calendar-intervals endpoint.
    async fn update_calendar(&self, external_id: i64, updates: Vec<CalendarUpdate>) -> Result<()> {
        let url = format!("{}/listings/{external_id}/calendar/intervals", self.base_url);
        let body = serde_json::json!({ "intervals": &updates });

        debug!(external_id, count = updates.len(), "Pushing calendar update to HostAway");

        let resp = self
            .send(
                self.http
                    .put(&url)
                    .bearer_auth(&self.api_key)
                    .json(&body),
            )
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("HostAway calendar update failed {status}: {body}");
        }

        info!(external_id, count = updates.len(), "HostAway calendar updated");
        Ok(())
    }

    /// Read back a listing's calendar for verification.
    async fn get_calendar(
        &self,
        external_id: i64,
        range: DateRange,
    ) -> Result<Vec<ChannelCalendarDay>> {
        let url = format!("{}/listings/{external_id}/calendar", self.base_url);

        let resp = self
            .send(
                self.http
                    .get(&url)
                    .bearer_auth(&self.api_key)
                    .query(&[
                        ("listingMapId", external_id.to_string()),
                        ("dateFrom", range.start.to_string()),
                        ("dateTo", range.end.to_string()),
                    ]),
            )
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("HostAway calendar fetch failed {status}: {body}");
        }

        let body = resp.text().await.context("Failed to read HostAway response")?;
        let days: Vec<HostawayCalendarDay> = Self::parse_result(&body)?;

        Ok(days
            .into_iter()
            .map(|d| ChannelCalendarDay { date: d.date, price: d.price })
            .collect())
    }

    fn name(&self) -> &str {
        CHANNEL_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
