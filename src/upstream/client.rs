//! HTTP client for the upstream fitness-service API.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::retry::RetryPolicy;
use super::types::{ActivityDetail, ActivitySummary, HistoricalEffort};
use super::{ActivitySource, AthleteToken, SourceError};

/// Page size for activity range listings.
const ACTIVITY_PAGE_SIZE: u32 = 100;

/// Upstream API client with bearer-token auth and injected retry policy.
pub struct SourceClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl SourceClient {
    /// Create a client with the default retry policy.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_retry(base_url, RetryPolicy::default())
    }

    /// Create a client with a custom retry policy.
    pub fn with_retry(base_url: impl Into<String>, retry: RetryPolicy) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            base_url: base_url.into(),
            retry,
        }
    }

    /// GET a JSON document, retrying transient failures per the policy.
    async fn get_json<T: DeserializeOwned>(
        &self,
        token: &str,
        url: String,
    ) -> Result<T, SourceError> {
        self.retry
            .run(&url, || {
                let url = url.clone();
                async move {
                    let response = self
                        .http
                        .get(&url)
                        .bearer_auth(token)
                        .send()
                        .await
                        .map_err(|e| SourceError::Network(e.to_string()))?;

                    let status = response.status().as_u16();
                    if (200..300).contains(&status) {
                        response
                            .json::<T>()
                            .await
                            .map_err(|e| SourceError::Decode(e.to_string()))
                    } else {
                        Err(error_for_status(status))
                    }
                }
            })
            .await
    }
}

impl ActivitySource for SourceClient {
    async fn list_activity_ids(
        &self,
        token: &AthleteToken,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<i64>, SourceError> {
        let mut ids = Vec::new();
        let mut page = 1u32;

        loop {
            let url = format!(
                "{}/athlete/activities?after={}&before={}&page={}&per_page={}",
                self.base_url,
                start.timestamp(),
                end.timestamp(),
                page,
                ACTIVITY_PAGE_SIZE
            );
            let batch: Vec<ActivitySummary> = self.get_json(&token.access_token, url).await?;

            let count = batch.len() as u32;
            ids.extend(batch.into_iter().map(|a| a.id));

            if count < ACTIVITY_PAGE_SIZE {
                break;
            }
            page += 1;
        }

        Ok(ids)
    }

    async fn activity_detail(
        &self,
        token: &AthleteToken,
        activity_id: i64,
    ) -> Result<ActivityDetail, SourceError> {
        let url = format!(
            "{}/activities/{}?include_all_efforts=true",
            self.base_url, activity_id
        );
        self.get_json(&token.access_token, url).await
    }

    async fn athlete_effort_page(
        &self,
        token: &AthleteToken,
        segment_id: i64,
        since: DateTime<Utc>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<HistoricalEffort>, SourceError> {
        let url = format!(
            "{}/segment_efforts?segment_id={}&athlete_id={}&start_date_local={}&page={}&per_page={}",
            self.base_url,
            segment_id,
            token.athlete_id,
            format_query_time(since),
            page,
            per_page
        );
        self.get_json(&token.access_token, url).await
    }

    async fn segment_effort_page(
        &self,
        token: &AthleteToken,
        segment_id: i64,
        since: DateTime<Utc>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<HistoricalEffort>, SourceError> {
        let url = format!(
            "{}/segments/{}/all_efforts?athlete_id={}&start_date_local={}&page={}&per_page={}",
            self.base_url,
            segment_id,
            token.athlete_id,
            format_query_time(since),
            page,
            per_page
        );
        self.get_json(&token.access_token, url).await
    }
}

/// Render a timestamp for a query string without characters that need
/// percent-encoding.
fn format_query_time(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Map a non-success HTTP status to a source error.
fn error_for_status(status: u16) -> SourceError {
    match status {
        401 => SourceError::TokenExpired,
        403 => SourceError::Unauthorized,
        404 => SourceError::NotFound,
        s => SourceError::Api(s),
    }
}
