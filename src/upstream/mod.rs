//! Upstream fitness-service integration.
//!
//! The engine consumes the service through the [`ActivitySource`] trait so
//! resolution and import logic can be exercised against a scripted source in
//! tests. All calls carry a per-rider bearer credential issued by the
//! external OAuth collaborator; an expired token is fatal for the current
//! operation and is never retried here.

pub mod client;
pub mod retry;
pub mod types;

use chrono::{DateTime, Utc};
use std::future::Future;
use thiserror::Error;

// Re-export main types
pub use client::SourceClient;
pub use retry::RetryPolicy;
pub use types::{ActivityDetail, HistoricalEffort, SegmentEffort};

/// Per-rider credential for upstream calls.
#[derive(Debug, Clone)]
pub struct AthleteToken {
    /// Upstream athlete id.
    pub athlete_id: i64,
    /// Bearer access token.
    pub access_token: String,
}

impl AthleteToken {
    pub fn new(athlete_id: i64, access_token: impl Into<String>) -> Self {
        Self {
            athlete_id,
            access_token: access_token.into(),
        }
    }
}

/// Read access to the upstream fitness service.
pub trait ActivitySource: Send + Sync {
    /// Ids of the rider's activities whose start time falls in
    /// [`start`, `end`].
    fn list_activity_ids(
        &self,
        token: &AthleteToken,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<i64>, SourceError>> + Send;

    /// Full activity detail with all segment efforts included.
    fn activity_detail(
        &self,
        token: &AthleteToken,
        activity_id: i64,
    ) -> impl Future<Output = Result<ActivityDetail, SourceError>> + Send;

    /// One page of the rider's historical efforts on a segment since
    /// `since`, via the primary per-athlete endpoint. Pages are 1-based; a
    /// page shorter than `per_page` is the last one.
    fn athlete_effort_page(
        &self,
        token: &AthleteToken,
        segment_id: i64,
        since: DateTime<Utc>,
        page: u32,
        per_page: u32,
    ) -> impl Future<Output = Result<Vec<HistoricalEffort>, SourceError>> + Send;

    /// One page of historical efforts via the legacy per-segment endpoint,
    /// filtered to the rider. Fallback when the primary endpoint is
    /// unavailable.
    fn segment_effort_page(
        &self,
        token: &AthleteToken,
        segment_id: i64,
        since: DateTime<Utc>,
        page: u32,
        per_page: u32,
    ) -> impl Future<Output = Result<Vec<HistoricalEffort>, SourceError>> + Send;
}

/// Upstream data-source errors.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("token expired")]
    TokenExpired,

    #[error("unauthorized")]
    Unauthorized,

    #[error("endpoint not found")]
    NotFound,

    #[error("network error: {0}")]
    Network(String),

    #[error("data source returned status {0}")]
    Api(u16),

    #[error("malformed response: {0}")]
    Decode(String),
}

impl SourceError {
    /// Transient errors worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            SourceError::Network(_) => true,
            SourceError::Api(status) => *status >= 500,
            _ => false,
        }
    }

    /// Credential failures; fatal for the current operation, requiring
    /// external re-authentication.
    pub fn is_credential(&self) -> bool {
        matches!(self, SourceError::TokenExpired | SourceError::Unauthorized)
    }
}
