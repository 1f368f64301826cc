//! Best-attempt resolution.
//!
//! Enumerates a rider's candidate activities across all eligible windows of
//! a season, summarizes each, picks the single fastest qualifying one, and
//! persists it as the rider's current-best attempt.

use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

use crate::config::CourseConfig;
use crate::seasons::windows::WindowResolver;
use crate::seasons::SeasonKey;
use crate::storage::{Database, DatabaseError};
use crate::upstream::types::ActivityDetail;
use crate::upstream::{ActivitySource, AthleteToken, SourceError};

use super::summary::{summarize, AttemptSummary};
use super::{Attempt, SeasonEffort};

/// Resolution errors.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The season has no configured base window; not a fault.
    #[error("no season window configured for {0}")]
    NoSeasonWindow(SeasonKey),

    /// No candidate activity contained a main-loop effort; not a fault.
    #[error("no qualifying effort for {0}")]
    NoQualifyingEffort(SeasonKey),

    /// The rider's credential was rejected; requires re-authentication.
    #[error("credential rejected: {0}")]
    Credential(SourceError),

    /// Forced-activity resolution was requested but is not enabled.
    #[error("forced activity resolution is disabled")]
    ForcedDisabled,

    /// Window lookup failed in storage.
    #[error("window lookup failed: {0}")]
    WindowLookup(DatabaseError),

    /// The attempt could not be persisted.
    #[error("attempt insert failed: {0}")]
    InsertFailed(DatabaseError),
}

/// Resolves a rider's best qualifying attempt for a season.
pub struct BestAttemptSelector<S> {
    source: S,
    db: Arc<Database>,
    config: CourseConfig,
}

impl<S: ActivitySource> BestAttemptSelector<S> {
    /// Create a new selector.
    pub fn new(source: S, db: Arc<Database>, config: CourseConfig) -> Self {
        Self { source, db, config }
    }

    /// Resolve and persist the rider's best attempt for `key`.
    ///
    /// A listing failure for one window and a detail-fetch failure for one
    /// candidate both degrade (the window or candidate simply contributes
    /// nothing); credential and storage failures abort.
    pub async fn resolve(
        &self,
        token: &AthleteToken,
        key: SeasonKey,
    ) -> Result<Attempt, ResolveError> {
        let resolver = WindowResolver::new(self.db.clone());
        let windows = resolver
            .effective_windows(key)
            .map_err(ResolveError::WindowLookup)?;

        if windows.is_empty() {
            return Err(ResolveError::NoSeasonWindow(key));
        }

        // Candidate ids across all windows, deduplicated in first-seen
        // order. An activity inside two overlapping windows is evaluated
        // once.
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for window in &windows {
            let ids = match self
                .source
                .list_activity_ids(token, window.start_at, window.end_at)
                .await
            {
                Ok(ids) => ids,
                Err(e) if e.is_credential() => return Err(ResolveError::Credential(e)),
                Err(e) => {
                    tracing::warn!(
                        "activity listing failed for {} window starting {}: {}",
                        key,
                        window.start_at,
                        e
                    );
                    continue;
                }
            };
            for id in ids {
                if seen.insert(id) {
                    candidates.push(id);
                }
            }
        }

        let mut best: Option<AttemptSummary> = None;
        for activity_id in candidates {
            let detail = match self.source.activity_detail(token, activity_id).await {
                Ok(detail) => detail,
                Err(e) if e.is_credential() => return Err(ResolveError::Credential(e)),
                Err(e) => {
                    tracing::warn!("detail fetch failed for activity {}: {}", activity_id, e);
                    continue;
                }
            };

            self.record_bonus_efforts(token.athlete_id, key, &detail)?;

            let summary = match summarize(&detail, &self.config) {
                Some(summary) => summary,
                None => {
                    tracing::debug!("activity {} has no main-loop effort", activity_id);
                    continue;
                }
            };

            // Strictly-smaller keeps the first-encountered candidate on an
            // exact tie.
            let replace = match &best {
                Some(current) => summary.main_ms < current.main_ms,
                None => true,
            };
            if replace {
                best = Some(summary);
            }
        }

        let winner = best.ok_or(ResolveError::NoQualifyingEffort(key))?;
        self.persist(token.athlete_id, key, winner)
    }

    /// Summarize and persist one explicitly named activity, bypassing
    /// candidate enumeration. Supports testing and manual correction; only
    /// available when enabled in the course config.
    pub async fn resolve_forced(
        &self,
        token: &AthleteToken,
        key: SeasonKey,
        activity_id: i64,
    ) -> Result<Attempt, ResolveError> {
        if !self.config.allow_forced_activity {
            return Err(ResolveError::ForcedDisabled);
        }

        let detail = match self.source.activity_detail(token, activity_id).await {
            Ok(detail) => detail,
            Err(e) if e.is_credential() => return Err(ResolveError::Credential(e)),
            Err(e) => {
                tracing::warn!("forced detail fetch failed for {}: {}", activity_id, e);
                return Err(ResolveError::NoQualifyingEffort(key));
            }
        };

        self.record_bonus_efforts(token.athlete_id, key, &detail)?;

        let summary =
            summarize(&detail, &self.config).ok_or(ResolveError::NoQualifyingEffort(key))?;
        self.persist(token.athlete_id, key, summary)
    }

    /// Record every bonus-group effort observed in a candidate activity,
    /// whether or not the activity qualifies. The climbing/descending views
    /// sum these across activities.
    fn record_bonus_efforts(
        &self,
        athlete_id: i64,
        key: SeasonKey,
        detail: &ActivityDetail,
    ) -> Result<(), ResolveError> {
        for segment_id in self.config.bonus_segment_ids() {
            if let Some(elapsed_ms) = detail.effort_ms(segment_id) {
                self.db
                    .record_season_effort(&SeasonEffort {
                        athlete_id,
                        season_key: key,
                        segment_id,
                        activity_id: detail.id,
                        elapsed_ms,
                    })
                    .map_err(ResolveError::InsertFailed)?;
            }
        }
        Ok(())
    }

    fn persist(
        &self,
        athlete_id: i64,
        key: SeasonKey,
        summary: AttemptSummary,
    ) -> Result<Attempt, ResolveError> {
        let attempt = Attempt {
            athlete_id,
            season_key: key,
            activity_id: summary.activity_id,
            main_ms: summary.main_ms,
            climb_sum_ms: summary.climb_sum_ms,
            desc_sum_ms: summary.desc_sum_ms,
            resolved_at: Utc::now(),
        };

        // Unconditional overwrite: this resolution run wins over whatever
        // was stored before.
        self.db
            .upsert_current_best(&attempt)
            .map_err(ResolveError::InsertFailed)?;

        tracing::info!(
            "resolved {} for athlete {}: activity {} at {}ms",
            key,
            athlete_id,
            attempt.activity_id,
            attempt.main_ms
        );

        Ok(attempt)
    }
}
