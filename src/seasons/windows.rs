//! Season eligibility windows.
//!
//! A season opens through one admin-configured base window plus any number
//! of override intervals (makeup days after trail closures and the like).
//! The effective eligibility for a season key is the union of all of them;
//! the intervals may overlap and need not be chronologically ordered.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use super::SeasonKey;
use crate::storage::{Database, DatabaseError};

/// Base eligibility interval for a season key. At most one per key.
#[derive(Debug, Clone)]
pub struct SeasonWindow {
    pub id: Uuid,
    pub season_key: SeasonKey,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl SeasonWindow {
    pub fn new(season_key: SeasonKey, start_at: DateTime<Utc>, end_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            season_key,
            start_at,
            end_at,
            created_at: Utc::now(),
        }
    }
}

/// Additional eligibility interval for a season key.
#[derive(Debug, Clone)]
pub struct SeasonOverride {
    pub id: Uuid,
    pub season_key: SeasonKey,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    /// Free-text reason, e.g. "trail closure makeup day".
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SeasonOverride {
    pub fn new(
        season_key: SeasonKey,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
        reason: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            season_key,
            start_at,
            end_at,
            reason,
            created_at: Utc::now(),
        }
    }
}

/// Where an effective window came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowSource {
    Base,
    Override,
}

/// One interval during which efforts count for a season.
#[derive(Debug, Clone)]
pub struct EffectiveWindow {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub source: WindowSource,
    /// Override reason, if any.
    pub reason: Option<String>,
}

/// Resolves season keys to eligibility intervals and timestamps to season
/// keys.
pub struct WindowResolver {
    db: Arc<Database>,
}

impl WindowResolver {
    /// Create a new window resolver.
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// All intervals during which efforts count for `key`: the base window
    /// first, then overrides in insertion order.
    ///
    /// Returns an empty vec when no base window is configured; callers must
    /// treat that as "season not open", not as an error. Overrides without a
    /// base window do not open a season.
    pub fn effective_windows(
        &self,
        key: SeasonKey,
    ) -> Result<Vec<EffectiveWindow>, DatabaseError> {
        let base = match self.db.get_season_window(key)? {
            Some(window) => window,
            None => return Ok(Vec::new()),
        };

        let mut windows = vec![EffectiveWindow {
            start_at: base.start_at,
            end_at: base.end_at,
            source: WindowSource::Base,
            reason: None,
        }];

        for ov in self.db.list_season_overrides(key)? {
            windows.push(EffectiveWindow {
                start_at: ov.start_at,
                end_at: ov.end_at,
                source: WindowSource::Override,
                reason: ov.reason,
            });
        }

        Ok(windows)
    }

    /// The season key whose base window contains `ts`, inclusive on both
    /// ends. Overrides are never consulted; this classifies a bare
    /// timestamp, it does not decide admission.
    ///
    /// Base windows are assumed mutually disjoint. If an admin
    /// misconfiguration makes two base windows overlap, the earliest start
    /// wins; the choice is deterministic but no particular winner is
    /// promised.
    pub fn season_key_for(&self, ts: DateTime<Utc>) -> Result<Option<SeasonKey>, DatabaseError> {
        self.db.base_window_containing(ts)
    }
}
