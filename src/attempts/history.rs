//! Historical effort import.
//!
//! Pages through a rider's full main-segment effort history since the
//! configured start date and persists every qualifying effort under the
//! full-history policy, one row per (rider, season key, activity). The
//! per-race-year rollup returned to the caller is informational only; the
//! persisted rows are authoritative.

use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::config::CourseConfig;
use crate::seasons::windows::WindowResolver;
use crate::seasons::SeasonKey;
use crate::storage::{Database, DatabaseError};
use crate::upstream::types::HistoricalEffort;
use crate::upstream::{ActivitySource, AthleteToken, SourceError};

use super::HistoryRow;

/// Page size for effort history requests.
const EFFORT_PAGE_SIZE: u32 = 200;

/// Import errors.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Both the primary and fallback endpoints failed, or pagination broke
    /// down mid-run.
    #[error("data source failed: {0}")]
    Source(SourceError),

    /// Window lookup or history insert failed in storage.
    #[error("storage failure: {0}")]
    Storage(#[from] DatabaseError),
}

/// Minimum main time seen per season of one race year.
#[derive(Debug, Clone, Default)]
pub struct RaceYearRollup {
    pub best_ms: BTreeMap<SeasonKey, u32>,
}

/// Outcome of an import run.
#[derive(Debug, Clone, Default)]
pub struct ImportSummary {
    /// History rows written.
    pub imported: u32,
    /// Efforts skipped for missing dates or season coverage.
    pub skipped: u32,
    pub race_years: BTreeMap<i32, RaceYearRollup>,
}

/// Imports a rider's historical main-segment efforts.
pub struct HistoricalImporter<S> {
    source: S,
    db: Arc<Database>,
    config: CourseConfig,
}

impl<S: ActivitySource> HistoricalImporter<S> {
    /// Create a new importer.
    pub fn new(source: S, db: Arc<Database>, config: CourseConfig) -> Self {
        Self { source, db, config }
    }

    /// Import every qualifying historical effort for the rider.
    ///
    /// Efforts with no start date and efforts outside any configured season
    /// are skipped and counted, not fatal. A total data-source failure
    /// aborts with the underlying error.
    pub async fn import_all(&self, token: &AthleteToken) -> Result<ImportSummary, ImportError> {
        let resolver = WindowResolver::new(self.db.clone());
        let mut summary = ImportSummary::default();

        let mut page = 1u32;
        let mut use_fallback = false;

        loop {
            let efforts = self.fetch_page(token, page, &mut use_fallback).await?;
            let count = efforts.len() as u32;

            for effort in efforts {
                self.ingest(token.athlete_id, &resolver, effort, &mut summary)?;
            }

            // A short (or empty) page signals the end.
            if count < EFFORT_PAGE_SIZE {
                break;
            }
            page += 1;
        }

        tracing::info!(
            "imported {} efforts for athlete {} ({} skipped)",
            summary.imported,
            token.athlete_id,
            summary.skipped
        );

        Ok(summary)
    }

    /// Fetch one page, falling back to the legacy per-segment endpoint when
    /// the primary endpoint is entirely unavailable. Credential failures
    /// never fall back.
    async fn fetch_page(
        &self,
        token: &AthleteToken,
        page: u32,
        use_fallback: &mut bool,
    ) -> Result<Vec<HistoricalEffort>, ImportError> {
        let segment_id = self.config.main_segment_id;
        let since = self.config.history_start;

        if !*use_fallback {
            match self
                .source
                .athlete_effort_page(token, segment_id, since, page, EFFORT_PAGE_SIZE)
                .await
            {
                Ok(efforts) => return Ok(efforts),
                Err(e) if e.is_credential() => return Err(ImportError::Source(e)),
                // Only the very first request may switch endpoints; a
                // failure mid-pagination is a total failure.
                Err(e) if page == 1 => {
                    tracing::warn!("primary effort endpoint failed, trying fallback: {}", e);
                    *use_fallback = true;
                }
                Err(e) => return Err(ImportError::Source(e)),
            }
        }

        self.source
            .segment_effort_page(token, segment_id, since, page, EFFORT_PAGE_SIZE)
            .await
            .map_err(ImportError::Source)
    }

    /// Bucket one effort by season and race year and persist it.
    fn ingest(
        &self,
        athlete_id: i64,
        resolver: &WindowResolver,
        effort: HistoricalEffort,
        summary: &mut ImportSummary,
    ) -> Result<(), ImportError> {
        let started_at = match effort.start_date_local {
            Some(ts) => ts,
            None => {
                tracing::warn!("skipping undated effort in activity {}", effort.activity_id);
                summary.skipped += 1;
                return Ok(());
            }
        };

        let key = match resolver.season_key_for(started_at)? {
            Some(key) => key,
            None => {
                // Outside any configured season.
                summary.skipped += 1;
                return Ok(());
            }
        };

        let race_year = key.race_year();
        let main_ms = effort.elapsed_seconds * 1000;

        self.db.upsert_history_row(&HistoryRow {
            athlete_id,
            season_key: key,
            activity_id: effort.activity_id,
            race_year,
            main_ms,
            started_at,
            imported_at: Utc::now(),
        })?;

        let rollup = summary.race_years.entry(race_year).or_default();
        rollup
            .best_ms
            .entry(key)
            .and_modify(|best| *best = (*best).min(main_ms))
            .or_insert(main_ms);

        summary.imported += 1;
        Ok(())
    }
}
