//! Attempt store queries.
//!
//! Two persistence policies coexist: `season_attempts` keeps exactly one
//! current-best row per (rider, season key) and is overwritten
//! unconditionally on every resolution; `attempt_history` keeps one row per
//! (rider, season key, activity) under an idempotent composite-key upsert.
//! `season_efforts` additionally keeps the fastest observed bonus-segment
//! time per (rider, season key, segment) for the aggregation views.

use chrono::Utc;
use rusqlite::params;

use crate::attempts::{Attempt, HistoryRow, SeasonEffort};
use crate::seasons::SeasonKey;
use crate::storage::database::{parse_timestamp, Database, DatabaseError};
use crate::storage::windows::parse_season_key;

impl Database {
    // ========== Current-best policy ==========

    /// Store an attempt as the rider's current best for its season,
    /// replacing any prior row for that (rider, season key) pair.
    ///
    /// The overwrite is unconditional: the latest resolution run always
    /// wins, even when the new time is slower than the stored one.
    pub fn upsert_current_best(&self, attempt: &Attempt) -> Result<(), DatabaseError> {
        self.connection()
            .execute(
                "INSERT OR REPLACE INTO season_attempts
                 (athlete_id, season_key, activity_id, main_ms, climb_sum_ms, desc_sum_ms, resolved_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    attempt.athlete_id,
                    attempt.season_key.to_string(),
                    attempt.activity_id,
                    attempt.main_ms,
                    attempt.climb_sum_ms,
                    attempt.desc_sum_ms,
                    attempt.resolved_at.to_rfc3339(),
                ],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    /// Get all current-best attempts for the given season keys.
    pub fn list_current_best(&self, keys: &[SeasonKey]) -> Result<Vec<Attempt>, DatabaseError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT athlete_id, season_key, activity_id, main_ms, climb_sum_ms, desc_sum_ms, resolved_at
             FROM season_attempts WHERE season_key IN ({})
             ORDER BY athlete_id, season_key",
            placeholders(keys.len())
        );

        let mut stmt = self
            .connection()
            .prepare(&sql)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let rows = stmt
            .query_map(
                rusqlite::params_from_iter(keys.iter().map(|k| k.to_string())),
                |row| {
                    Ok(AttemptRow {
                        athlete_id: row.get(0)?,
                        season_key: row.get(1)?,
                        activity_id: row.get(2)?,
                        main_ms: row.get(3)?,
                        climb_sum_ms: row.get(4)?,
                        desc_sum_ms: row.get(5)?,
                        resolved_at: row.get(6)?,
                    })
                },
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let mut attempts = Vec::new();
        for row in rows {
            let row = row.map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
            attempts.push(row.into_attempt()?);
        }

        Ok(attempts)
    }

    // ========== Full-history policy ==========

    /// Store a historical effort row, idempotent on
    /// (rider, season key, activity).
    pub fn upsert_history_row(&self, row: &HistoryRow) -> Result<(), DatabaseError> {
        self.connection()
            .execute(
                "INSERT INTO attempt_history
                 (athlete_id, season_key, activity_id, race_year, main_ms, started_at, imported_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(athlete_id, season_key, activity_id) DO UPDATE SET
                 race_year = excluded.race_year,
                 main_ms = excluded.main_ms,
                 started_at = excluded.started_at,
                 imported_at = excluded.imported_at",
                params![
                    row.athlete_id,
                    row.season_key.to_string(),
                    row.activity_id,
                    row.race_year,
                    row.main_ms,
                    row.started_at.to_rfc3339(),
                    row.imported_at.to_rfc3339(),
                ],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    /// Get a rider's history rows, newest effort first, optionally limited
    /// to one race year.
    pub fn list_history(
        &self,
        athlete_id: i64,
        race_year: Option<i32>,
    ) -> Result<Vec<HistoryRow>, DatabaseError> {
        let sql = match race_year {
            Some(_) => {
                "SELECT athlete_id, season_key, activity_id, race_year, main_ms, started_at, imported_at
                 FROM attempt_history WHERE athlete_id = ?1 AND race_year = ?2
                 ORDER BY started_at DESC"
            }
            None => {
                "SELECT athlete_id, season_key, activity_id, race_year, main_ms, started_at, imported_at
                 FROM attempt_history WHERE athlete_id = ?1
                 ORDER BY started_at DESC"
            }
        };

        let mut stmt = self
            .connection()
            .prepare(sql)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let map_row = |row: &rusqlite::Row| -> rusqlite::Result<HistoryRowRaw> {
            Ok(HistoryRowRaw {
                athlete_id: row.get(0)?,
                season_key: row.get(1)?,
                activity_id: row.get(2)?,
                race_year: row.get(3)?,
                main_ms: row.get(4)?,
                started_at: row.get(5)?,
                imported_at: row.get(6)?,
            })
        };

        let mut history = Vec::new();

        if let Some(year) = race_year {
            let rows = stmt
                .query_map(params![athlete_id, year], map_row)
                .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
            for row in rows {
                let row = row.map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
                history.push(row.into_history_row()?);
            }
        } else {
            let rows = stmt
                .query_map(params![athlete_id], map_row)
                .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
            for row in rows {
                let row = row.map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
                history.push(row.into_history_row()?);
            }
        }

        Ok(history)
    }

    /// Count a rider's history rows.
    pub fn count_history_rows(&self, athlete_id: i64) -> Result<usize, DatabaseError> {
        let count: i64 = self
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM attempt_history WHERE athlete_id = ?1",
                params![athlete_id],
                |row| row.get(0),
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(count as usize)
    }

    // ========== Season bonus efforts ==========

    /// Record a bonus-segment effort, keeping the fastest time seen per
    /// (rider, season key, segment).
    pub fn record_season_effort(&self, effort: &SeasonEffort) -> Result<(), DatabaseError> {
        self.connection()
            .execute(
                "INSERT INTO season_efforts
                 (athlete_id, season_key, segment_id, activity_id, elapsed_ms, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(athlete_id, season_key, segment_id) DO UPDATE SET
                 activity_id = excluded.activity_id,
                 elapsed_ms = excluded.elapsed_ms,
                 recorded_at = excluded.recorded_at
                 WHERE excluded.elapsed_ms < season_efforts.elapsed_ms",
                params![
                    effort.athlete_id,
                    effort.season_key.to_string(),
                    effort.segment_id,
                    effort.activity_id,
                    effort.elapsed_ms,
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    /// Get all bonus-segment efforts for the given season keys.
    pub fn list_season_efforts(
        &self,
        keys: &[SeasonKey],
    ) -> Result<Vec<SeasonEffort>, DatabaseError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT athlete_id, season_key, segment_id, activity_id, elapsed_ms
             FROM season_efforts WHERE season_key IN ({})
             ORDER BY athlete_id, season_key, segment_id",
            placeholders(keys.len())
        );

        let mut stmt = self
            .connection()
            .prepare(&sql)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let rows = stmt
            .query_map(
                rusqlite::params_from_iter(keys.iter().map(|k| k.to_string())),
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, u32>(4)?,
                    ))
                },
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let mut efforts = Vec::new();
        for row in rows {
            let (athlete_id, season_key, segment_id, activity_id, elapsed_ms) =
                row.map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
            efforts.push(SeasonEffort {
                athlete_id,
                season_key: parse_season_key(&season_key)?,
                segment_id,
                activity_id,
                elapsed_ms,
            });
        }

        Ok(efforts)
    }
}

/// `?1, ?2, ...` list for an IN clause.
fn placeholders(n: usize) -> String {
    (1..=n)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Intermediate struct for reading attempt rows.
struct AttemptRow {
    athlete_id: i64,
    season_key: String,
    activity_id: i64,
    main_ms: u32,
    climb_sum_ms: Option<u32>,
    desc_sum_ms: Option<u32>,
    resolved_at: String,
}

impl AttemptRow {
    fn into_attempt(self) -> Result<Attempt, DatabaseError> {
        Ok(Attempt {
            athlete_id: self.athlete_id,
            season_key: parse_season_key(&self.season_key)?,
            activity_id: self.activity_id,
            main_ms: self.main_ms,
            climb_sum_ms: self.climb_sum_ms,
            desc_sum_ms: self.desc_sum_ms,
            resolved_at: parse_timestamp(&self.resolved_at)?,
        })
    }
}

/// Intermediate struct for reading history rows.
struct HistoryRowRaw {
    athlete_id: i64,
    season_key: String,
    activity_id: i64,
    race_year: i32,
    main_ms: u32,
    started_at: String,
    imported_at: String,
}

impl HistoryRowRaw {
    fn into_history_row(self) -> Result<HistoryRow, DatabaseError> {
        Ok(HistoryRow {
            athlete_id: self.athlete_id,
            season_key: parse_season_key(&self.season_key)?,
            activity_id: self.activity_id,
            race_year: self.race_year,
            main_ms: self.main_ms,
            started_at: parse_timestamp(&self.started_at)?,
            imported_at: parse_timestamp(&self.imported_at)?,
        })
    }
}
