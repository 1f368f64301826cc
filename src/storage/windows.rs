//! Season window and override queries.
//!
//! Window rows are admin-managed; the insert methods exist for tooling and
//! tests, the engine itself only reads them.

use rusqlite::params;
use uuid::Uuid;

use crate::seasons::windows::{SeasonOverride, SeasonWindow};
use crate::seasons::SeasonKey;
use crate::storage::database::{parse_timestamp, Database, DatabaseError};
use chrono::{DateTime, Utc};

impl Database {
    /// Insert a base season window.
    pub fn insert_season_window(&self, window: &SeasonWindow) -> Result<(), DatabaseError> {
        self.connection()
            .execute(
                "INSERT INTO season_windows (id, season_key, start_at, end_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    window.id.to_string(),
                    window.season_key.to_string(),
                    window.start_at.to_rfc3339(),
                    window.end_at.to_rfc3339(),
                    window.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    /// Insert a season override interval.
    pub fn insert_season_override(&self, ov: &SeasonOverride) -> Result<(), DatabaseError> {
        self.connection()
            .execute(
                "INSERT INTO season_overrides (id, season_key, start_at, end_at, reason, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    ov.id.to_string(),
                    ov.season_key.to_string(),
                    ov.start_at.to_rfc3339(),
                    ov.end_at.to_rfc3339(),
                    ov.reason,
                    ov.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    /// Get the base window for a season key, if one is configured.
    pub fn get_season_window(
        &self,
        key: SeasonKey,
    ) -> Result<Option<SeasonWindow>, DatabaseError> {
        let result = self.connection().query_row(
            "SELECT id, season_key, start_at, end_at, created_at
             FROM season_windows WHERE season_key = ?1",
            params![key.to_string()],
            |row| {
                Ok(WindowRow {
                    id: row.get(0)?,
                    season_key: row.get(1)?,
                    start_at: row.get(2)?,
                    end_at: row.get(3)?,
                    reason: None,
                    created_at: row.get(4)?,
                })
            },
        );

        match result {
            Ok(row) => Ok(Some(row.into_window()?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DatabaseError::QueryFailed(e.to_string())),
        }
    }

    /// Get all overrides for a season key, oldest first.
    pub fn list_season_overrides(
        &self,
        key: SeasonKey,
    ) -> Result<Vec<SeasonOverride>, DatabaseError> {
        let mut stmt = self
            .connection()
            .prepare(
                "SELECT id, season_key, start_at, end_at, reason, created_at
                 FROM season_overrides WHERE season_key = ?1 ORDER BY rowid",
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let rows = stmt
            .query_map(params![key.to_string()], |row| {
                Ok(WindowRow {
                    id: row.get(0)?,
                    season_key: row.get(1)?,
                    start_at: row.get(2)?,
                    end_at: row.get(3)?,
                    reason: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let mut overrides = Vec::new();
        for row in rows {
            let row = row.map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
            overrides.push(row.into_override()?);
        }

        Ok(overrides)
    }

    /// The season key whose base window contains `ts`, inclusive on both
    /// ends. Earliest start wins when base windows overlap.
    pub fn base_window_containing(
        &self,
        ts: DateTime<Utc>,
    ) -> Result<Option<SeasonKey>, DatabaseError> {
        let ts = ts.to_rfc3339();
        let result = self.connection().query_row(
            "SELECT season_key FROM season_windows
             WHERE start_at <= ?1 AND end_at >= ?1
             ORDER BY start_at, season_key LIMIT 1",
            params![ts],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(key) => Ok(Some(parse_season_key(&key)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DatabaseError::QueryFailed(e.to_string())),
        }
    }
}

/// Intermediate struct for reading window and override rows.
struct WindowRow {
    id: String,
    season_key: String,
    start_at: String,
    end_at: String,
    reason: Option<String>,
    created_at: String,
}

impl WindowRow {
    fn into_window(self) -> Result<SeasonWindow, DatabaseError> {
        Ok(SeasonWindow {
            id: parse_uuid(&self.id)?,
            season_key: parse_season_key(&self.season_key)?,
            start_at: parse_timestamp(&self.start_at)?,
            end_at: parse_timestamp(&self.end_at)?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }

    fn into_override(self) -> Result<SeasonOverride, DatabaseError> {
        Ok(SeasonOverride {
            id: parse_uuid(&self.id)?,
            season_key: parse_season_key(&self.season_key)?,
            start_at: parse_timestamp(&self.start_at)?,
            end_at: parse_timestamp(&self.end_at)?,
            reason: self.reason,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

fn parse_uuid(s: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s)
        .map_err(|e| DatabaseError::DeserializationError(format!("Invalid UUID: {}", e)))
}

pub(crate) fn parse_season_key(s: &str) -> Result<SeasonKey, DatabaseError> {
    s.parse()
        .map_err(|_| DatabaseError::DeserializationError(format!("Invalid season key: {}", s)))
}
