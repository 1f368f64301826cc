//! Database schema definitions for LoopTrial.

/// SQL for the schema version table, created before migrations run.
pub const SCHEMA_VERSION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);
"#;

/// Current schema version.
pub const CURRENT_VERSION: i32 = 1;

/// SQL schema for creating all database tables.
pub const SCHEMA: &str = r#"
-- Riders table. Rows are created by the OAuth collaborator on first
-- handshake; the engine reads identity and consent, never mutates them.
CREATE TABLE IF NOT EXISTS riders (
    athlete_id INTEGER PRIMARY KEY,
    display_name TEXT NOT NULL,
    public_consent INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

-- Base eligibility window, at most one per season key. Admin-managed.
CREATE TABLE IF NOT EXISTS season_windows (
    id TEXT PRIMARY KEY,
    season_key TEXT NOT NULL UNIQUE,
    start_at TEXT NOT NULL,
    end_at TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- Additional eligibility intervals (makeup days etc). Admin-managed,
-- zero or more per season key, may overlap the base window arbitrarily.
CREATE TABLE IF NOT EXISTS season_overrides (
    id TEXT PRIMARY KEY,
    season_key TEXT NOT NULL,
    start_at TEXT NOT NULL,
    end_at TEXT NOT NULL,
    reason TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_season_overrides_key ON season_overrides(season_key);

-- Current-best attempt, exactly one row per (rider, season key).
-- Overwritten unconditionally by each resolution run.
CREATE TABLE IF NOT EXISTS season_attempts (
    athlete_id INTEGER NOT NULL REFERENCES riders(athlete_id),
    season_key TEXT NOT NULL,
    activity_id INTEGER NOT NULL,
    main_ms INTEGER NOT NULL,
    climb_sum_ms INTEGER,
    desc_sum_ms INTEGER,
    resolved_at TEXT NOT NULL,
    PRIMARY KEY (athlete_id, season_key)
);

-- Full history, one row per (rider, season key, activity). Idempotent
-- upsert on the composite key so re-imports do not duplicate rows.
CREATE TABLE IF NOT EXISTS attempt_history (
    athlete_id INTEGER NOT NULL REFERENCES riders(athlete_id),
    season_key TEXT NOT NULL,
    activity_id INTEGER NOT NULL,
    race_year INTEGER NOT NULL,
    main_ms INTEGER NOT NULL,
    started_at TEXT NOT NULL,
    imported_at TEXT NOT NULL,
    PRIMARY KEY (athlete_id, season_key, activity_id)
);

CREATE INDEX IF NOT EXISTS idx_attempt_history_race_year
    ON attempt_history(athlete_id, race_year);

-- Fastest observed bonus-segment time per (rider, season key, segment).
-- Feeds the climbing/descending views, which may sum across activities.
CREATE TABLE IF NOT EXISTS season_efforts (
    athlete_id INTEGER NOT NULL REFERENCES riders(athlete_id),
    season_key TEXT NOT NULL,
    segment_id INTEGER NOT NULL,
    activity_id INTEGER NOT NULL,
    elapsed_ms INTEGER NOT NULL,
    recorded_at TEXT NOT NULL,
    PRIMARY KEY (athlete_id, season_key, segment_id)
);
"#;
