//! Database operations using rusqlite.
//!
//! One connection per `Database`; schema is created and migrated on open.
//! Domain-specific queries live in the sibling store modules
//! (`storage::windows`, `storage::attempts`).

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Result as SqliteResult};
use std::path::PathBuf;
use thiserror::Error;

use crate::storage::schema::{CURRENT_VERSION, SCHEMA, SCHEMA_VERSION_TABLE};

/// Rider identity as created by the OAuth collaborator.
#[derive(Debug, Clone)]
pub struct Rider {
    /// Upstream athlete id.
    pub athlete_id: i64,
    pub display_name: String,
    /// Whether the rider consented to public leaderboard display.
    pub public_consent: bool,
    pub created_at: DateTime<Utc>,
}

/// Database wrapper for SQLite operations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create a database at the given path.
    pub fn open(path: &PathBuf) -> Result<Self, DatabaseError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DatabaseError::IoError(e.to_string()))?;
        }

        let conn =
            Connection::open(path).map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        let db = Self { conn };
        db.initialize()?;

        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        let db = Self { conn };
        db.initialize()?;

        Ok(db)
    }

    /// Initialize the database schema.
    fn initialize(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(SCHEMA_VERSION_TABLE)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;

        let current_version = self.get_schema_version()?;

        if current_version < CURRENT_VERSION {
            self.migrate(current_version)?;
        }

        Ok(())
    }

    /// Get the current schema version.
    fn get_schema_version(&self) -> Result<i32, DatabaseError> {
        let result: SqliteResult<i32> = self.conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        );

        match result {
            Ok(version) => Ok(version),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
            Err(e) => Err(DatabaseError::QueryFailed(e.to_string())),
        }
    }

    /// Run database migrations.
    fn migrate(&self, from_version: i32) -> Result<(), DatabaseError> {
        if from_version < 1 {
            self.conn
                .execute_batch(SCHEMA)
                .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;

            self.conn
                .execute(
                    "INSERT INTO schema_version (version, applied_at) VALUES (?, datetime('now'))",
                    [CURRENT_VERSION],
                )
                .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;

            tracing::info!("Database migrated to version {}", CURRENT_VERSION);
        }

        // Future migrations would go here:
        // if from_version < 2 { ... }

        Ok(())
    }

    /// Get a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    // ========== Rider operations ==========
    // Writes are the OAuth collaborator's surface (used by tests and
    // tooling); the engine itself only reads riders.

    /// Insert a rider.
    pub fn insert_rider(&self, rider: &Rider) -> Result<(), DatabaseError> {
        self.conn
            .execute(
                "INSERT INTO riders (athlete_id, display_name, public_consent, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    rider.athlete_id,
                    rider.display_name,
                    rider.public_consent as i32,
                    rider.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    /// Get a rider by athlete id.
    pub fn get_rider(&self, athlete_id: i64) -> Result<Option<Rider>, DatabaseError> {
        let result = self.conn.query_row(
            "SELECT athlete_id, display_name, public_consent, created_at
             FROM riders WHERE athlete_id = ?1",
            params![athlete_id],
            |row| {
                Ok(RiderRow {
                    athlete_id: row.get(0)?,
                    display_name: row.get(1)?,
                    public_consent: row.get(2)?,
                    created_at: row.get(3)?,
                })
            },
        );

        match result {
            Ok(row) => Ok(Some(row.into_rider()?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DatabaseError::QueryFailed(e.to_string())),
        }
    }

    /// Get all riders who consented to public leaderboard display.
    pub fn list_consenting_riders(&self) -> Result<Vec<Rider>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT athlete_id, display_name, public_consent, created_at
                 FROM riders WHERE public_consent = 1 ORDER BY athlete_id",
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(RiderRow {
                    athlete_id: row.get(0)?,
                    display_name: row.get(1)?,
                    public_consent: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let mut riders = Vec::new();
        for row in rows {
            let row = row.map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
            riders.push(row.into_rider()?);
        }

        Ok(riders)
    }
}

/// Intermediate struct for reading rider rows from database.
struct RiderRow {
    athlete_id: i64,
    display_name: String,
    public_consent: i32,
    created_at: String,
}

impl RiderRow {
    fn into_rider(self) -> Result<Rider, DatabaseError> {
        let created_at = parse_timestamp(&self.created_at)?;

        Ok(Rider {
            athlete_id: self.athlete_id,
            display_name: self.display_name,
            public_consent: self.public_consent != 0,
            created_at,
        })
    }
}

/// Parse an RFC 3339 timestamp column.
pub(crate) fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::DeserializationError(format!("Invalid timestamp: {}", e)))
}

/// Database errors.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}
