//! SQLite-backed meal log.
//!
//! Every append is committed with `synchronous = FULL` before it returns, so a
//! meal the caller saw succeed survives a crash.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};

use super::data_dir;
use super::meal_log::{format_timestamp, parse_timestamp, truncate_to_second, MealEvent, MealLog};
use super::migrations;
use crate::error::PersistenceError;

/// Default database file name inside the data directory.
pub const DATABASE_FILE: &str = "fasting.db";

/// SQLite database for meal storage.
pub struct SqliteMealLog {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteMealLog {
    /// Open `<data_dir>/fasting.db`, creating it and its schema if needed.
    ///
    /// # Errors
    /// Returns an error if the data directory or the database cannot be opened.
    pub fn open_default() -> Result<Self, PersistenceError> {
        let dir = data_dir().map_err(|e| PersistenceError::Unreadable(e.to_string()))?;
        Self::open(dir.join(DATABASE_FILE))
    }

    /// Open the database at `path`, creating it and its schema if needed.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path).map_err(|source| PersistenceError::OpenFailed {
            path: path.clone(),
            source,
        })?;
        Self::init(conn, Some(path))
    }

    /// Open an in-memory database. Contents vanish with the handle.
    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory().map_err(|source| PersistenceError::OpenFailed {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        Self::init(conn, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self, PersistenceError> {
        conn.pragma_update(None, "synchronous", "FULL")
            .map_err(PersistenceError::write)?;
        migrations::migrate(&conn)
            .map_err(|e| PersistenceError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn, path })
    }

    /// File backing this log, `None` for in-memory logs.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of stored meals.
    pub fn count(&self) -> Result<u64, PersistenceError> {
        self.conn
            .query_row("SELECT COUNT(*) FROM meals", [], |row| row.get::<_, u64>(0))
            .map_err(PersistenceError::read)
    }

    /// Copy every meal out of a database written by the legacy desktop app.
    ///
    /// The source holds `meals(id, timestamp, note)` with local
    /// `YYYY-MM-DD HH:MM:SS` timestamps. Rows are re-inserted in chronological
    /// order inside one transaction. Only an empty log can be imported into,
    /// since older meals would otherwise land after newer ones.
    ///
    /// # Errors
    /// Returns `LegacyImport` if this log is not empty or the source cannot be
    /// read; nothing is written in that case.
    pub fn import_legacy(&mut self, source: impl AsRef<Path>) -> Result<usize, PersistenceError> {
        let source = source.as_ref();
        if self.count()? > 0 {
            return Err(PersistenceError::LegacyImport(
                "meal log already has entries".to_string(),
            ));
        }

        let src = Connection::open_with_flags(source, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| PersistenceError::LegacyImport(format!("{}: {e}", source.display())))?;
        let mut stmt = src
            .prepare("SELECT timestamp, note FROM meals ORDER BY id")
            .map_err(|e| PersistenceError::LegacyImport(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, Option<String>>(1)?,
                ))
            })
            .map_err(|e| PersistenceError::LegacyImport(e.to_string()))?;

        let mut meals = Vec::new();
        for row in rows {
            let (raw_ts, note) = row.map_err(|e| PersistenceError::LegacyImport(e.to_string()))?;
            let raw_ts = raw_ts.ok_or_else(|| {
                PersistenceError::LegacyImport("row without timestamp".to_string())
            })?;
            meals.push((parse_timestamp(&raw_ts)?, note.unwrap_or_default()));
        }
        // Stable: equal timestamps keep their original insertion order.
        meals.sort_by_key(|(ts, _)| *ts);

        let tx = self.conn.transaction().map_err(PersistenceError::write)?;
        for (ts, note) in &meals {
            tx.execute(
                "INSERT INTO meals (timestamp, note) VALUES (?1, ?2)",
                params![format_timestamp(*ts), note],
            )
            .map_err(PersistenceError::write)?;
        }
        tx.commit().map_err(PersistenceError::write)?;

        tracing::info!(imported = meals.len(), source = %source.display(), "imported legacy meals");
        Ok(meals.len())
    }
}

fn row_to_meal(row: &rusqlite::Row<'_>) -> rusqlite::Result<(i64, Option<String>, Option<String>)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn into_meal(
    (id, raw_ts, note): (i64, Option<String>, Option<String>),
) -> Result<MealEvent, PersistenceError> {
    let raw_ts = raw_ts.ok_or_else(|| PersistenceError::InvalidTimestamp(format!("meal {id}")))?;
    Ok(MealEvent {
        id,
        timestamp: parse_timestamp(&raw_ts)?,
        note: note.unwrap_or_default(),
    })
}

impl MealLog for SqliteMealLog {
    fn append(
        &mut self,
        timestamp: DateTime<Utc>,
        note: &str,
    ) -> Result<MealEvent, PersistenceError> {
        let timestamp = truncate_to_second(timestamp);
        if let Some(last) = self.most_recent()? {
            if timestamp < last.timestamp {
                return Err(PersistenceError::OutOfOrder {
                    last: last.timestamp,
                    attempted: timestamp,
                });
            }
        }

        let tx = self.conn.transaction().map_err(PersistenceError::write)?;
        tx.execute(
            "INSERT INTO meals (timestamp, note) VALUES (?1, ?2)",
            params![format_timestamp(timestamp), note],
        )
        .map_err(PersistenceError::write)?;
        let id = tx.last_insert_rowid();
        tx.commit().map_err(PersistenceError::write)?;

        Ok(MealEvent {
            id,
            timestamp,
            note: note.to_string(),
        })
    }

    fn most_recent(&self) -> Result<Option<MealEvent>, PersistenceError> {
        self.conn
            .query_row(
                "SELECT id, timestamp, note FROM meals ORDER BY timestamp DESC, id DESC LIMIT 1",
                [],
                row_to_meal,
            )
            .optional()
            .map_err(PersistenceError::read)?
            .map(into_meal)
            .transpose()
    }

    fn recent(&self, n: usize) -> Result<Vec<MealEvent>, PersistenceError> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let limit = i64::try_from(n).unwrap_or(i64::MAX);
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, timestamp, note FROM meals ORDER BY timestamp DESC, id DESC LIMIT ?1",
            )
            .map_err(PersistenceError::read)?;
        let rows = stmt
            .query_map(params![limit], row_to_meal)
            .map_err(PersistenceError::read)?;

        let mut meals = Vec::with_capacity(n.min(64));
        for row in rows {
            meals.push(into_meal(row.map_err(PersistenceError::read)?)?);
        }
        Ok(meals)
    }
}
