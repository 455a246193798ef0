//! Database schema migrations for the meal log.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{params, Connection, Result as SqliteResult};

use super::meal_log::{format_timestamp, parse_timestamp};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 for a fresh database.
pub fn get_schema_version(conn: &Connection) -> SqliteResult<i32> {
    match conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    }) {
        Ok(v) => Ok(v),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e),
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: the meals table.
///
/// Column layout matches the legacy desktop app's database, so an old
/// `meals` table is adopted in place.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS meals (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp TEXT NOT NULL,
            note      TEXT NOT NULL DEFAULT ''
        );",
    )?;
    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: normalize legacy timestamps and index for most-recent lookups.
///
/// Rows adopted from the legacy app store local `YYYY-MM-DD HH:MM:SS`
/// text, which does not sort together with RFC 3339 UTC. They are rewritten
/// so `ORDER BY timestamp` stays chronological. Rows that do not parse are
/// left alone and surface as read errors later.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    let legacy: Vec<(i64, String)> = {
        let mut stmt = tx.prepare(
            "SELECT id, timestamp FROM meals \
             WHERE timestamp IS NOT NULL AND timestamp NOT LIKE '%T%'",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        let collected = rows.collect::<SqliteResult<Vec<_>>>()?;
        collected
    };
    for (id, raw) in legacy {
        if let Ok(ts) = parse_timestamp(&raw) {
            tx.execute(
                "UPDATE meals SET timestamp = ?1 WHERE id = ?2",
                params![format_timestamp(ts), id],
            )?;
        }
    }
    tx.execute("UPDATE meals SET note = '' WHERE note IS NULL", [])?;

    tx.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_meals_timestamp_id ON meals(timestamp, id);",
    )?;
    set_schema_version(&tx, 2)?;
    tx.commit()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_database_reaches_current_version() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn adopts_existing_meals_table() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE meals (id INTEGER PRIMARY KEY AUTOINCREMENT, timestamp TEXT, note TEXT);
             INSERT INTO meals (timestamp, note) VALUES ('2024-01-01 08:00:00', 'toast');",
        )
        .unwrap();

        migrate(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM meals", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);

        let stored: String = conn
            .query_row("SELECT timestamp FROM meals", [], |row| row.get(0))
            .unwrap();
        assert!(stored.ends_with('Z'), "legacy timestamp not normalized: {stored}");
    }
}
