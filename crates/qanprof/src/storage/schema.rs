use rusqlite::{Connection, OptionalExtension};

pub const SCHEMA_VERSION: i32 = 1;

/// Create all tables (drops existing tables first to ensure clean state)
pub fn create_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        DROP TABLE IF EXISTS points;
        DROP TABLE IF EXISTS entries;
        DROP TABLE IF EXISTS meta;

        -- Metadata table
        CREATE TABLE meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- One row per profile entry; rank 0 is the aggregate row
        CREATE TABLE entries (
            rank INTEGER PRIMARY KEY,
            query_id TEXT NOT NULL,
            abstract TEXT NOT NULL,
            fingerprint TEXT NOT NULL,
            first_seen TEXT NOT NULL,
            load REAL NOT NULL,
            percentage REAL NOT NULL,
            qps REAL NOT NULL,
            count INTEGER NOT NULL,
            sum REAL NOT NULL,
            min REAL NOT NULL,
            max REAL NOT NULL,
            avg REAL NOT NULL,
            median REAL NOT NULL,
            p5 REAL NOT NULL,
            p95 REAL NOT NULL
        );

        -- Sparkline points per entry
        CREATE TABLE points (
            rank INTEGER NOT NULL,
            point INTEGER NOT NULL,
            start_ts TEXT NOT NULL,
            no_data INTEGER NOT NULL,
            count REAL NOT NULL,
            load REAL NOT NULL,
            avg_time REAL NOT NULL,
            PRIMARY KEY (rank, point),
            FOREIGN KEY (rank) REFERENCES entries(rank)
        );
        "#,
    )
}

/// Set a metadata key
pub fn set_meta(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO meta (key, value) VALUES (?, ?)",
        [key, value],
    )?;
    Ok(())
}

/// Get a metadata key
pub fn get_meta(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row("SELECT value FROM meta WHERE key = ?", [key], |row| {
        row.get(0)
    })
    .optional()
}
