use super::schema::{self, SCHEMA_VERSION};
use crate::error::Result;
use crate::params::ViewParameters;
use crate::profile::ProfileSession;
use rusqlite::Connection;
use std::path::Path;

/// Snapshot of a loaded profile in a SQLite file
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Create a new snapshot file for `params`
    pub fn create(path: &Path, params: &ViewParameters) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        // Create tables (drops existing tables first)
        schema::create_tables(&conn)?;

        schema::set_meta(&conn, "version", &SCHEMA_VERSION.to_string())?;
        schema::set_meta(&conn, "host", &params.host)?;
        schema::set_meta(&conn, "from", &params.from.to_rfc3339())?;
        schema::set_meta(&conn, "to", &params.to.to_rfc3339())?;
        schema::set_meta(&conn, "timezone", &params.timezone)?;
        if let Some(search) = &params.search {
            schema::set_meta(&conn, "search", search)?;
        }
        schema::set_meta(&conn, "created", &chrono::Utc::now().to_rfc3339())?;

        Ok(Storage { conn })
    }

    /// Write every loaded entry and its sparkline. Returns the number of entries.
    pub fn save_session(&mut self, session: &ProfileSession) -> Result<usize> {
        let tx = self.conn.transaction()?;

        tx.execute("DELETE FROM points", [])?;
        tx.execute("DELETE FROM entries", [])?;
        schema::set_meta(&tx, "total_queries", &session.total_matching().to_string())?;

        {
            let mut entry_stmt = tx.prepare_cached(
                "INSERT INTO entries (rank, query_id, abstract, fingerprint, first_seen, load, percentage, qps, count, sum, min, max, avg, median, p5, p95) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )?;
            let mut point_stmt = tx.prepare_cached(
                "INSERT INTO points (rank, point, start_ts, no_data, count, load, avg_time) VALUES (?, ?, ?, ?, ?, ?, ?)",
            )?;

            for entry in session.entries() {
                let s = &entry.stats;
                entry_stmt.execute(rusqlite::params![
                    entry.rank,
                    entry.id,
                    entry.abstract_text,
                    entry.fingerprint,
                    entry.first_seen.to_rfc3339(),
                    entry.load,
                    entry.percentage,
                    entry.qps,
                    s.count as i64,
                    s.sum,
                    s.min,
                    s.max,
                    s.avg,
                    s.median,
                    s.p5,
                    s.p95
                ])?;

                for point in &entry.time_series {
                    point_stmt.execute(rusqlite::params![
                        entry.rank,
                        point.index,
                        point.window_start.to_rfc3339(),
                        point.no_data,
                        point.count,
                        point.load,
                        point.avg_time
                    ])?;
                }
            }
        }

        tx.commit()?;
        log::info!("Saved {} profile entries", session.entries().len());
        Ok(session.entries().len())
    }

    /// Number of entries stored
    pub fn entry_count(&self) -> Result<u64> {
        entry_count(&self.conn)
    }

    pub fn meta(&self, key: &str) -> Result<Option<String>> {
        Ok(schema::get_meta(&self.conn, key)?)
    }
}

pub fn entry_count(conn: &Connection) -> Result<u64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
    Ok(count as u64)
}
