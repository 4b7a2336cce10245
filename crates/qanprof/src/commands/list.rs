use crate::error::Result;
use crate::storage::{entry_count, get_meta};
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// Snapshot info extracted from a database file
pub struct SnapshotInfo {
    pub path: PathBuf,
    pub host: String,
    pub from: String,
    pub to: String,
    pub search: Option<String>,
    pub entries: u64,
    pub created: String,
}

/// Find all qanprof snapshot databases in a directory, newest first
pub fn find_snapshots(dir: &Path) -> Result<Vec<SnapshotInfo>> {
    let mut snapshots = Vec::new();

    let entries = std::fs::read_dir(dir)?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().map(|e| e == "db").unwrap_or(false) {
            // Check if filename matches qanprof.*.db pattern
            if let Some(name) = path.file_name().and_then(|n| n.to_str())
                && name.starts_with("qanprof.")
            {
                match get_snapshot_info(&path) {
                    Ok(info) => snapshots.push(info),
                    Err(e) => log::debug!("Skipping {}: {}", path.display(), e),
                }
            }
        }
    }

    snapshots.sort_by(|a, b| b.created.cmp(&a.created));

    Ok(snapshots)
}

fn get_snapshot_info(path: &Path) -> Result<SnapshotInfo> {
    let conn = Connection::open(path)?;
    let meta = |key: &str| -> Result<Option<String>> { Ok(get_meta(&conn, key)?) };

    Ok(SnapshotInfo {
        path: path.to_path_buf(),
        host: meta("host")?.unwrap_or_else(|| "unknown".to_string()),
        from: meta("from")?.unwrap_or_default(),
        to: meta("to")?.unwrap_or_default(),
        search: meta("search")?,
        entries: entry_count(&conn)?,
        created: meta("created")?.unwrap_or_else(|| "unknown".to_string()),
    })
}

/// Run the list command
pub fn run(dir: Option<&Path>) -> Result<()> {
    let search_dir = dir.unwrap_or_else(|| Path::new("."));
    let snapshots = find_snapshots(search_dir)?;

    if snapshots.is_empty() {
        println!("No qanprof snapshots found in {}", search_dir.display());
        return Ok(());
    }

    println!(
        "{:<44} {:>20} {:>8} {:>26}  SEARCH",
        "FILE", "HOST", "ENTRIES", "CREATED"
    );
    println!("{}", "-".repeat(110));

    for snapshot in snapshots {
        let filename = snapshot
            .path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        println!(
            "{:<44} {:>20} {:>8} {:>26}  {}",
            filename,
            snapshot.host,
            snapshot.entries,
            snapshot.created,
            snapshot.search.as_deref().unwrap_or("-")
        );
        log::debug!("{}: {} - {}", filename, snapshot.from, snapshot.to);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ViewParameters;
    use crate::storage::Storage;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_find_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let params = ViewParameters::new(
            "db1",
            Utc.with_ymd_and_hms(2018, 9, 18, 5, 33, 30).unwrap(),
            Utc.with_ymd_and_hms(2018, 9, 18, 17, 33, 30).unwrap(),
        );
        Storage::create(&dir.path().join("qanprof.db1.180918173330.db"), &params).unwrap();
        // Not a snapshot name
        Storage::create(&dir.path().join("other.db"), &params).unwrap();
        std::fs::write(dir.path().join("qanprof.notes.txt"), "x").unwrap();

        let found = find_snapshots(dir.path()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].host, "db1");
        assert_eq!(found[0].entries, 0);
        assert_eq!(found[0].search, None);
    }

    #[test]
    fn test_missing_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_snapshots(&dir.path().join("missing")).is_err());
    }
}
