//! Translation history in SQLite

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::warn;

pub const HISTORY_FILE_NAME: &str = "history.db";

/// Column order of an exported history file
pub const EXPORT_HEADER: [&str; 5] = ["timestamp", "source", "target", "original", "translated"];

/// One translated line
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub id: i64,
    pub original: String,
    pub translated: String,
    pub source_lang: String,
    pub target_lang: String,
    pub timestamp: DateTime<Utc>,
}

/// History database connection
pub struct HistoryStore {
    conn: Connection,
}

impl HistoryStore {
    /// Open or create the database at `path`
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("opening history at {}", path.display()))?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Open at `path`, falling back to an empty in-memory store when the file
    /// is unusable
    pub fn open_or_empty(path: &Path) -> Result<Self> {
        match Self::open(path) {
            Ok(store) => Ok(store),
            Err(e) => {
                warn!("History unavailable, starting empty: {:#}", e);
                Self::open_in_memory()
            }
        }
    }

    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS history (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                original    TEXT NOT NULL,
                translated  TEXT NOT NULL,
                source_lang TEXT NOT NULL,
                target_lang TEXT NOT NULL,
                timestamp   TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Append a translated line stamped with the current UTC time
    pub fn add_entry(
        &self,
        original: &str,
        translated: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO history (original, translated, source_lang, target_lang, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![original, translated, source_lang, target_lang, Utc::now().to_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Newest entries first. Rows with an unreadable timestamp are skipped.
    pub fn recent(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, original, translated, source_lang, target_lang, timestamp
             FROM history ORDER BY id DESC LIMIT ?1",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![limit], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, original, translated, source_lang, target_lang, timestamp) = row?;
            let Ok(timestamp) = DateTime::parse_from_rfc3339(&timestamp) else {
                continue;
            };
            entries.push(HistoryEntry {
                id,
                original,
                translated,
                source_lang,
                target_lang,
                timestamp: timestamp.with_timezone(&Utc),
            });
        }
        Ok(entries)
    }

    /// Delete all entries
    pub fn clear(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM history", [])?)
    }

    /// Write every entry, newest first, to a CSV file at `path`
    pub fn export_csv(&self, path: &Path) -> Result<usize> {
        let entries = self.recent(usize::MAX)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("opening {}", path.display()))?;
        writer.write_record(EXPORT_HEADER)?;
        for entry in &entries {
            let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string();
            writer.write_record([
                timestamp.as_str(),
                entry.source_lang.as_str(),
                entry.target_lang.as_str(),
                entry.original.as_str(),
                entry.translated.as_str(),
            ])?;
        }
        writer.flush()?;
        Ok(entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_add_and_list_newest_first() {
        let store = HistoryStore::open_in_memory().unwrap();
        store.add_entry("Hola", "Hello", "es", "en").unwrap();
        store.add_entry("Adiós", "Goodbye", "es", "en").unwrap();

        let entries = store.recent(10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].original, "Adiós");
        assert_eq!(entries[1].translated, "Hello");
        assert_eq!(entries[1].target_lang, "en");
    }

    #[test]
    fn test_recent_respects_limit() {
        let store = HistoryStore::open_in_memory().unwrap();
        for i in 0..5 {
            store.add_entry(&format!("line {}", i), "x", "auto", "es").unwrap();
        }
        let entries = store.recent(2).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].original, "line 4");
    }

    #[test]
    fn test_clear() {
        let store = HistoryStore::open_in_memory().unwrap();
        store.add_entry("a", "b", "en", "es").unwrap();
        assert_eq!(store.clear().unwrap(), 1);
        assert!(store.recent(10).unwrap().is_empty());
    }

    #[test]
    fn test_persists_across_opens() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(HISTORY_FILE_NAME);

        HistoryStore::open(&path)
            .unwrap()
            .add_entry("uno", "one", "es", "en")
            .unwrap();

        let entries = HistoryStore::open(&path).unwrap().recent(10).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].translated, "one");
    }

    #[test]
    fn test_export_csv() {
        let store = HistoryStore::open_in_memory().unwrap();
        store.add_entry("Hola, mundo", "Hello, world", "es", "en").unwrap();
        store.add_entry("Dijo \"sí\"", "He said \"yes\"", "es", "en").unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("export").join("history.csv");
        assert_eq!(store.export_csv(&path).unwrap(), 2);

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let header: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
        assert_eq!(header, EXPORT_HEADER);

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][3], "Dijo \"sí\"");
        assert_eq!(&rows[0][4], "He said \"yes\"");
        assert_eq!(&rows[1][1], "es");
        assert_eq!(&rows[1][2], "en");
        assert_eq!(&rows[1][4], "Hello, world");
        assert_eq!(rows[1][0].len(), "2024-01-01 00:00:00".len());
    }

    #[test]
    fn test_export_empty_history_writes_header() {
        let store = HistoryStore::open_in_memory().unwrap();
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.csv");

        assert_eq!(store.export_csv(&path).unwrap(), 0);
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim_end(), "timestamp,source,target,original,translated");
    }

    #[test]
    fn test_corrupt_file_falls_back_to_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(HISTORY_FILE_NAME);
        std::fs::write(&path, "not a database\n".repeat(64)).unwrap();

        let store = HistoryStore::open_or_empty(&path).unwrap();
        assert!(store.recent(10).unwrap().is_empty());
    }
}
