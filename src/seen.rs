//! Seen-leads store
//! Remembers which lead ids were already exported, in a single SQLite table.

use std::collections::HashSet;
use std::path::Path;

use chrono::Utc;
use log::{debug, info, warn};
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::StorageError;
use crate::lead::RawLead;

/// Handle on the seen-set database, held for the length of one run
pub struct SeenStore {
    conn: Connection,
}

/// Result of filtering a fetched batch against the store
#[derive(Debug, Default)]
pub struct Partition {
    pub new: Vec<RawLead>,
    pub already_seen: usize,
    pub repeated: usize,
    pub missing_id: usize,
}

impl SeenStore {
    /// Open (or create) the store at `path`, creating parent directories as needed
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| StorageError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        debug!("Opening seen-set database at {}", path.display());
        Self::init(Connection::open(path)?)
    }

    /// In-memory store for unit tests
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS seen_leads (
                lead_id TEXT PRIMARY KEY,
                first_seen TEXT NOT NULL
            )",
            [],
        )?;
        Ok(SeenStore { conn })
    }

    pub fn contains(&self, lead_id: &str) -> Result<bool, StorageError> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM seen_leads WHERE lead_id = ?1",
                params![lead_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn count(&self) -> Result<u64, StorageError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM seen_leads", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    /// Split `leads` into those never exported before, preserving order.
    ///
    /// A lead repeated within the batch is only kept the first time. Nothing
    /// is written; call [`SeenStore::commit`] once the leads are exported.
    pub fn partition(&self, leads: Vec<RawLead>) -> Result<Partition, StorageError> {
        let mut partition = Partition::default();
        let mut batch_ids = HashSet::new();

        for lead in leads {
            if lead.id.trim().is_empty() {
                warn!("Skipping lead with no id (created_time={:?})", lead.created_time);
                partition.missing_id += 1;
                continue;
            }
            if self.contains(&lead.id)? {
                debug!("Already seen: {}", lead.id);
                partition.already_seen += 1;
                continue;
            }
            if !batch_ids.insert(lead.id.clone()) {
                debug!("Repeated within this fetch: {}", lead.id);
                partition.repeated += 1;
                continue;
            }
            partition.new.push(lead);
        }

        Ok(partition)
    }

    /// Record `ids` as exported, in one transaction. Returns how many were newly inserted.
    pub fn commit<'a, I>(&mut self, ids: I) -> Result<usize, StorageError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let first_seen = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO seen_leads (lead_id, first_seen) VALUES (?1, ?2)",
            )?;
            for id in ids {
                inserted += stmt.execute(params![id, first_seen])?;
            }
        }
        tx.commit()?;
        info!("Marked {} leads as seen", inserted);
        Ok(inserted)
    }

    /// Close the connection, surfacing any error instead of dropping it
    pub fn close(self) -> Result<(), StorageError> {
        self.conn.close().map_err(|(_, e)| StorageError::Sqlite(e))
    }
}
