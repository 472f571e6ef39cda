use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};

use super::{EngineOptions, KeyValueEngine};
use crate::error::Result;

/// Each store file holds a single two-column table.  `WITHOUT ROWID` makes the
/// table itself the B-tree ordered on `key`, rather than a rowid table plus a
/// separate index.
const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS kv (
    key BLOB PRIMARY KEY NOT NULL,
    value BLOB NOT NULL
) WITHOUT ROWID";

pub struct SqliteEngine {
    conn: Connection,
    path: PathBuf,
}

impl SqliteEngine {
    fn configure(conn: &Connection, options: &EngineOptions) -> Result<()> {
        if let Some(pages) = options.cache_pages {
            conn.execute_batch(&format!("PRAGMA cache_size = {};", pages))?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueEngine for SqliteEngine {
    fn open_read_only(path: &Path, options: &EngineOptions) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Self::configure(&conn, options)?;
        Ok(SqliteEngine {
            conn,
            path: path.to_path_buf(),
        })
    }

    fn open_or_create(path: &Path, options: &EngineOptions) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Self::configure(&conn, options)?;
        conn.execute_batch(&format!(
            "PRAGMA synchronous = {};",
            options.synchronous.pragma_value()
        ))?;
        conn.execute(CREATE_TABLE, [])?;
        Ok(SqliteEngine {
            conn,
            path: path.to_path_buf(),
        })
    }

    fn exists(&self, key: &[u8]) -> Result<bool> {
        let mut stmt = self.conn.prepare_cached("SELECT 1 FROM kv WHERE key = ?1")?;
        let found = stmt.query_row(params![key], |_| Ok(())).optional()?;
        Ok(found.is_some())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let mut stmt = self.conn.prepare_cached("SELECT value FROM kv WHERE key = ?1")?;
        let value = stmt
            .query_row(params![key], |row| row.get::<_, Vec<u8>>(0))
            .optional()?;
        Ok(value)
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare_cached("INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)")?;
        stmt.execute(params![key, value])?;
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        self.conn.cache_flush()?;
        Ok(())
    }

    fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, err)| err.into())
    }
}
