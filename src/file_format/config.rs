use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, XrefError};
use crate::store::OpenMode;

/// How hard the engine works to get each committed write onto the disk.
/// Mirrors SQLite's `PRAGMA synchronous`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Synchronous {
    /// Leave it to the OS.  Fast bulk indexing; a crash can lose or damage
    /// the store, which is fine if the generation will be rebuilt anyway.
    Off,
    Normal,
    Full,
}

impl Default for Synchronous {
    fn default() -> Self {
        Synchronous::Normal
    }
}

impl Synchronous {
    pub fn pragma_value(self) -> &'static str {
        match self {
            Synchronous::Off => "OFF",
            Synchronous::Normal => "NORMAL",
            Synchronous::Full => "FULL",
        }
    }
}

fn default_read_only() -> bool {
    true
}

/// Schema for the JSON config files describing where an index lives and how
/// to open it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Directory holding the eight store files.  It must already exist.
    pub data_dir: PathBuf,
    /// Readers (the default) open everything read-only; the indexer sets this
    /// to false.
    #[serde(default = "default_read_only")]
    pub read_only: bool,
    /// Flush to disk after every put, not just on explicit `sync_all`.
    #[serde(default)]
    pub sync_on_put: bool,
    #[serde(default)]
    pub synchronous: Synchronous,
    /// Engine page cache size, in pages.  The engine default when absent.
    #[serde(default)]
    pub cache_pages: Option<i64>,
}

impl IndexConfig {
    pub fn new(data_dir: impl Into<PathBuf>, mode: OpenMode) -> Self {
        IndexConfig {
            data_dir: data_dir.into(),
            read_only: mode == OpenMode::ReadOnly,
            sync_on_put: false,
            synchronous: Synchronous::default(),
            cache_pages: None,
        }
    }

    pub fn open_mode(&self) -> OpenMode {
        if self.read_only {
            OpenMode::ReadOnly
        } else {
            OpenMode::ReadWrite
        }
    }
}

pub fn load(config_path: &Path) -> Result<IndexConfig> {
    let file = File::open(config_path).map_err(|_| XrefError::missing(config_path))?;
    let reader = BufReader::new(file);
    let config: IndexConfig = serde_json::from_reader(reader)?;
    Ok(config)
}
