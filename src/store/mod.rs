use std::borrow::Cow;
use std::path::{Path, PathBuf};

use crate::error::{ErrorDetails, Result, XrefError};
use crate::file_format::config::{IndexConfig, Synchronous};
use crate::file_format::definitions::DefinitionRecord;
use crate::file_format::paths::PathRecord;
use crate::file_format::references::ReferenceRecord;

mod sqlite;

pub use sqlite::SqliteEngine;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OpenMode {
    /// The store file must already exist and is never written.
    ReadOnly,
    /// The store file is created if needed.
    ReadWrite,
}

/// Knobs passed through to the engine when a store file is opened.
#[derive(Clone, Debug, Default)]
pub struct EngineOptions {
    pub synchronous: Synchronous,
    pub cache_pages: Option<i64>,
}

impl From<&IndexConfig> for EngineOptions {
    fn from(config: &IndexConfig) -> Self {
        EngineOptions {
            synchronous: config.synchronous,
            cache_pages: config.cache_pages,
        }
    }
}

/// An ordered persistent key/value file.  Keys and values are opaque bytes at
/// this level.
///
/// Implementations do no locking of their own beyond whatever the underlying
/// engine does when several processes open the same file; there is expected
/// to be at most one writer.
pub trait KeyValueEngine: Sized {
    /// Opens an existing file without the ability to write to it.
    fn open_read_only(path: &Path, options: &EngineOptions) -> Result<Self>;
    fn open_or_create(path: &Path, options: &EngineOptions) -> Result<Self>;
    fn exists(&self, key: &[u8]) -> Result<bool>;
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()>;
    /// Pushes everything written so far out to the file.
    fn sync(&mut self) -> Result<()>;
    fn close(self) -> Result<()>;
}

/// Conversion of logical keys to the bytes used in the store.  Numbers are
/// written as decimal ASCII so that the serial `42` and the string `"42"` are
/// the same key.
pub trait StoreKey {
    fn to_key_bytes(&self) -> Cow<'_, [u8]>;
}

impl StoreKey for [u8] {
    fn to_key_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self)
    }
}

impl StoreKey for Vec<u8> {
    fn to_key_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_slice())
    }
}

impl StoreKey for str {
    fn to_key_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_bytes())
    }
}

impl StoreKey for String {
    fn to_key_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_bytes())
    }
}

macro_rules! numeric_store_key {
    ($($t:ty),*) => {
        $(
            impl StoreKey for $t {
                fn to_key_bytes(&self) -> Cow<'_, [u8]> {
                    Cow::Owned(self.to_string().into_bytes())
                }
            }
        )*
    };
}

numeric_store_key!(u32, u64, usize, i64);

/// Which shape of value a store holds.  Fixed when the store is opened.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValueKind {
    Integer,
    RawBytes,
    Text,
    Definitions,
    References,
    Paths,
}

/// A decoded store value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StoredValue {
    Integer(i64),
    RawBytes(Vec<u8>),
    Text(String),
    Definitions(DefinitionRecord),
    References(ReferenceRecord),
    Paths(PathRecord),
}

fn wrong_kind(expected: ValueKind, got: ValueKind) -> XrefError {
    XrefError::bad_input(format!("expected a {:?} value, got {:?}", expected, got))
}

impl StoredValue {
    pub fn decode(kind: ValueKind, raw: &[u8]) -> Result<StoredValue> {
        Ok(match kind {
            ValueKind::Integer => StoredValue::Integer(std::str::from_utf8(raw)?.parse()?),
            ValueKind::RawBytes => StoredValue::RawBytes(raw.to_vec()),
            ValueKind::Text => StoredValue::Text(std::str::from_utf8(raw)?.to_string()),
            ValueKind::Definitions => StoredValue::Definitions(DefinitionRecord::decode(raw)?),
            ValueKind::References => StoredValue::References(ReferenceRecord::decode(raw)?),
            ValueKind::Paths => StoredValue::Paths(PathRecord::decode(raw)?),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            StoredValue::Integer(value) => value.to_string().into_bytes(),
            StoredValue::RawBytes(bytes) => bytes.clone(),
            StoredValue::Text(text) => text.as_bytes().to_vec(),
            StoredValue::Definitions(record) => record.encode(),
            StoredValue::References(record) => record.encode(),
            StoredValue::Paths(record) => record.encode(),
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            StoredValue::Integer(_) => ValueKind::Integer,
            StoredValue::RawBytes(_) => ValueKind::RawBytes,
            StoredValue::Text(_) => ValueKind::Text,
            StoredValue::Definitions(_) => ValueKind::Definitions,
            StoredValue::References(_) => ValueKind::References,
            StoredValue::Paths(_) => ValueKind::Paths,
        }
    }

    pub fn into_integer(self) -> Result<i64> {
        match self {
            StoredValue::Integer(value) => Ok(value),
            other => Err(wrong_kind(ValueKind::Integer, other.kind())),
        }
    }

    pub fn into_raw_bytes(self) -> Result<Vec<u8>> {
        match self {
            StoredValue::RawBytes(bytes) => Ok(bytes),
            other => Err(wrong_kind(ValueKind::RawBytes, other.kind())),
        }
    }

    pub fn into_text(self) -> Result<String> {
        match self {
            StoredValue::Text(text) => Ok(text),
            other => Err(wrong_kind(ValueKind::Text, other.kind())),
        }
    }

    pub fn into_definitions(self) -> Result<DefinitionRecord> {
        match self {
            StoredValue::Definitions(record) => Ok(record),
            other => Err(wrong_kind(ValueKind::Definitions, other.kind())),
        }
    }

    pub fn into_references(self) -> Result<ReferenceRecord> {
        match self {
            StoredValue::References(record) => Ok(record),
            other => Err(wrong_kind(ValueKind::References, other.kind())),
        }
    }

    pub fn into_paths(self) -> Result<PathRecord> {
        match self {
            StoredValue::Paths(record) => Ok(record),
            other => Err(wrong_kind(ValueKind::Paths, other.kind())),
        }
    }
}

/// One store file bound to the kind of value it holds.
pub struct KeyedStore<E: KeyValueEngine = SqliteEngine> {
    path: PathBuf,
    kind: ValueKind,
    mode: OpenMode,
    sync_on_put: bool,
    engine: E,
}

impl<E: KeyValueEngine> KeyedStore<E> {
    pub fn open(path: &Path, mode: OpenMode, kind: ValueKind, options: &EngineOptions) -> Result<Self> {
        let engine = match mode {
            OpenMode::ReadOnly => {
                // Engines are inclined to report a missing file as something
                // vaguer, so check up front.
                if !path.is_file() {
                    return Err(XrefError::missing(path));
                }
                E::open_read_only(path, options)?
            }
            OpenMode::ReadWrite => E::open_or_create(path, options)?,
        };
        debug!(path = %path.display(), ?mode, ?kind, "opened store");
        Ok(KeyedStore {
            path: path.to_path_buf(),
            kind,
            mode,
            sync_on_put: false,
            engine,
        })
    }

    /// Makes every `put` flush, regardless of its own `sync` argument.
    pub fn set_sync_on_put(&mut self, sync_on_put: bool) {
        self.sync_on_put = sync_on_put;
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn exists<K: StoreKey + ?Sized>(&self, key: &K) -> Result<bool> {
        self.engine.exists(&key.to_key_bytes())
    }

    pub fn get_raw<K: StoreKey + ?Sized>(&self, key: &K) -> Result<Option<Vec<u8>>> {
        self.engine.get(&key.to_key_bytes())
    }

    pub fn get<K: StoreKey + ?Sized>(&self, key: &K) -> Result<Option<StoredValue>> {
        match self.get_raw(key)? {
            Some(raw) => Ok(Some(StoredValue::decode(self.kind, &raw)?)),
            None => Ok(None),
        }
    }

    pub fn put<K: StoreKey + ?Sized>(&mut self, key: &K, value: &StoredValue, sync: bool) -> Result<()> {
        if self.mode == OpenMode::ReadOnly {
            return Err(XrefError::ReadOnly(ErrorDetails::at("put", &self.path)));
        }
        if value.kind() != self.kind {
            return Err(wrong_kind(self.kind, value.kind()));
        }
        let key = key.to_key_bytes();
        let value = value.encode();
        trace!(path = %self.path.display(), key_len = key.len(), value_len = value.len(), "put");
        self.engine.put(&key, &value)?;
        if sync || self.sync_on_put {
            self.engine.sync()?;
        }
        Ok(())
    }

    pub fn sync(&mut self) -> Result<()> {
        if self.mode == OpenMode::ReadOnly {
            return Ok(());
        }
        self.engine.sync()
    }

    pub fn close(self) -> Result<()> {
        debug!(path = %self.path.display(), "closing store");
        self.engine.close()
    }
}
