use std::convert::TryFrom;
use std::path::{Path, PathBuf};

use crate::error::{Result, XrefError};
use crate::file_format::config::IndexConfig;
use crate::file_format::definitions::{DeclKind, DefinitionRecord};
use crate::file_format::paths::PathRecord;
use crate::file_format::references::{DocCommentRecord, ReferenceRecord};
use crate::store::{
    EngineOptions, KeyValueEngine, KeyedStore, OpenMode, SqliteEngine, StoredValue, ValueKind,
};

pub const VARIABLES_DB: &str = "variables.db";
pub const BLOBS_DB: &str = "blobs.db";
pub const HASHES_DB: &str = "hashes.db";
pub const FILENAMES_DB: &str = "filenames.db";
pub const VERSIONS_DB: &str = "versions.db";
pub const DEFINITIONS_DB: &str = "definitions.db";
pub const REFERENCES_DB: &str = "references.db";
pub const DOC_COMMENTS_DB: &str = "doccomments.db";

/// Variable holding the number of blob serials handed out so far, which is
/// also the next serial to hand out.
pub const NUM_BLOBS_VAR: &str = "numBlobs";

/// Outcome of `assign_blob`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BlobAssignment {
    /// First time we've seen this content.  The caller has indexing to do.
    New(u32),
    Existing(u32),
}

impl BlobAssignment {
    pub fn serial(self) -> u32 {
        match self {
            BlobAssignment::New(serial) | BlobAssignment::Existing(serial) => serial,
        }
    }
}

/// The eight stores making up one index generation, all opened in the same
/// mode against one directory.
///
/// Updates that span stores are not atomic.  The helpers here order their
/// writes so that a crash leaves at worst an unused serial or an orphaned
/// mapping, never a hash that resolves to the wrong serial.
pub struct XrefDatabase<E: KeyValueEngine = SqliteEngine> {
    dir: PathBuf,
    mode: OpenMode,
    /// name -> integer
    pub vars: KeyedStore<E>,
    /// content hash -> serial
    pub blob: KeyedStore<E>,
    /// serial -> content hash
    pub hash: KeyedStore<E>,
    /// serial -> current filename
    pub file: KeyedStore<E>,
    /// serial -> PathRecord
    pub vers: KeyedStore<E>,
    /// identifier -> DefinitionRecord
    pub defs: KeyedStore<E>,
    /// identifier -> ReferenceRecord
    pub refs: KeyedStore<E>,
    /// identifier -> DocCommentRecord
    pub docs: KeyedStore<E>,
}

pub type Database = XrefDatabase<SqliteEngine>;

fn serial_from_var(value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| XrefError::corrupt(format!("serial out of range: {}", value)))
}

impl<E: KeyValueEngine> XrefDatabase<E> {
    pub fn open(dir: &Path, mode: OpenMode) -> Result<Self> {
        Self::open_with_config(&IndexConfig::new(dir, mode))
    }

    pub fn open_with_config(config: &IndexConfig) -> Result<Self> {
        let dir = config.data_dir.as_path();
        if !dir.is_dir() {
            return Err(XrefError::missing(dir));
        }
        let mode = config.open_mode();
        let options = EngineOptions::from(config);
        let open = |name: &str, kind: ValueKind| -> Result<KeyedStore<E>> {
            let mut store = KeyedStore::open(&dir.join(name), mode, kind, &options)?;
            store.set_sync_on_put(config.sync_on_put);
            Ok(store)
        };

        let db = XrefDatabase {
            dir: dir.to_path_buf(),
            mode,
            vars: open(VARIABLES_DB, ValueKind::Integer)?,
            blob: open(BLOBS_DB, ValueKind::Integer)?,
            hash: open(HASHES_DB, ValueKind::RawBytes)?,
            file: open(FILENAMES_DB, ValueKind::Text)?,
            vers: open(VERSIONS_DB, ValueKind::Paths)?,
            defs: open(DEFINITIONS_DB, ValueKind::Definitions)?,
            refs: open(REFERENCES_DB, ValueKind::References)?,
            docs: open(DOC_COMMENTS_DB, ValueKind::References)?,
        };
        info!(dir = %db.dir.display(), ?mode, "opened cross-reference database");
        Ok(db)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn get_var(&self, name: &str) -> Result<Option<i64>> {
        self.vars.get(name)?.map(StoredValue::into_integer).transpose()
    }

    pub fn set_var(&mut self, name: &str, value: i64) -> Result<()> {
        self.vars.put(name, &StoredValue::Integer(value), false)
    }

    pub fn blob_serial(&self, hash: &[u8]) -> Result<Option<u32>> {
        match self.blob.get(hash)? {
            Some(value) => Ok(Some(serial_from_var(value.into_integer()?)?)),
            None => Ok(None),
        }
    }

    pub fn blob_hash(&self, serial: u32) -> Result<Option<Vec<u8>>> {
        self.hash.get(&serial)?.map(StoredValue::into_raw_bytes).transpose()
    }

    pub fn filename(&self, serial: u32) -> Result<Option<String>> {
        self.file.get(&serial)?.map(StoredValue::into_text).transpose()
    }

    pub fn set_filename(&mut self, serial: u32, filename: &str) -> Result<()> {
        self.file
            .put(&serial, &StoredValue::Text(filename.to_string()), false)
    }

    /// Looks up the serial for a blob, allocating the next one from
    /// `numBlobs` if the content hasn't been seen before.
    pub fn assign_blob(&mut self, hash: &[u8], filename: &str) -> Result<BlobAssignment> {
        if let Some(serial) = self.blob_serial(hash)? {
            return Ok(BlobAssignment::Existing(serial));
        }

        let serial = serial_from_var(self.get_var(NUM_BLOBS_VAR)?.unwrap_or(0))?;
        // Claim the serial before anything refers to it; a crash past this
        // point only wastes it.
        self.set_var(NUM_BLOBS_VAR, i64::from(serial) + 1)?;
        self.hash
            .put(&serial, &StoredValue::RawBytes(hash.to_vec()), false)?;
        self.set_filename(serial, filename)?;
        // The forward mapping goes last since its presence is what marks the
        // blob as known.
        self.blob
            .put(hash, &StoredValue::Integer(i64::from(serial)), false)?;
        debug!(serial, filename, "assigned blob serial");
        Ok(BlobAssignment::New(serial))
    }

    /// Path history for a blob; empty if nothing was recorded.
    pub fn paths(&self, serial: u32) -> Result<PathRecord> {
        match self.vers.get(&serial)? {
            Some(value) => value.into_paths(),
            None => Ok(PathRecord::new()),
        }
    }

    pub fn append_path(&mut self, serial: u32, version: u32, path: &str) -> Result<()> {
        let mut record = self.paths(serial)?;
        record.entries()?;
        record.append(version, path)?;
        self.vers.put(&serial, &StoredValue::Paths(record), false)
    }

    pub fn definitions(&self, ident: &str) -> Result<Option<DefinitionRecord>> {
        self.defs.get(ident)?.map(StoredValue::into_definitions).transpose()
    }

    /// Appends a definition and records its family.  A kind we don't know
    /// leaves the stored record untouched.
    ///
    /// Like the other read-modify-write helpers, this parses the whole stored
    /// record first so that a damaged one is reported rather than extended.
    pub fn add_definition(
        &mut self,
        ident: &str,
        serial: u32,
        kind: &str,
        line: u32,
        family: &str,
    ) -> Result<()> {
        let kind = match DeclKind::from_name(kind) {
            Some(kind) => kind,
            None => {
                warn!(ident, kind, serial, "ignoring definition of unknown kind");
                return Ok(());
            }
        };
        let mut record = self.definitions(ident)?.unwrap_or_default();
        record.entries()?;
        record.append_kind(serial, kind, line, family)?;
        self.defs.put(ident, &StoredValue::Definitions(record), false)
    }

    pub fn references(&self, ident: &str) -> Result<Option<ReferenceRecord>> {
        self.refs.get(ident)?.map(StoredValue::into_references).transpose()
    }

    pub fn add_reference(&mut self, ident: &str, serial: u32, lines: &str, family: &str) -> Result<()> {
        let mut record = self.references(ident)?.unwrap_or_default();
        record.entries()?;
        record.append(serial, lines, family)?;
        self.refs.put(ident, &StoredValue::References(record), false)
    }

    pub fn doc_comments(&self, ident: &str) -> Result<Option<DocCommentRecord>> {
        self.docs.get(ident)?.map(StoredValue::into_references).transpose()
    }

    pub fn add_doc_comment(&mut self, ident: &str, serial: u32, lines: &str, family: &str) -> Result<()> {
        let mut record = self.doc_comments(ident)?.unwrap_or_default();
        record.entries()?;
        record.append(serial, lines, family)?;
        self.docs.put(ident, &StoredValue::References(record), false)
    }

    fn stores_mut(&mut self) -> [&mut KeyedStore<E>; 8] {
        [
            &mut self.vars,
            &mut self.blob,
            &mut self.hash,
            &mut self.file,
            &mut self.vers,
            &mut self.defs,
            &mut self.refs,
            &mut self.docs,
        ]
    }

    pub fn sync_all(&mut self) -> Result<()> {
        for store in self.stores_mut().iter_mut() {
            store.sync()?;
        }
        Ok(())
    }

    /// Closes every store.  All of them are closed even if one fails; the
    /// first failure is reported.
    pub fn close(self) -> Result<()> {
        let dir = self.dir;
        let stores = vec![
            self.vars, self.blob, self.hash, self.file, self.vers, self.defs, self.refs, self.docs,
        ];
        let mut first_err = None;
        for store in stores {
            if let Err(err) = store.close() {
                first_err.get_or_insert(err);
            }
        }
        info!(dir = %dir.display(), "closed cross-reference database");
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
