//! On-disk storage for a source cross-referencer: for every identifier, where
//! it is defined and where it is referenced across a corpus of source blobs,
//! plus the path history of each blob.
//!
//! - [`file_format`] holds the compact record encodings.  They are append-only
//!   at the byte level so that incremental indexing never rewrites old data.
//! - [`store`] binds an ordered key/value file to one kind of record.
//! - [`xref_db`] opens the eight stores that make up an index directory.
//! - [`tool`] is the read-only inspection command line.

#[macro_use]
extern crate lazy_static;
extern crate regex;
extern crate rusqlite;
extern crate serde;
extern crate serde_json;
#[macro_use]
extern crate tracing;
extern crate tracing_subscriber;

pub mod error;
pub mod file_format;
pub mod logging;
pub mod store;
pub mod tool;
pub mod xref_db;

pub use error::{Result, XrefError};
pub use xref_db::{Database, XrefDatabase};
