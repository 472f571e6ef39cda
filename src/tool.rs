//! Option parsing and command execution for `xref-tool`.  Everything is
//! opened read-only.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use itertools::Itertools;
use serde::Serialize;
use serde_json::{json, to_string, to_string_pretty, Value};

use crate::error::{ErrorDetails, Result, XrefError};
use crate::file_format::config::{self, IndexConfig};
use crate::store::OpenMode;
use crate::Database;

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON.
    Pretty,
    /// Un-pretty-printed JSON.
    Concise,
}

/// Inspect a cross-reference index directory.  Everything is opened
/// read-only.
#[derive(Debug, Parser)]
#[command(name = "xref-tool", version, about)]
pub struct ToolOpts {
    /// JSON config file describing the index; takes precedence over
    /// `--data-dir`.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory holding the index stores.
    #[arg(long, env = "XREF_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[arg(long, short, value_enum, ignore_case = true, default_value = "concise")]
    pub output_format: OutputFormat,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Definitions of an identifier and the families it is defined in.
    Defs { ident: String },
    /// References to an identifier.
    Refs { ident: String },
    /// Doc comments for an identifier.
    Docs { ident: String },
    /// Path history of a blob.
    Versions { serial: u32 },
    /// Serial of the blob with the given hex-encoded content hash.
    Blob { hash: String },
    /// Hex-encoded content hash of a blob.
    Hash { serial: u32 },
    /// Current filename of a blob.
    File { serial: u32 },
    /// Integer variable.
    Var { name: String },
}

pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).join("")
}

pub fn from_hex(hex: &str) -> Result<Vec<u8>> {
    let bad_hex = || XrefError::bad_input(format!("not a hex string: {}", hex));
    if hex.len() % 2 != 0 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(bad_hex());
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| bad_hex()))
        .collect()
}

fn as_json<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|err| {
        XrefError::Environment(ErrorDetails::new(format!("can't render JSON: {}", err)))
    })
}

/// Resolves which index to open.  `--config` wins over `--data-dir`, and the
/// result is always read-only whatever the config file says.
pub fn index_config(opts: &ToolOpts) -> Result<IndexConfig> {
    let index_config = match (&opts.config, &opts.data_dir) {
        (Some(path), _) => config::load(path)?,
        (None, Some(dir)) => IndexConfig::new(dir, OpenMode::ReadOnly),
        (None, None) => {
            return Err(XrefError::bad_input("one of --config or --data-dir is required"))
        }
    };
    Ok(IndexConfig {
        read_only: true,
        ..index_config
    })
}

/// Runs one command.  Keys that aren't in the index come back as `null`.
pub fn run(opts: &ToolOpts) -> Result<Value> {
    let db = Database::open_with_config(&index_config(opts)?)?;

    let result = match &opts.cmd {
        Command::Defs { ident } => match db.definitions(ident)? {
            Some(record) => json!({
                "definitions": as_json(&record.entries()?)?,
                "families": record.families()?,
            }),
            None => Value::Null,
        },
        Command::Refs { ident } => match db.references(ident)? {
            Some(record) => as_json(&record.entries()?)?,
            None => Value::Null,
        },
        Command::Docs { ident } => match db.doc_comments(ident)? {
            Some(record) => as_json(&record.entries()?)?,
            None => Value::Null,
        },
        Command::Versions { serial } => as_json(&db.paths(*serial)?.entries()?)?,
        Command::Blob { hash } => as_json(&db.blob_serial(&from_hex(hash)?)?)?,
        Command::Hash { serial } => as_json(&db.blob_hash(*serial)?.map(|h| to_hex(&h)))?,
        Command::File { serial } => as_json(&db.filename(*serial)?)?,
        Command::Var { name } => as_json(&db.get_var(name)?)?,
    };

    db.close()?;
    Ok(result)
}

pub fn render(value: &Value, format: OutputFormat) -> Result<String> {
    let rendered = match format {
        OutputFormat::Concise => to_string(value),
        OutputFormat::Pretty => to_string_pretty(value),
    };
    rendered.map_err(|err| {
        XrefError::Environment(ErrorDetails::new(format!("can't render JSON: {}", err)))
    })
}
