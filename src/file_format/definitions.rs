use std::fmt;

use regex::bytes::Regex;
use serde::{Deserialize, Serialize};

use super::check_family;
use super::parse_serial;
use super::serial::{Serial, WithSentinel};
use crate::error::{Result, XrefError};

const LIST_SEP: u8 = b',';
const SECTION_SEP: u8 = b'#';

lazy_static! {
    // serial, one kind letter, line, family token.  Family tokens can't start
    // with a digit (see `check_family`) which is what keeps this unambiguous.
    static ref DEF_TUPLE_RE: Regex =
        Regex::new(r"^([0-9]+)([A-Za-z])([0-9]+)([A-Za-z_][A-Za-z0-9_]*)$").unwrap();
}

/// What kind of declaration a definition tuple records.  Each kind is stored
/// as a single letter.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclKind {
    Config,
    Define,
    Enum,
    Enumerator,
    Function,
    Label,
    Macro,
    Member,
    Prototype,
    Struct,
    Typedef,
    Union,
    Variable,
    Externvar,
}

impl DeclKind {
    pub const ALL: [DeclKind; 14] = [
        DeclKind::Config,
        DeclKind::Define,
        DeclKind::Enum,
        DeclKind::Enumerator,
        DeclKind::Function,
        DeclKind::Label,
        DeclKind::Macro,
        DeclKind::Member,
        DeclKind::Prototype,
        DeclKind::Struct,
        DeclKind::Typedef,
        DeclKind::Union,
        DeclKind::Variable,
        DeclKind::Externvar,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DeclKind::Config => "config",
            DeclKind::Define => "define",
            DeclKind::Enum => "enum",
            DeclKind::Enumerator => "enumerator",
            DeclKind::Function => "function",
            DeclKind::Label => "label",
            DeclKind::Macro => "macro",
            DeclKind::Member => "member",
            DeclKind::Prototype => "prototype",
            DeclKind::Struct => "struct",
            DeclKind::Typedef => "typedef",
            DeclKind::Union => "union",
            DeclKind::Variable => "variable",
            DeclKind::Externvar => "externvar",
        }
    }

    /// The on-disk letter.  Note the case-sensitive pairs: `e`num vs
    /// `E`numerator and `m`ember vs `M`acro.
    pub fn tag(self) -> u8 {
        match self {
            DeclKind::Config => b'c',
            DeclKind::Define => b'd',
            DeclKind::Enum => b'e',
            DeclKind::Enumerator => b'E',
            DeclKind::Function => b'f',
            DeclKind::Label => b'l',
            DeclKind::Macro => b'M',
            DeclKind::Member => b'm',
            DeclKind::Prototype => b'p',
            DeclKind::Struct => b's',
            DeclKind::Typedef => b't',
            DeclKind::Union => b'u',
            DeclKind::Variable => b'v',
            DeclKind::Externvar => b'x',
        }
    }

    pub fn from_name(name: &str) -> Option<DeclKind> {
        DeclKind::ALL.iter().copied().find(|kind| kind.name() == name)
    }

    pub fn from_tag(tag: u8) -> Option<DeclKind> {
        DeclKind::ALL.iter().copied().find(|kind| kind.tag() == tag)
    }
}

impl fmt::Display for DeclKind {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str(self.name())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct DefinitionEntry {
    pub serial: u32,
    pub kind: DeclKind,
    pub line: u32,
    pub family: String,
}

impl Serial for DefinitionEntry {
    fn serial(&self) -> u32 {
        self.serial
    }
}

/// Every definition of one identifier, plus the set of families it is
/// defined in at all.
///
/// The encoding is `t1,t2,...,tn#f1,f2,...,fm`.  Both halves are kept as the
/// raw bytes they will be written out as, so appending never touches earlier
/// tuples; `encode` just glues the halves back together.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DefinitionRecord {
    data: Vec<u8>,
    families: Vec<u8>,
}

impl Default for DefinitionRecord {
    fn default() -> Self {
        DefinitionRecord::new()
    }
}

impl DefinitionRecord {
    pub fn new() -> Self {
        DefinitionRecord {
            data: Vec::new(),
            families: Vec::new(),
        }
    }

    /// Splits the stored bytes into their tuple and family halves.  Family
    /// tokens are checked here; the tuples are only checked as they are
    /// iterated.
    pub fn decode(raw: &[u8]) -> Result<Self> {
        let mut halves = raw.splitn(2, |&b| b == SECTION_SEP);
        let data = halves.next().unwrap_or_default();
        let families = match halves.next() {
            Some(families) => families,
            None => return Err(XrefError::corrupt("definition record without '#'")),
        };
        if families.contains(&SECTION_SEP) {
            return Err(XrefError::corrupt("definition record with more than one '#'"));
        }
        if !families.is_empty() {
            for family in families.split(|&b| b == LIST_SEP) {
                let valid = std::str::from_utf8(family)
                    .ok()
                    .map_or(false, |f| check_family(f).is_ok());
                if !valid {
                    return Err(XrefError::corrupt(format!(
                        "bad family token: {:?}",
                        String::from_utf8_lossy(family)
                    )));
                }
            }
        }
        Ok(DefinitionRecord {
            data: data.to_vec(),
            families: families.to_vec(),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len() + 1 + self.families.len());
        out.extend_from_slice(&self.data);
        out.push(SECTION_SEP);
        out.extend_from_slice(&self.families);
        out
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Appends a tuple naming its kind the way indexers spell it
    /// ("function", "macro", ...).  Kinds we don't know are dropped without an
    /// error so that indexers and readers of different vintages can coexist.
    pub fn append(&mut self, serial: u32, kind: &str, line: u32, family: &str) -> Result<()> {
        match DeclKind::from_name(kind) {
            Some(kind) => self.append_kind(serial, kind, line, family),
            None => {
                warn!(kind, serial, line, "ignoring definition of unknown kind");
                Ok(())
            }
        }
    }

    pub fn append_kind(&mut self, serial: u32, kind: DeclKind, line: u32, family: &str) -> Result<()> {
        check_family(family)?;
        if !self.data.is_empty() {
            self.data.push(LIST_SEP);
        }
        self.data.extend_from_slice(serial.to_string().as_bytes());
        self.data.push(kind.tag());
        self.data.extend_from_slice(line.to_string().as_bytes());
        self.data.extend_from_slice(family.as_bytes());
        self.add_family(family)
    }

    /// Records that the identifier is defined in `family`.  Appending a tuple
    /// already does this; adding a family that is present is a no-op.
    pub fn add_family(&mut self, family: &str) -> Result<()> {
        check_family(family)?;
        if self.has_family(family) {
            return Ok(());
        }
        if !self.families.is_empty() {
            self.families.push(LIST_SEP);
        }
        self.families.extend_from_slice(family.as_bytes());
        Ok(())
    }

    pub fn has_family(&self, family: &str) -> bool {
        !self.families.is_empty()
            && self
                .families
                .split(|&b| b == LIST_SEP)
                .any(|f| f == family.as_bytes())
    }

    /// Families in the order they were first added.
    pub fn families(&self) -> Result<Vec<&str>> {
        if self.families.is_empty() {
            return Ok(vec![]);
        }
        self.families
            .split(|&b| b == LIST_SEP)
            .map(|f| std::str::from_utf8(f).map_err(XrefError::from))
            .collect()
    }

    pub fn iter(&self, include_sentinel: bool) -> WithSentinel<DefinitionTuples<'_>> {
        WithSentinel::new(DefinitionTuples::new(&self.data), include_sentinel)
    }

    pub fn entries(&self) -> Result<Vec<DefinitionEntry>> {
        DefinitionTuples::new(&self.data).collect()
    }
}

pub struct DefinitionTuples<'a> {
    rest: Option<&'a [u8]>,
}

impl<'a> DefinitionTuples<'a> {
    fn new(data: &'a [u8]) -> Self {
        DefinitionTuples {
            rest: if data.is_empty() { None } else { Some(data) },
        }
    }
}

impl<'a> Iterator for DefinitionTuples<'a> {
    type Item = Result<DefinitionEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.rest?;
        let piece = match rest.iter().position(|&b| b == LIST_SEP) {
            Some(sep) => {
                self.rest = Some(&rest[sep + 1..]);
                &rest[..sep]
            }
            None => {
                self.rest = None;
                rest
            }
        };
        Some(parse_definition(piece))
    }
}

fn parse_definition(piece: &[u8]) -> Result<DefinitionEntry> {
    let bad_tuple =
        || XrefError::corrupt(format!("bad definition tuple: {:?}", String::from_utf8_lossy(piece)));
    let caps = DEF_TUPLE_RE.captures(piece).ok_or_else(bad_tuple)?;
    let kind = DeclKind::from_tag(caps[2][0]).ok_or_else(bad_tuple)?;
    Ok(DefinitionEntry {
        serial: parse_serial(&caps[1])?,
        kind,
        line: parse_serial(&caps[3])?,
        family: std::str::from_utf8(&caps[4])?.to_string(),
    })
}
