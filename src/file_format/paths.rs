use serde::Serialize;

use super::serial::{Serial, WithSentinel};
use super::{parse_serial, TerminatedLines};
use crate::error::{Result, XrefError};

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct PathEntry {
    /// First version at which the blob is known to live at `path`.
    pub version: u32,
    pub path: String,
}

impl Serial for PathEntry {
    fn serial(&self) -> u32 {
        self.version
    }
}

/// Path history of one blob as `version path` lines.  Only the first space
/// separates the fields, so paths may contain spaces.
///
/// Entries must be appended in non-decreasing version order.  That is the
/// caller's job; checking it here would mean re-reading the tail of the record
/// on every append.  `is_ordered` is available for anyone who wants to verify.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PathRecord {
    data: Vec<u8>,
}

impl PathRecord {
    pub fn new() -> Self {
        PathRecord { data: Vec::new() }
    }

    pub fn decode(raw: &[u8]) -> Result<Self> {
        Ok(PathRecord { data: raw.to_vec() })
    }

    pub fn encode(&self) -> Vec<u8> {
        self.data.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn append(&mut self, version: u32, path: &str) -> Result<()> {
        if path.contains('\n') {
            return Err(XrefError::bad_input(format!("newline in path: {:?}", path)));
        }
        self.data.extend_from_slice(version.to_string().as_bytes());
        self.data.push(b' ');
        self.data.extend_from_slice(path.as_bytes());
        self.data.push(b'\n');
        Ok(())
    }

    pub fn iter(&self, include_sentinel: bool) -> WithSentinel<PathTuples<'_>> {
        WithSentinel::new(
            PathTuples {
                lines: TerminatedLines::new(&self.data),
            },
            include_sentinel,
        )
    }

    pub fn entries(&self) -> Result<Vec<PathEntry>> {
        PathTuples {
            lines: TerminatedLines::new(&self.data),
        }
        .collect()
    }

    pub fn is_ordered(&self) -> Result<bool> {
        let entries = self.entries()?;
        Ok(entries.windows(2).all(|pair| pair[0].version <= pair[1].version))
    }

    /// The path the blob had as of `version`, if it existed by then.
    pub fn path_at(&self, version: u32) -> Result<Option<String>> {
        let mut found = None;
        for entry in self.entries()? {
            if entry.version > version {
                break;
            }
            found = Some(entry.path);
        }
        Ok(found)
    }
}

pub struct PathTuples<'a> {
    lines: TerminatedLines<'a>,
}

impl<'a> Iterator for PathTuples<'a> {
    type Item = Result<PathEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.lines.next()? {
                Ok(line) if line.is_empty() => continue,
                Ok(line) => return Some(parse_path(line)),
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

fn parse_path(line: &[u8]) -> Result<PathEntry> {
    let line = std::str::from_utf8(line)?;
    match line.split_once(' ') {
        Some((version, path)) => Ok(PathEntry {
            version: parse_serial(version.as_bytes())?,
            path: path.to_string(),
        }),
        None => Err(XrefError::corrupt(format!("bad path tuple: {:?}", line))),
    }
}
