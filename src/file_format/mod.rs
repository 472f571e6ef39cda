pub mod config;
pub mod definitions;
pub mod paths;
pub mod references;
pub mod serial;

use crate::error::{Result, XrefError};

const NEWLINE: u8 = b'\n';

/// Families end up packed directly against a line number in definition
/// tuples (`42f17x86`), so they must not start with a digit, and they must
/// not contain any of the separators used by the record formats.
pub fn check_family(family: &str) -> Result<()> {
    let mut chars = family.chars();
    let leading_ok = match chars.next() {
        Some(c) => c.is_ascii_alphabetic() || c == '_',
        None => false,
    };
    if !leading_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(XrefError::bad_input(format!("invalid family token: {:?}", family)));
    }
    Ok(())
}

/// Iterates over newline-terminated lines.  A trailing fragment without its
/// newline means the record was truncated, which is reported as corruption.
pub(crate) struct TerminatedLines<'a> {
    rest: &'a [u8],
}

impl<'a> TerminatedLines<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        TerminatedLines { rest: data }
    }
}

impl<'a> Iterator for TerminatedLines<'a> {
    type Item = Result<&'a [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        match self.rest.iter().position(|&b| b == NEWLINE) {
            Some(end) => {
                let line = &self.rest[..end];
                self.rest = &self.rest[end + 1..];
                Some(Ok(line))
            }
            None => {
                let fragment = String::from_utf8_lossy(self.rest).into_owned();
                self.rest = &[];
                Some(Err(XrefError::corrupt(format!(
                    "unterminated line: {:?}",
                    fragment
                ))))
            }
        }
    }
}

pub(crate) fn parse_serial(digits: &[u8]) -> Result<u32> {
    Ok(std::str::from_utf8(digits)?.parse::<u32>()?)
}
