use serde::Serialize;

use super::serial::{Serial, WithSentinel};
use super::{check_family, parse_serial, TerminatedLines};
use crate::error::{Result, XrefError};

const FIELD_SEP: u8 = b':';

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ReferenceEntry {
    pub serial: u32,
    /// Line numbers in whatever packed form the indexer chose; we never look
    /// inside.
    pub lines: String,
    pub family: String,
}

impl Serial for ReferenceEntry {
    fn serial(&self) -> u32 {
        self.serial
    }
}

/// Where an identifier is used, one `serial:lines:family` line per blob (or
/// per doc comment, for the doc-comment store, which is why several lines may
/// share a serial).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ReferenceRecord {
    data: Vec<u8>,
}

/// Doc comments are stored in exactly the same shape as references.
pub type DocCommentRecord = ReferenceRecord;

impl ReferenceRecord {
    pub fn new() -> Self {
        ReferenceRecord { data: Vec::new() }
    }

    pub fn decode(raw: &[u8]) -> Result<Self> {
        Ok(ReferenceRecord { data: raw.to_vec() })
    }

    pub fn encode(&self) -> Vec<u8> {
        self.data.clone()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn append(&mut self, serial: u32, lines: &str, family: &str) -> Result<()> {
        if lines.bytes().any(|b| b == FIELD_SEP || b == b'\n') {
            return Err(XrefError::bad_input(format!("invalid line list: {:?}", lines)));
        }
        check_family(family)?;
        self.data
            .extend_from_slice(format!("{}:{}:{}\n", serial, lines, family).as_bytes());
        Ok(())
    }

    pub fn iter(&self, include_sentinel: bool) -> WithSentinel<ReferenceTuples<'_>> {
        WithSentinel::new(
            ReferenceTuples {
                lines: TerminatedLines::new(&self.data),
            },
            include_sentinel,
        )
    }

    pub fn entries(&self) -> Result<Vec<ReferenceEntry>> {
        self.iter(false)
            .filter_map(|item| item.map(|i| i.into_item()).transpose())
            .collect()
    }
}

pub struct ReferenceTuples<'a> {
    lines: TerminatedLines<'a>,
}

impl<'a> Iterator for ReferenceTuples<'a> {
    type Item = Result<ReferenceEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.lines.next()?.and_then(parse_reference))
    }
}

fn parse_reference(line: &[u8]) -> Result<ReferenceEntry> {
    let line = std::str::from_utf8(line)?;
    let fields: Vec<&str> = line.split(FIELD_SEP as char).collect();
    match fields.as_slice() {
        [serial, lines, family] => Ok(ReferenceEntry {
            serial: parse_serial(serial.as_bytes())?,
            lines: lines.to_string(),
            family: family.to_string(),
        }),
        _ => Err(XrefError::corrupt(format!("bad reference tuple: {:?}", line))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(serial: u32, lines: &str, family: &str) -> ReferenceEntry {
        ReferenceEntry {
            serial,
            lines: lines.to_string(),
            family: family.to_string(),
        }
    }

    #[test]
    fn test_single_append_encoding() {
        let mut record = ReferenceRecord::new();
        record.append(7, "10,12", "arm").unwrap();
        assert_eq!(record.encode(), b"7:10,12:arm\n".to_vec());
    }

    #[test]
    fn test_round_trip_keeps_append_order() {
        let mut record = DocCommentRecord::new();
        record.append(9, "3", "C").unwrap();
        record.append(2, "40", "K").unwrap();
        record.append(9, "88", "C").unwrap();

        let before = record.encode();
        let decoded = ReferenceRecord::decode(&before).unwrap();
        assert_eq!(
            decoded.entries().unwrap(),
            vec![entry(9, "3", "C"), entry(2, "40", "K"), entry(9, "88", "C")]
        );

        let mut grown = decoded.clone();
        grown.append(10, "1", "C").unwrap();
        assert!(grown.encode().starts_with(&before));
    }

    #[test]
    fn test_sentinel() {
        let mut record = ReferenceRecord::new();
        record.append(5, "1", "C").unwrap();
        let items: Vec<_> = record.iter(true).map(|r| r.unwrap()).collect();
        assert_eq!(items.len(), 2);
        assert!(items[1].serial() > items[0].serial());
        assert!(items[1].is_sentinel());

        let empty: Vec<_> = ReferenceRecord::new().iter(true).map(|r| r.unwrap()).collect();
        assert_eq!(empty.len(), 1);
    }

    #[test]
    fn test_rejects_separators() {
        let mut record = ReferenceRecord::new();
        assert!(record.append(1, "1:2", "C").is_err());
        assert!(record.append(1, "1\n2", "C").is_err());
        assert!(record.append(1, "1", "a:b").is_err());
        assert!(record.is_empty());
    }

    #[test]
    fn test_corrupt_tuples() {
        let record = ReferenceRecord::decode(b"1:2\n").unwrap();
        assert!(matches!(record.entries(), Err(XrefError::Corrupt(_))));

        let record = ReferenceRecord::decode(b"x:2:C\n").unwrap();
        assert!(record.entries().is_err());

        let record = ReferenceRecord::decode(b"1:2:C").unwrap();
        assert!(record.entries().is_err());
    }
}
