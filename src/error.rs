use std::fmt;
use std::path::{Path, PathBuf};

pub type Result<T> = std::result::Result<T, XrefError>;

/// XrefError payload to provide details about what went wrong for
/// investigation purposes.
#[derive(Debug)]
pub struct ErrorDetails {
    /// Stringified version of the lower level error.
    pub message: String,
    /// The directory or store file involved, when there is one.  Most errors
    /// from the codec layer don't know which file the bytes came from.
    pub path: Option<PathBuf>,
}

impl ErrorDetails {
    pub fn new(message: impl Into<String>) -> Self {
        ErrorDetails {
            message: message.into(),
            path: None,
        }
    }

    pub fn at(message: impl Into<String>, path: &Path) -> Self {
        ErrorDetails {
            message: message.into(),
            path: Some(path.to_path_buf()),
        }
    }
}

/// Errors are split by who is expected to do something about them.  Nothing
/// in this crate retries; a caller that sees `Corrupt` or `Environment` should
/// assume the index needs to be rebuilt or the deployment fixed.
#[derive(Debug)]
pub enum XrefError {
    /// The index directory or a store file that must already exist isn't
    /// there, or the filesystem refused us.
    Environment(ErrorDetails),
    /// Bytes stored under a key don't match the record grammar.  We never
    /// paper over this because it means the index is damaged.
    Corrupt(ErrorDetails),
    /// The caller handed us a value that can't be encoded without producing
    /// bytes that would later decode differently, like a family containing a
    /// separator.
    ///
    /// Note that an unrecognized declaration kind is NOT reported through
    /// here; appending one is silently ignored.
    BadInput(ErrorDetails),
    /// The key/value engine itself failed.
    Engine(ErrorDetails),
    /// A write was attempted against a store opened read-only.
    ReadOnly(ErrorDetails),
}

impl XrefError {
    pub fn corrupt(message: impl Into<String>) -> Self {
        XrefError::Corrupt(ErrorDetails::new(message))
    }

    pub fn bad_input(message: impl Into<String>) -> Self {
        XrefError::BadInput(ErrorDetails::new(message))
    }

    pub fn missing(path: &Path) -> Self {
        XrefError::Environment(ErrorDetails::at("no such file or directory", path))
    }

    pub fn details(&self) -> &ErrorDetails {
        match self {
            XrefError::Environment(d)
            | XrefError::Corrupt(d)
            | XrefError::BadInput(d)
            | XrefError::Engine(d)
            | XrefError::ReadOnly(d) => d,
        }
    }
}

impl fmt::Display for XrefError {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        let kind = match self {
            XrefError::Environment(_) => "environment error",
            XrefError::Corrupt(_) => "corrupt record",
            XrefError::BadInput(_) => "bad input",
            XrefError::Engine(_) => "store engine error",
            XrefError::ReadOnly(_) => "read-only store",
        };
        let details = self.details();
        match &details.path {
            Some(path) => write!(formatter, "{}: {} ({})", kind, details.message, path.display()),
            None => write!(formatter, "{}: {}", kind, details.message),
        }
    }
}

impl std::error::Error for XrefError {}

impl From<std::io::Error> for XrefError {
    fn from(err: std::io::Error) -> XrefError {
        XrefError::Environment(ErrorDetails::new(err.to_string()))
    }
}

impl From<rusqlite::Error> for XrefError {
    fn from(err: rusqlite::Error) -> XrefError {
        XrefError::Engine(ErrorDetails::new(err.to_string()))
    }
}

// A config file that doesn't parse is the deployment's problem, not the index's.
impl From<serde_json::Error> for XrefError {
    fn from(err: serde_json::Error) -> XrefError {
        XrefError::Environment(ErrorDetails::new(format!("bad config: {}", err)))
    }
}

// Numbers only ever get parsed out of stored records.
impl From<std::num::ParseIntError> for XrefError {
    fn from(err: std::num::ParseIntError) -> XrefError {
        XrefError::corrupt(err.to_string())
    }
}

impl From<std::str::Utf8Error> for XrefError {
    fn from(err: std::str::Utf8Error) -> XrefError {
        XrefError::corrupt(err.to_string())
    }
}
