//! Error types for package inspection and writing.

use thiserror::Error;
use zip::result::ZipError;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Container-level failures.
///
/// Missing or unparsable metadata fields are never reported through this
/// type; the inspectors return `None`/`0`/`false` for those instead.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The source could not be read or the destination could not be written.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The bytes are not a readable ZIP container.
    #[error("Malformed archive: {0}")]
    MalformedArchive(#[source] ZipError),

    /// XML could not be parsed where a well-formed part is required.
    #[error("XML parsing error: {0}")]
    ParseError(String),

    /// A part required to load a workbook is missing.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// A cell reference could not be parsed.
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("Sheet '{0}' not found")]
    SheetNotFound(String),
}

impl From<ZipError> for CodecError {
    fn from(err: ZipError) -> Self {
        match err {
            ZipError::Io(e) => CodecError::Io(e),
            other => CodecError::MalformedArchive(other),
        }
    }
}

impl CodecError {
    /// True when the failure means the container itself could not be opened.
    pub fn is_malformed_archive(&self) -> bool {
        matches!(self, CodecError::MalformedArchive(_))
    }
}
