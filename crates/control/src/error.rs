use std::io;

use thiserror::Error;

/// Failure reading or writing a control file.
#[derive(Debug, Error)]
pub enum ControlError {
    /// The text header is malformed or carries an out-of-range field.
    #[error(transparent)]
    BadHeader(#[from] HeaderError),
    /// The checksum table ended before the declared number of rows.
    #[error("short read on control file: got {got} of {expected} checksum rows")]
    ShortRead {
        /// Rows successfully read before the table ended.
        got: u64,
        /// Rows the header declared.
        expected: u64,
    },
    /// An underlying read or write failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A specific malformed or out-of-range header field.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeaderError {
    /// `Blocksize` is missing a value, not a number, or not a positive power
    /// of two.
    #[error("nonsensical blocksize {value}")]
    Blocksize {
        /// The offending field value.
        value: String,
    },
    /// `Length` is not a number.
    #[error("nonsensical length {value}")]
    Length {
        /// The offending field value.
        value: String,
    },
    /// `Hash-Lengths` is not three comma-separated values within range.
    #[error("nonsensical hash lengths line {value}")]
    HashLengths {
        /// The offending field value.
        value: String,
    },
    /// The SHA-1 field is not 40 hex characters.
    #[error("SHA-1 digest from control file is wrong length")]
    Sha1Digest,
    /// A header tag this version does not understand and the `Safe:` list
    /// does not cover.
    #[error("unrecognised header tag {name}")]
    UnknownTag {
        /// The offending tag name.
        name: String,
    },
    /// A header line without the `": "` separator.
    #[error("malformed header line {line:?}")]
    MalformedLine {
        /// The offending line, end-of-line characters stripped.
        line: String,
    },
    /// The stream ended before the blank line terminating the header.
    #[error("control file ends before the header terminator")]
    UnterminatedHeader,
    /// `Blocksize` or `Length` is absent or zero.
    #[error("not a control file (no Blocksize and Length lines)")]
    MissingFields,
    /// The header carries no SHA-1 digest to verify the transfer against.
    #[error("control file carries no SHA-1 digest")]
    MissingSha1,
}
