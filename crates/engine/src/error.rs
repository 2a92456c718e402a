use std::io;

use control::ControlError;
use matching::IndexError;
use thiserror::Error;

use crate::sink::SinkError;

/// Failure anywhere along the apply path.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The control file could not be parsed or was truncated.
    #[error(transparent)]
    Control(#[from] ControlError),
    /// The control header carried parameters the index rejects.
    #[error(transparent)]
    Index(#[from] IndexError),
    /// Reading the seed or the literal source failed.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The transport sink reported a failure; surfaced verbatim.
    #[error(transparent)]
    Sink(#[from] SinkError),
    /// The digest the sink computed over the reconstructed file disagrees
    /// with the control header.
    #[error("reconstructed file checksum {actual} does not match expected {expected}")]
    ChecksumMismatch {
        /// SHA-1 from the control header.
        expected: String,
        /// Digest reported by the sink.
        actual: String,
    },
}
