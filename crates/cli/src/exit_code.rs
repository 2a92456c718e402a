use control::ControlError;
use engine::EngineError;
use signature::SignatureError;

/// Process exit codes, one per user-visible failure kind.
///
/// There are no partial-success codes: a session either completed, or it
/// failed with exactly one of these.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ExitCode {
    /// Successful completion.
    Ok = 0,
    /// Command-line usage error.
    Syntax = 1,
    /// Malformed or truncated control file.
    Control = 2,
    /// Reading or writing a local file failed.
    FileIo = 3,
    /// The transport sink reported a failure.
    Sink = 4,
    /// The reconstructed file's digest disagreed with the control header.
    Digest = 5,
}

impl ExitCode {
    /// Numeric code handed to the operating system.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub(crate) fn from_engine(err: &EngineError) -> Self {
        match err {
            EngineError::Control(ControlError::Io(_)) | EngineError::Io(_) => Self::FileIo,
            EngineError::Control(_) | EngineError::Index(_) => Self::Control,
            EngineError::Sink(_) => Self::Sink,
            EngineError::ChecksumMismatch { .. } => Self::Digest,
        }
    }

    pub(crate) fn from_signature(err: &SignatureError) -> Self {
        match err {
            SignatureError::Io(_) | SignatureError::Control(ControlError::Io(_)) => Self::FileIo,
            SignatureError::Control(_) => Self::Control,
        }
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        Self::from(code.code())
    }
}
