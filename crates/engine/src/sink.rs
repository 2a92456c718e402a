//! The transcript consumer interface and an in-process reference sink.

use checksums::Sha1;
use thiserror::Error;

/// Consumer of the planner's operation transcript.
///
/// The planner calls `start` exactly once, then every `move_range`, then
/// every `add` in target order, then `done`. Each call must complete before
/// the next is issued; the sink owns its own retries and backoff.
pub trait Sink {
    /// Announces the size of the file about to be reconstructed.
    fn start(&mut self, size: u64) -> Result<(), SinkError>;

    /// Declares that seed region `[from, from + size)` holds the bytes of
    /// target region `[to, to + size)`.
    fn move_range(&mut self, from: u64, to: u64, size: u64) -> Result<(), SinkError>;

    /// Supplies literal target bytes starting at `offset`.
    fn add(&mut self, offset: u64, data: &[u8]) -> Result<(), SinkError>;

    /// Finishes the transfer; returns the sink's digest of the
    /// reconstructed file. The engine compares it against the control
    /// header but also hands the raw string back to the caller.
    fn done(&mut self) -> Result<String, SinkError>;
}

/// Failure reported by a [`Sink`] implementation.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The sink understood the operation and refused it.
    #[error("sink rejected {operation}: {detail}")]
    Rejected {
        /// Which of the four operations failed.
        operation: &'static str,
        /// Sink-provided detail, e.g. an HTTP status line.
        detail: String,
    },
    /// The operation never reached the sink.
    #[error("sink transport failed during {operation}: {source}")]
    Transport {
        /// Which of the four operations failed.
        operation: &'static str,
        /// The underlying transport error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// One recorded sink call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Operation {
    /// `start(size)`.
    Start {
        /// Declared reconstruction size.
        size: u64,
    },
    /// `move_range(from, to, size)`.
    Move {
        /// Source offset in the seed.
        from: u64,
        /// Destination offset in the target.
        to: u64,
        /// Region length in bytes.
        size: u64,
    },
    /// `add(offset, data)`.
    Add {
        /// Destination offset in the target.
        offset: u64,
        /// Literal bytes.
        data: Vec<u8>,
    },
}

/// In-process sink that reconstructs the target from a seed buffer.
///
/// Behaves like the reference server: `start` allocates the output at the
/// declared size, moves copy from the (zero-extended) seed, writes past the
/// declared size are truncated, and `done` reports the SHA-1 of the result.
/// Every call is recorded for inspection.
#[derive(Debug, Default)]
pub struct MemorySink {
    seed: Vec<u8>,
    out: Vec<u8>,
    ops: Vec<Operation>,
    started: bool,
}

impl MemorySink {
    /// Creates a sink holding its own copy of the seed, the file moves are
    /// served from.
    #[must_use]
    pub fn new(seed: Vec<u8>) -> Self {
        Self {
            seed,
            out: Vec::new(),
            ops: Vec::new(),
            started: false,
        }
    }

    /// Every call received so far, in order.
    #[must_use]
    pub fn operations(&self) -> &[Operation] {
        &self.ops
    }

    /// The reconstructed bytes.
    #[must_use]
    pub fn reconstructed(&self) -> &[u8] {
        &self.out
    }
}

impl Sink for MemorySink {
    fn start(&mut self, size: u64) -> Result<(), SinkError> {
        if self.started {
            return Err(SinkError::Rejected {
                operation: "start",
                detail: "transfer already started".to_owned(),
            });
        }
        self.started = true;
        self.out = vec![0u8; usize::try_from(size).map_err(|_| SinkError::Rejected {
            operation: "start",
            detail: format!("size {size} exceeds addressable memory"),
        })?];
        self.ops.push(Operation::Start { size });
        Ok(())
    }

    fn move_range(&mut self, from: u64, to: u64, size: u64) -> Result<(), SinkError> {
        self.ops.push(Operation::Move { from, to, size });
        let out_len = self.out.len() as u64;
        if to >= out_len {
            return Ok(());
        }
        let size = size.min(out_len - to);
        let dest = &mut self.out[to as usize..(to + size) as usize];
        let available = self.seed.len() as u64;
        let copied = available.saturating_sub(from).min(size) as usize;
        if copied > 0 {
            let from = from as usize;
            dest[..copied].copy_from_slice(&self.seed[from..from + copied]);
        }
        dest[copied..].fill(0);
        Ok(())
    }

    fn add(&mut self, offset: u64, data: &[u8]) -> Result<(), SinkError> {
        self.ops.push(Operation::Add {
            offset,
            data: data.to_vec(),
        });
        let out_len = self.out.len() as u64;
        if offset >= out_len {
            return Ok(());
        }
        let len = (data.len() as u64).min(out_len - offset) as usize;
        self.out[offset as usize..offset as usize + len].copy_from_slice(&data[..len]);
        Ok(())
    }

    fn done(&mut self) -> Result<String, SinkError> {
        let mut sha = Sha1::new();
        sha.update(&self.out);
        Ok(sha.finalize_hex())
    }
}
