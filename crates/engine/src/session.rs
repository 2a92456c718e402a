//! The apply path: control file in, operation transcript out.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek};
use std::path::Path;

use control::ControlFile;
use matching::{BlockIndexBuilder, IndexParams, Matcher};
use tracing::info;

use crate::error::EngineError;
use crate::planner;
use crate::sink::Sink;

/// Summary of a completed apply session.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ApplyOutcome {
    /// Blocks of the target found in the seed.
    pub matched_blocks: u64,
    /// Blocks the target consists of.
    pub total_blocks: u64,
    /// Digest the sink reported for the reconstructed file; already
    /// verified against the control header.
    pub digest: String,
}

/// Runs a full apply session over open streams.
///
/// Parses the control file, builds and populates the block index, streams
/// the seed through the matcher, emits the transcript, and finally verifies
/// the sink's digest against the header SHA-1. A mismatch there is a hard
/// failure regardless of how many operations succeeded.
pub fn apply<C, Sd, L, S>(
    control: &mut C,
    seed: &mut Sd,
    literals: &mut L,
    sink: &mut S,
) -> Result<ApplyOutcome, EngineError>
where
    C: BufRead,
    Sd: Read,
    L: Read + Seek,
    S: Sink,
{
    let ControlFile { header, sums } = ControlFile::read(control)?;
    let params = IndexParams {
        blocksize: header.blocksize,
        seq_matches: header.hash_lengths.seq_matches,
        rsum_bytes: header.hash_lengths.rsum_bytes,
        checksum_bytes: header.hash_lengths.checksum_bytes,
    };

    let mut builder = BlockIndexBuilder::with_capacity(params, sums.len())?;
    for sum in sums {
        builder.add(sum);
    }

    let mut matcher = Matcher::new(builder.build());
    matcher.scan(seed)?;
    let (index, matches) = matcher.finish();
    let matched_blocks = matches.len() as u64;
    let total_blocks = header.nblocks();
    info!(
        matched = matched_blocks,
        total = total_blocks,
        remaining = index.remaining(),
        "seed scan complete"
    );
    drop(index);

    let digest = planner::execute(matches, header.length, literals, sink)?;
    if !digest.eq_ignore_ascii_case(&header.sha1_hex) {
        return Err(EngineError::ChecksumMismatch {
            expected: header.sha1_hex,
            actual: digest,
        });
    }

    Ok(ApplyOutcome {
        matched_blocks,
        total_blocks,
        digest,
    })
}

/// [`apply`] over filesystem paths.
///
/// `literals` is the file literal `add` bytes are read from: the local
/// copy of the target's content the control file was built from.
pub fn apply_paths<S: Sink>(
    control: &Path,
    seed: &Path,
    literals: &Path,
    sink: &mut S,
) -> Result<ApplyOutcome, EngineError> {
    let mut control = BufReader::new(File::open(control)?);
    let mut seed = File::open(seed)?;
    let mut literals = File::open(literals)?;
    apply(&mut control, &mut seed, &mut literals, sink)
}
