//! Converts confirmed matches into an ordered operation transcript.

use std::collections::BTreeMap;
use std::io::{Read, Seek, SeekFrom};

use matching::MatchSet;
use tracing::debug;

use crate::error::EngineError;
use crate::sink::Sink;

/// Bytes of literal payload handed to the sink per `add` call.
///
/// A gap larger than one chunk becomes several contiguous adds in file
/// order, keeping memory bounded regardless of how much of the target is
/// novel.
pub const LITERAL_CHUNK: usize = 102_400;

/// Drives the sink with the full transcript: `start`, coalesced moves,
/// chunked literal adds, `done`. Returns the digest the sink reported.
///
/// Moves are grouped by displacement (`target - seed` offset) and every
/// maximal run of block-strided matches collapses into a single call,
/// which is the compression win over a per-block operation list. Adds walk the
/// uncovered target gaps in ascending order, reading the bytes from the
/// literal source, so the union of all emitted regions tiles
/// `[0, new_len)` exactly.
pub fn execute<S: Sink, L: Read + Seek>(
    matches: MatchSet,
    new_len: u64,
    literals: &mut L,
    sink: &mut S,
) -> Result<String, EngineError> {
    let blocksize = u64::from(matches.blocksize());
    let mut matches = matches.into_vec();
    matches.sort_unstable_by_key(|m| m.seed_offset);

    sink.start(new_len)?;

    // Runs can only form between matches that share a displacement; the
    // per-displacement offset lists inherit the ascending seed order.
    let mut by_displacement: BTreeMap<i64, Vec<u64>> = BTreeMap::new();
    for m in &matches {
        let to = m.block as u64 * blocksize;
        let displacement = to as i64 - m.seed_offset as i64;
        by_displacement
            .entry(displacement)
            .or_default()
            .push(m.seed_offset);
    }

    let mut moves = 0usize;
    for (&displacement, offsets) in &by_displacement {
        let mut run_start = offsets[0];
        let mut run_blocks = 1u64;
        for &offset in &offsets[1..] {
            if offset == run_start + run_blocks * blocksize {
                run_blocks += 1;
            } else {
                emit_move(sink, run_start, displacement, run_blocks * blocksize)?;
                moves += 1;
                run_start = offset;
                run_blocks = 1;
            }
        }
        emit_move(sink, run_start, displacement, run_blocks * blocksize)?;
        moves += 1;
    }

    let mut targets: Vec<u64> = matches
        .iter()
        .map(|m| m.block as u64 * blocksize)
        .collect();
    targets.sort_unstable();

    let mut adds = 0usize;
    let mut cursor = 0u64;
    let mut buf = vec![0u8; LITERAL_CHUNK];
    for &target in &targets {
        if target > cursor {
            adds += emit_literals(sink, literals, cursor, target, &mut buf)?;
        }
        cursor = target + blocksize;
    }
    if cursor < new_len {
        adds += emit_literals(sink, literals, cursor, new_len, &mut buf)?;
    }

    debug!(moves, adds, matched = targets.len(), "transcript emitted");
    sink.done().map_err(EngineError::from)
}

fn emit_move<S: Sink>(
    sink: &mut S,
    from: u64,
    displacement: i64,
    size: u64,
) -> Result<(), EngineError> {
    let to = (from as i64 + displacement) as u64;
    sink.move_range(from, to, size)?;
    Ok(())
}

/// Streams `[start, end)` of the literal source as contiguous adds.
fn emit_literals<S: Sink, L: Read + Seek>(
    sink: &mut S,
    literals: &mut L,
    start: u64,
    end: u64,
    buf: &mut [u8],
) -> Result<usize, EngineError> {
    literals.seek(SeekFrom::Start(start))?;
    let mut emitted = 0usize;
    let mut offset = start;
    while offset < end {
        let n = usize::try_from(end - offset)
            .unwrap_or(buf.len())
            .min(buf.len());
        literals.read_exact(&mut buf[..n])?;
        sink.add(offset, &buf[..n])?;
        offset += n as u64;
        emitted += 1;
    }
    Ok(emitted)
}
