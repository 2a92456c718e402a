//! End-to-end apply sessions against the in-process reference sink.

use std::io::Cursor;

use checksums::{BlockSum, Sha1};
use control::{ControlFile, ControlHeader, HashLengths};
use engine::{ApplyOutcome, EngineError, MemorySink, Operation, apply};
use rand::RngCore;

const BS: usize = 2048;

fn random(len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut data);
    data
}

fn padded_sums(target: &[u8]) -> Vec<BlockSum> {
    let nblocks = target.len().div_ceil(BS);
    (0..nblocks)
        .map(|id| {
            let mut block = vec![0u8; BS];
            let start = id * BS;
            let end = target.len().min(start + BS);
            block[..end - start].copy_from_slice(&target[start..end]);
            BlockSum::from_block(&block)
        })
        .collect()
}

fn control_bytes(target: &[u8], seq_matches: u8) -> Vec<u8> {
    let mut sha = Sha1::new();
    sha.update(target);
    let file = ControlFile {
        header: ControlHeader {
            version: "0.1.0".to_owned(),
            blocksize: BS as u32,
            length: target.len() as u64,
            hash_lengths: HashLengths {
                seq_matches,
                rsum_bytes: 4,
                checksum_bytes: 16,
            },
            sha1_hex: sha.finalize_hex(),
        },
        sums: padded_sums(target),
    };
    let mut out = Vec::new();
    file.write(&mut out).unwrap();
    out
}

fn run(target: &[u8], seed: &[u8], seq_matches: u8) -> (ApplyOutcome, MemorySink) {
    let control = control_bytes(target, seq_matches);
    let mut sink = MemorySink::new(seed.to_vec());
    let outcome = apply(
        &mut Cursor::new(control),
        &mut &seed[..],
        &mut Cursor::new(target.to_vec()),
        &mut sink,
    )
    .expect("apply session should succeed");
    (outcome, sink)
}

fn moves(sink: &MemorySink) -> Vec<(u64, u64, u64)> {
    sink.operations()
        .iter()
        .filter_map(|op| match op {
            Operation::Move { from, to, size } => Some((*from, *to, *size)),
            _ => None,
        })
        .collect()
}

fn adds(sink: &MemorySink) -> Vec<(u64, Vec<u8>)> {
    sink.operations()
        .iter()
        .filter_map(|op| match op {
            Operation::Add { offset, data } => Some((*offset, data.clone())),
            _ => None,
        })
        .collect()
}

#[test]
fn identical_seed_needs_one_identity_move() {
    // S1: seed == target, two blocks.
    let target = random(2 * BS);
    let (outcome, sink) = run(&target, &target, 2);

    assert_eq!(outcome.matched_blocks, 2);
    assert_eq!(outcome.total_blocks, 2);
    assert_eq!(moves(&sink), vec![(0, 0, 2 * BS as u64)]);
    assert!(adds(&sink).is_empty());
    assert_eq!(sink.reconstructed(), target);
}

#[test]
fn appended_bytes_become_a_single_add() {
    // S2: target is the seed plus "HELLO".
    let mut target = random(BS);
    target.extend_from_slice(b"HELLO");
    let seed = target[..BS].to_vec();
    let (outcome, sink) = run(&target, &seed, 1);

    assert_eq!(outcome.matched_blocks, 1);
    assert_eq!(adds(&sink), vec![(BS as u64, b"HELLO".to_vec())]);
    assert_eq!(sink.reconstructed(), target);
}

#[test]
fn prefixed_seed_yields_a_negative_displacement_move() {
    // S3: seed carries three junk bytes before the target block.
    let target = random(BS);
    let mut seed = b"XYZ".to_vec();
    seed.extend_from_slice(&target);
    let (outcome, sink) = run(&target, &seed, 1);

    assert_eq!(outcome.matched_blocks, 1);
    assert_eq!(moves(&sink), vec![(3, 0, BS as u64)]);
    assert!(adds(&sink).is_empty());
    assert_eq!(sink.reconstructed(), target);
}

#[test]
fn swapped_blocks_move_in_both_directions() {
    // S4: target = A ∥ B, seed = B ∥ A.
    let block_a = random(BS);
    let block_b = random(BS);
    let target = [block_a.clone(), block_b.clone()].concat();
    let seed = [block_b, block_a].concat();
    let (outcome, sink) = run(&target, &seed, 1);

    assert_eq!(outcome.matched_blocks, 2);
    let mut got = moves(&sink);
    got.sort_unstable();
    assert_eq!(
        got,
        vec![(0, BS as u64, BS as u64), (BS as u64, 0, BS as u64)]
    );
    assert!(adds(&sink).is_empty());
    assert_eq!(sink.reconstructed(), target);
}

#[test]
fn round_trip_identity_emits_no_adds() {
    let target = random(5 * BS + 123);
    let (outcome, sink) = run(&target, &target, 2);

    assert_eq!(outcome.matched_blocks, 6);
    assert!(adds(&sink).is_empty());
    assert_eq!(sink.reconstructed(), target);
}

#[test]
fn empty_seed_adds_the_whole_file() {
    let target = random(2 * BS + 77);
    let (outcome, sink) = run(&target, &[], 2);

    assert_eq!(outcome.matched_blocks, 0);
    assert!(moves(&sink).is_empty());
    let adds = adds(&sink);
    assert_eq!(adds.len(), 1);
    assert_eq!(adds[0].0, 0);
    assert_eq!(adds[0].1, target);
    assert_eq!(sink.reconstructed(), target);
}

#[test]
fn same_displacement_run_coalesces_into_one_move() {
    let target = random(6 * BS);
    let mut seed = b"xx".to_vec();
    seed.extend_from_slice(&target);
    let (outcome, sink) = run(&target, &seed, 2);

    assert_eq!(outcome.matched_blocks, 6);
    assert_eq!(moves(&sink), vec![(2, 0, 6 * BS as u64)]);
    assert!(adds(&sink).is_empty());
}

#[test]
fn transcript_is_start_then_moves_then_adds() {
    let mut target = random(3 * BS);
    target.extend_from_slice(b"tail");
    let seed = [&b"junk"[..], &target[..2 * BS]].concat();
    let (_, sink) = run(&target, &seed, 1);

    let ops = sink.operations();
    assert!(matches!(ops[0], Operation::Start { .. }));
    let first_add = ops
        .iter()
        .position(|op| matches!(op, Operation::Add { .. }))
        .expect("novel bytes must be added");
    assert!(
        ops[first_add..]
            .iter()
            .all(|op| matches!(op, Operation::Add { .. })),
        "no move may follow an add"
    );
}

#[test]
fn transcript_tiles_the_target_exactly() {
    // A seed sharing only some blocks, shifted, still yields full coverage
    // of [0, new_len) by moves, adds, and nothing else.
    let target = random(30 * BS + 7);
    let mut seed = Vec::new();
    seed.extend_from_slice(&random(1000));
    seed.extend_from_slice(&target[4 * BS..11 * BS]);
    seed.extend_from_slice(&random(500));
    seed.extend_from_slice(&target[20 * BS..27 * BS]);
    let (_, sink) = run(&target, &seed, 1);

    let new_len = target.len() as u64;
    let mut intervals: Vec<(u64, u64)> = sink
        .operations()
        .iter()
        .filter_map(|op| match op {
            Operation::Move { to, size, .. } => {
                Some((*to, (*to + *size).min(new_len)))
            }
            Operation::Add { offset, data } => {
                Some((*offset, offset + data.len() as u64))
            }
            Operation::Start { .. } => None,
        })
        .collect();
    intervals.sort_unstable();

    let mut cursor = 0u64;
    for (start, end) in intervals {
        assert_eq!(start, cursor, "coverage gap or overlap at {start}");
        cursor = end;
    }
    assert_eq!(cursor, new_len);
    assert_eq!(sink.reconstructed(), target);
}

#[test]
fn digest_mismatch_is_a_hard_failure() {
    let target = random(BS);
    // Corrupt one hex digit of the header SHA-1.
    let raw = control_bytes(&target, 1);
    let mut patched = raw.clone();
    let pos = raw
        .windows(7)
        .position(|w| w == b"SHA-1: ")
        .expect("header carries a SHA-1 line");
    patched[pos + 7] = if raw[pos + 7] == b'a' { b'b' } else { b'a' };

    let mut sink = MemorySink::new(target.clone());
    let err = apply(
        &mut Cursor::new(patched),
        &mut &target[..],
        &mut Cursor::new(target.clone()),
        &mut sink,
    )
    .unwrap_err();
    assert!(matches!(err, EngineError::ChecksumMismatch { .. }));
}

#[test]
fn truncated_literal_source_is_an_io_error() {
    let mut target = random(BS);
    target.extend_from_slice(b"HELLO");
    let seed = target[..BS].to_vec();
    let control = control_bytes(&target, 1);

    let mut sink = MemorySink::new(seed.clone());
    // The literal source is missing the appended tail the planner must read.
    let err = apply(
        &mut Cursor::new(control),
        &mut &seed[..],
        &mut Cursor::new(seed.clone()),
        &mut sink,
    )
    .unwrap_err();
    assert!(matches!(err, EngineError::Io(_)));
}
