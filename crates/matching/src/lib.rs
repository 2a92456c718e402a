#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `matching` is the byte-level heart of the delta-transfer engine: an
//! in-memory index of the target's per-block checksums, and a matcher that
//! slides a window over the seed file one offset at a time, probing the
//! index at every position.
//!
//! # Design
//!
//! - [`BlockIndex`] holds one descriptor per target block in an arena,
//!   chained through `u32` links into buckets keyed by a hash of the weak
//!   checksums. A bit filter in front of the buckets makes the common
//!   "no match" case a single bit test, which matters because it runs once
//!   per seed byte. Matched blocks are unlinked so no block matches twice.
//! - [`Matcher`] streams the seed through a 16-block buffer with
//!   `blocksize * seq_matches` bytes of carry-over, keeps the rolling
//!   checksums incrementally up to date, verifies candidates with MD4, and
//!   records every confirmed match as a `(seed_offset, block_id)` pair.
//!
//! # Invariants
//!
//! - [`BlockIndex`] chains are ordered by ascending block id, so the
//!   earliest target block wins when the same seed bytes could satisfy
//!   several blocks.
//! - After matching, the number of removed descriptors equals the number of
//!   recorded matches, and no block id appears twice.

mod index;
mod matcher;

pub use index::{BlockIndex, BlockIndexBuilder, IndexError, IndexParams};
pub use matcher::{Match, MatchSet, Matcher};
