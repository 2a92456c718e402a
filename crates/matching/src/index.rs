use checksums::{BlockSum, Md4, Rsum, RsumError, RsumMasks};
use thiserror::Error;

/// Chain terminator inside the descriptor arena.
const NONE: u32 = u32::MAX;

/// Parameters the index and the matcher share, taken from a control-file
/// header.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IndexParams {
    /// Block size in bytes; a positive power of two.
    pub blocksize: u32,
    /// Consecutive blocks required for context-free acceptance (1 or 2).
    pub seq_matches: u8,
    /// Stored rsum width in bytes (1..=4).
    pub rsum_bytes: u8,
    /// Stored MD4 prefix width in bytes (3..=16).
    pub checksum_bytes: u8,
}

impl IndexParams {
    /// `log2` of the block size.
    #[must_use]
    pub const fn blockshift(&self) -> u32 {
        self.blocksize.trailing_zeros()
    }

    /// Carry-over the matcher needs so an adjacency probe at the end of one
    /// buffer can read into the next block.
    #[must_use]
    pub const fn context(&self) -> usize {
        self.blocksize as usize * self.seq_matches as usize
    }

    fn validate(&self) -> Result<RsumMasks, IndexError> {
        if self.blocksize == 0 || !self.blocksize.is_power_of_two() {
            return Err(IndexError::Blocksize {
                blocksize: self.blocksize,
            });
        }
        if !(1..=2).contains(&self.seq_matches) {
            return Err(IndexError::SeqMatches {
                seq_matches: self.seq_matches,
            });
        }
        if !(3..=16).contains(&self.checksum_bytes) {
            return Err(IndexError::ChecksumWidth {
                width: self.checksum_bytes,
            });
        }
        Ok(RsumMasks::for_width(self.rsum_bytes)?)
    }
}

/// Rejected index parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    /// Block size is zero or not a power of two.
    #[error("nonsensical blocksize {blocksize}")]
    Blocksize {
        /// The offending block size.
        blocksize: u32,
    },
    /// Stored rsum width outside `1..=4`.
    #[error(transparent)]
    RsumWidth(#[from] RsumError),
    /// Stored MD4 prefix width outside `3..=16`.
    #[error("checksum width of {width} bytes is outside 3..=16")]
    ChecksumWidth {
        /// The offending width.
        width: u8,
    },
    /// Consecutive-match requirement outside `1..=2`.
    #[error("sequential match requirement {seq_matches} is outside 1..=2")]
    SeqMatches {
        /// The offending value.
        seq_matches: u8,
    },
}

/// Collects block descriptors in id order, then freezes them into a
/// [`BlockIndex`].
///
/// Splitting construction from lookup guarantees the hash tables are built
/// exactly once, after every block has been added and before any probe.
#[derive(Debug)]
pub struct BlockIndexBuilder {
    params: IndexParams,
    masks: RsumMasks,
    sums: Vec<BlockSum>,
}

impl BlockIndexBuilder {
    /// Creates a builder after validating `params`.
    pub fn new(params: IndexParams) -> Result<Self, IndexError> {
        let masks = params.validate()?;
        Ok(Self {
            params,
            masks,
            sums: Vec::new(),
        })
    }

    /// Creates a builder with room for `nblocks` descriptors.
    pub fn with_capacity(params: IndexParams, nblocks: usize) -> Result<Self, IndexError> {
        let mut builder = Self::new(params)?;
        builder.sums.reserve(nblocks + params.seq_matches as usize);
        Ok(builder)
    }

    /// Appends the descriptor of the next block, truncating both checksums
    /// to their stored widths so lookups compare like with like.
    pub fn add(&mut self, sum: BlockSum) {
        let mut strong = sum.strong;
        for byte in &mut strong[usize::from(self.params.checksum_bytes)..] {
            *byte = 0;
        }
        self.sums.push(BlockSum {
            rsum: sum.rsum.truncated(self.masks),
            strong,
        });
    }

    /// Freezes the descriptors, appends the tail sentinels, and populates
    /// the hash tables.
    #[must_use]
    pub fn build(self) -> BlockIndex {
        let Self {
            params,
            masks,
            mut sums,
        } = self;
        let nblocks = sums.len() as u32;

        // The sentinels stand in for the blocks past end-of-target during
        // adjacency checks and key derivation. The target is zero-padded to
        // a whole block everywhere else, so the virtual successor blocks are
        // zero-filled too.
        let mut sentinel_strong = Md4::digest(&vec![0u8; params.blocksize as usize]);
        for byte in &mut sentinel_strong[usize::from(params.checksum_bytes)..] {
            *byte = 0;
        }
        for _ in 0..params.seq_matches {
            sums.push(BlockSum {
                rsum: Rsum { a: 0, b: 0 },
                strong: sentinel_strong,
            });
        }

        // Size both tables so the average chain length stays near one.
        let mut bits = 16u32;
        while (1u32 << bits) > nblocks.max(1) && bits > 4 {
            bits -= 1;
        }
        let hashmask = (1u32 << (bits + 1).min(16)) - 1;
        let bithashmask = (1u32 << (bits + 4).min(16)) - 1;

        let mut index = BlockIndex {
            params,
            masks,
            sums,
            nblocks,
            next: vec![NONE; nblocks as usize],
            heads: vec![NONE; hashmask as usize + 1],
            bithash: vec![0u8; bithashmask as usize / 8 + 1],
            hashmask,
            bithashmask,
            remaining: nblocks,
        };

        // Insert in reverse so every chain lists block ids in ascending
        // order: the earliest target block wins ties.
        for id in (0..nblocks).rev() {
            let key = index.key_of(id);
            let slot = (key & index.hashmask) as usize;
            index.next[id as usize] = index.heads[slot];
            index.heads[slot] = id;
            let bit = key & index.bithashmask;
            index.bithash[(bit >> 3) as usize] |= 1u8 << (bit & 7);
        }
        index
    }
}

/// Hash-indexed descriptors of every not-yet-matched target block.
#[derive(Debug)]
pub struct BlockIndex {
    params: IndexParams,
    masks: RsumMasks,
    /// `nblocks + seq_matches` entries; the tail entries are sentinels.
    sums: Vec<BlockSum>,
    nblocks: u32,
    next: Vec<u32>,
    heads: Vec<u32>,
    bithash: Vec<u8>,
    hashmask: u32,
    bithashmask: u32,
    remaining: u32,
}

impl BlockIndex {
    /// The parameters the index was built with.
    #[must_use]
    pub const fn params(&self) -> IndexParams {
        self.params
    }

    /// Truncation masks for comparing live rsums against stored ones.
    #[must_use]
    pub const fn masks(&self) -> RsumMasks {
        self.masks
    }

    /// Number of real (non-sentinel) blocks.
    #[must_use]
    pub const fn nblocks(&self) -> u32 {
        self.nblocks
    }

    /// Blocks still linked into the hash tables.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Stored descriptor for `id`; sentinel ids
    /// (`nblocks..nblocks + seq_matches`) are valid arguments.
    #[must_use]
    pub fn sum(&self, id: u32) -> &BlockSum {
        &self.sums[id as usize]
    }

    /// First candidate block for the window checksums, or `None`.
    ///
    /// A clear filter bit answers without touching the chain table.
    #[must_use]
    pub fn probe(&self, r0: Rsum, r1: Rsum) -> Option<u32> {
        let key = self.live_key(r0, r1);
        let bit = key & self.bithashmask;
        if self.bithash[(bit >> 3) as usize] & (1u8 << (bit & 7)) == 0 {
            return None;
        }
        let head = self.heads[(key & self.hashmask) as usize];
        (head != NONE).then_some(head)
    }

    /// Next candidate on the same chain.
    #[must_use]
    pub fn next_in_chain(&self, id: u32) -> Option<u32> {
        let next = self.next[id as usize];
        (next != NONE).then_some(next)
    }

    /// Unlinks a matched block so it cannot match again; clears its filter
    /// bit when its chain empties. Returns whether the block was present.
    pub fn remove(&mut self, id: u32) -> bool {
        let key = self.key_of(id);
        let slot = (key & self.hashmask) as usize;

        let mut cursor = self.heads[slot];
        let mut prev = NONE;
        while cursor != NONE {
            if cursor == id {
                if prev == NONE {
                    self.heads[slot] = self.next[id as usize];
                } else {
                    self.next[prev as usize] = self.next[id as usize];
                }
                self.next[id as usize] = NONE;
                if self.heads[slot] == NONE {
                    let bit = key & self.bithashmask;
                    self.bithash[(bit >> 3) as usize] &= !(1u8 << (bit & 7));
                }
                self.remaining -= 1;
                return true;
            }
            prev = cursor;
            cursor = self.next[cursor as usize];
        }
        false
    }

    /// Key of a stored descriptor, from the truncated `b` halves.
    fn key_of(&self, id: u32) -> u32 {
        let b0 = self.sums[id as usize].rsum.b;
        let b1 = if self.params.seq_matches > 1 {
            self.sums[id as usize + 1].rsum.b
        } else {
            0
        };
        u32::from(b0 ^ b1)
    }

    /// Key of a live window, truncated the same way as stored descriptors.
    fn live_key(&self, r0: Rsum, r1: Rsum) -> u32 {
        let b0 = r0.b & self.masks.b;
        let b1 = if self.params.seq_matches > 1 {
            r1.b & self.masks.b
        } else {
            0
        };
        u32::from(b0 ^ b1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(seq_matches: u8) -> IndexParams {
        IndexParams {
            blocksize: 16,
            seq_matches,
            rsum_bytes: 4,
            checksum_bytes: 16,
        }
    }

    fn block(fill: u8) -> [u8; 16] {
        [fill; 16]
    }

    fn build(seq_matches: u8, blocks: &[[u8; 16]]) -> BlockIndex {
        let mut builder = BlockIndexBuilder::new(params(seq_matches)).unwrap();
        for data in blocks {
            builder.add(BlockSum::from_block(data));
        }
        builder.build()
    }

    #[test]
    fn rejects_bad_parameters() {
        let bad = IndexParams {
            blocksize: 3,
            ..params(1)
        };
        assert_eq!(
            BlockIndexBuilder::new(bad).unwrap_err(),
            IndexError::Blocksize { blocksize: 3 }
        );
        let bad = IndexParams {
            checksum_bytes: 2,
            ..params(1)
        };
        assert!(matches!(
            BlockIndexBuilder::new(bad),
            Err(IndexError::ChecksumWidth { width: 2 })
        ));
        let bad = IndexParams {
            seq_matches: 3,
            ..params(1)
        };
        assert!(matches!(
            BlockIndexBuilder::new(bad),
            Err(IndexError::SeqMatches { seq_matches: 3 })
        ));
        let bad = IndexParams {
            rsum_bytes: 0,
            ..params(1)
        };
        assert!(matches!(
            BlockIndexBuilder::new(bad),
            Err(IndexError::RsumWidth(_))
        ));
    }

    #[test]
    fn probe_finds_added_block() {
        let data = block(0x42);
        let index = build(1, &[data]);
        let r = Rsum::from_block(&data);
        assert_eq!(index.probe(r, Rsum::default()), Some(0));
        assert_eq!(index.remaining(), 1);
    }

    #[test]
    fn probe_misses_absent_checksum() {
        let index = build(1, &[block(0x42)]);
        let other = Rsum::from_block(&block(0x43));
        // The filter may alias, but a present head must still fail the weak
        // compare downstream; for distinct sums the common case is a miss.
        if let Some(head) = index.probe(other, Rsum::default()) {
            assert_ne!(index.sum(head).rsum, other);
        }
    }

    #[test]
    fn identical_blocks_chain_in_ascending_id_order() {
        let data = block(0x11);
        let index = build(1, &[data, data, data]);
        let r = Rsum::from_block(&data);
        let head = index.probe(r, Rsum::default()).unwrap();
        assert_eq!(head, 0);
        assert_eq!(index.next_in_chain(head), Some(1));
        assert_eq!(index.next_in_chain(1), Some(2));
        assert_eq!(index.next_in_chain(2), None);
    }

    #[test]
    fn remove_unlinks_and_depletes() {
        let data = block(0x11);
        let mut index = build(1, &[data, data]);
        let r = Rsum::from_block(&data);

        assert!(index.remove(0));
        assert_eq!(index.remaining(), 1);
        assert_eq!(index.probe(r, Rsum::default()), Some(1));

        assert!(index.remove(1));
        assert_eq!(index.remaining(), 0);
        assert_eq!(index.probe(r, Rsum::default()), None);

        // Second removal of the same id is a no-op.
        assert!(!index.remove(1));
        assert_eq!(index.remaining(), 0);
    }

    #[test]
    fn sequential_key_mixes_successor_checksum() {
        let blocks = [block(0x01), block(0x02)];
        let index = build(2, &blocks);
        let r0 = Rsum::from_block(&blocks[0]);
        let r1 = Rsum::from_block(&blocks[1]);
        assert_eq!(index.probe(r0, r1), Some(0));
        // Probing block 1 uses the zero-block sentinel as its successor.
        assert_eq!(index.probe(r1, Rsum { a: 0, b: 0 }), Some(1));
    }

    #[test]
    fn sentinels_are_stored_past_the_last_block() {
        let index = build(2, &[block(0x01)]);
        assert_eq!(index.nblocks(), 1);
        let sentinel = index.sum(1);
        assert_eq!(sentinel.rsum, Rsum { a: 0, b: 0 });
        assert_eq!(sentinel.strong, Md4::digest(&[0u8; 16]));
    }

    #[test]
    fn truncation_is_applied_when_adding() {
        let narrow = IndexParams {
            blocksize: 16,
            seq_matches: 1,
            rsum_bytes: 2,
            checksum_bytes: 3,
        };
        let mut builder = BlockIndexBuilder::new(narrow).unwrap();
        builder.add(BlockSum {
            rsum: Rsum {
                a: 0x1234,
                b: 0x5678,
            },
            strong: [0xff; 16],
        });
        let index = builder.build();
        let stored = index.sum(0);
        assert_eq!(stored.rsum, Rsum { a: 0, b: 0x5678 });
        assert_eq!(&stored.strong[..3], &[0xff, 0xff, 0xff]);
        assert_eq!(&stored.strong[3..], &[0u8; 13]);
    }
}
