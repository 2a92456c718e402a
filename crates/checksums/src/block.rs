//! The weak + strong checksum pair describing one target block.

use crate::rolling::Rsum;
use crate::strong::Md4;

/// Checksums of a single fixed-size block of the target file.
///
/// The strong digest is always held at full MD4 width in memory; how many of
/// its leading bytes are meaningful is decided by the control-file header and
/// applied at comparison time.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BlockSum {
    /// Weak rolling checksum of the block.
    pub rsum: Rsum,
    /// MD4 digest of the block, zero-padded past the stored prefix when the
    /// block was read back from a control file.
    pub strong: [u8; 16],
}

impl BlockSum {
    /// Computes both checksums over a full (already zero-padded) block.
    #[must_use]
    pub fn from_block(block: &[u8]) -> Self {
        Self {
            rsum: Rsum::from_block(block),
            strong: Md4::digest(block),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_block_agrees_with_primitives() {
        let block = [0xa5u8; 256];
        let sum = BlockSum::from_block(&block);
        assert_eq!(sum.rsum, Rsum::from_block(&block));
        assert_eq!(sum.strong, Md4::digest(&block));
    }
}
