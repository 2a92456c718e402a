use std::io::{self, BufRead, Write};

use checksums::{BlockSum, Rsum};

use crate::error::ControlError;
use crate::header::{ControlHeader, HashLengths};

/// Reads the binary checksum table that follows the header.
///
/// Each row carries the trailing `rsum_bytes` of the network-byte-order rsum
/// followed by the leading `checksum_bytes` of the block's MD4. Bytes the row
/// does not store come back as zero, which is exactly what the matcher's
/// truncated comparisons expect.
pub fn read_table<R: BufRead>(
    reader: &mut R,
    header: &ControlHeader,
) -> Result<Vec<BlockSum>, ControlError> {
    let lengths = header.hash_lengths;
    let nblocks = header.nblocks();
    let rsum_bytes = usize::from(lengths.rsum_bytes);
    let mut row = vec![0u8; lengths.row_len()];
    let mut sums = Vec::with_capacity(usize::try_from(nblocks).unwrap_or(0));

    for id in 0..nblocks {
        if let Err(err) = reader.read_exact(&mut row) {
            if err.kind() == io::ErrorKind::UnexpectedEof {
                return Err(ControlError::ShortRead {
                    got: id,
                    expected: nblocks,
                });
            }
            return Err(err.into());
        }
        let mut rsum_be = [0u8; 4];
        rsum_be[4 - rsum_bytes..].copy_from_slice(&row[..rsum_bytes]);
        let mut strong = [0u8; 16];
        strong[..usize::from(lengths.checksum_bytes)].copy_from_slice(&row[rsum_bytes..]);
        sums.push(BlockSum {
            rsum: Rsum::from_be_bytes(rsum_be),
            strong,
        });
    }
    Ok(sums)
}

/// Writes one truncated row per block, in block-id order.
pub fn write_table<W: Write>(
    writer: &mut W,
    lengths: HashLengths,
    sums: &[BlockSum],
) -> Result<(), ControlError> {
    let rsum_bytes = usize::from(lengths.rsum_bytes);
    for sum in sums {
        writer.write_all(&sum.rsum.to_be_bytes()[4 - rsum_bytes..])?;
        writer.write_all(&sum.strong[..usize::from(lengths.checksum_bytes)])?;
    }
    Ok(())
}
