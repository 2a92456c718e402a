#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `control` reads and writes the metadata file that drives delta matching:
//! a short text header followed by a blank line and a binary table of one
//! truncated `(rsum, md4-prefix)` row per target block.
//!
//! The header carries the target length, the block size, the stored widths
//! of both checksums (`Hash-Lengths`), and the whole-file SHA-1 the applier
//! verifies after reconstruction:
//!
//! ```text
//! oc-zsync: 0.1.0
//! Blocksize: 2048
//! Length: 10240
//! Hash-Lengths: 2,2,4
//! SHA-1: <40 lowercase hex>
//!
//! <binary rows>
//! ```
//!
//! Field order is not significant. Unknown tags are fatal unless named by a
//! `Safe:` header. Rsums are stored big-endian and truncated from the low
//! end, because the trailing bytes carry more entropy in practice.
//!
//! # Errors
//!
//! [`ControlError`] distinguishes malformed headers ([`HeaderError`], one
//! variant per offending field), a truncated checksum table, and plain I/O
//! failures; each renders as a single diagnostic line.

mod error;
mod header;
mod table;

pub use error::{ControlError, HeaderError};
pub use header::{ControlHeader, HashLengths, blocksize_for};
pub use table::{read_table, write_table};

use std::io::{BufRead, Write};

use checksums::BlockSum;

/// A fully parsed control file: header plus per-block checksum table.
#[derive(Clone, Debug)]
pub struct ControlFile {
    /// Parsed and validated header fields.
    pub header: ControlHeader,
    /// One checksum row per target block, in block-id order.
    pub sums: Vec<BlockSum>,
}

impl ControlFile {
    /// Reads and validates a complete control file.
    pub fn read<R: BufRead>(reader: &mut R) -> Result<Self, ControlError> {
        let header = ControlHeader::read_from(reader)?;
        let sums = read_table(reader, &header)?;
        Ok(Self { header, sums })
    }

    /// Writes the header and the truncated checksum table.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), ControlError> {
        self.header.write_to(writer)?;
        write_table(writer, self.header.hash_lengths, &self.sums)?;
        Ok(())
    }
}
