#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `signature` is the builder half of the engine: it streams a target file
//! once, computes the weak and strong checksum of every (zero-padded)
//! block together with the running whole-file SHA-1, derives the header
//! fields from the file's statistics, and writes the control file that
//! later drives matching.

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use checksums::{BlockSum, Sha1};
use control::{ControlError, ControlHeader, HashLengths, blocksize_for, write_table};
use thiserror::Error;
use tracing::info;

/// What the builder derived and wrote into the control header.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SignatureSummary {
    /// Bytes read from the input.
    pub length: u64,
    /// Chosen block size.
    pub blocksize: u32,
    /// Number of checksum rows written.
    pub nblocks: u64,
    /// Derived stored widths and consecutive-match requirement.
    pub hash_lengths: HashLengths,
    /// Whole-file SHA-1 of the unpadded input.
    pub sha1_hex: String,
}

/// Failure while generating a signature.
#[derive(Debug, Error)]
pub enum SignatureError {
    /// Reading the input failed.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// Writing the control file failed.
    #[error(transparent)]
    Control(#[from] ControlError),
}

/// Streams `input` and writes a complete control file to `output`.
///
/// The final block is zero-padded to `blocksize` for checksum purposes; the
/// SHA-1 covers only the bytes actually read. Header fields other than the
/// block size are derived from the byte count the stream actually produced.
pub fn write_signature<R: Read, W: Write>(
    input: &mut R,
    blocksize: u32,
    output: &mut W,
) -> Result<SignatureSummary, SignatureError> {
    let mut sums: Vec<BlockSum> = Vec::new();
    let mut sha = Sha1::new();
    let mut length = 0u64;
    let mut block = vec![0u8; blocksize as usize];

    loop {
        let got = read_full(input, &mut block)?;
        if got == 0 {
            break;
        }
        sha.update(&block[..got]);
        block[got..].fill(0);
        sums.push(BlockSum::from_block(&block));
        length += got as u64;
        if got < block.len() {
            break;
        }
    }

    let hash_lengths = HashLengths::derive(length, blocksize);
    let header = ControlHeader {
        version: env!("CARGO_PKG_VERSION").to_owned(),
        blocksize,
        length,
        hash_lengths,
        sha1_hex: sha.finalize_hex(),
    };
    header.write_to(output)?;
    write_table(output, hash_lengths, &sums)?;

    Ok(SignatureSummary {
        length,
        blocksize,
        nblocks: sums.len() as u64,
        hash_lengths,
        sha1_hex: header.sha1_hex,
    })
}

/// [`write_signature`] over filesystem paths, choosing the block size from
/// the input's on-disk length.
pub fn write_signature_file(
    input: &Path,
    output: &Path,
) -> Result<SignatureSummary, SignatureError> {
    let blocksize = blocksize_for(fs::metadata(input)?.len());
    let mut reader = File::open(input)?;
    let mut writer = BufWriter::new(File::create(output)?);
    let summary = write_signature(&mut reader, blocksize, &mut writer)?;
    writer.flush().map_err(ControlError::from)?;
    info!(
        length = summary.length,
        blocks = summary.nblocks,
        blocksize = summary.blocksize,
        "control file written"
    );
    Ok(summary)
}

/// Reads until `buf` is full or the stream ends; returns the bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut total = 0usize;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(total)
}
