use std::collections::HashSet;
use std::io::{BufRead, Write};

use crate::error::{ControlError, HeaderError};

/// Block size chosen by the builder from the target length.
#[must_use]
pub const fn blocksize_for(length: u64) -> u32 {
    if length < 100_000_000 { 2048 } else { 4096 }
}

/// Stored widths of the per-block checksums, plus the consecutive-match
/// requirement, as carried by the `Hash-Lengths` header field.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct HashLengths {
    /// Number of consecutive blocks that must match before a candidate is
    /// accepted without adjacency context (1 or 2).
    pub seq_matches: u8,
    /// Stored rsum width in bytes (1..=4).
    pub rsum_bytes: u8,
    /// Stored MD4 prefix width in bytes (3..=16).
    pub checksum_bytes: u8,
}

impl HashLengths {
    /// Derives the widths from the target's statistics.
    ///
    /// The formulas size the stored checksums so that the expected number of
    /// false candidates over the whole file stays negligible while the table
    /// stays compact; requiring two consecutive matches halves the bits each
    /// block needs to carry.
    #[must_use]
    pub fn derive(length: u64, blocksize: u32) -> Self {
        let len = length.max(1) as f64;
        let bs = f64::from(blocksize);
        let seq_matches: u8 = if length > u64::from(blocksize) { 2 } else { 1 };
        let seq = f64::from(seq_matches);

        let rsum_bytes = (((len.log2() + bs.log2() - 8.6) / seq) / 8.0).ceil();
        let rsum_bytes = (rsum_bytes as i32).clamp(2, 4) as u8;

        let blocks = 1.0 + len / bs;
        let scaled = ((20.0 + len.log2() + blocks.log2()) / seq / 8.0).ceil();
        let floor = ((7.9 + 20.0 + blocks.log2()) / 8.0).ceil();
        let checksum_bytes = (scaled.max(floor) as i32).clamp(3, 16) as u8;

        Self {
            seq_matches,
            rsum_bytes,
            checksum_bytes,
        }
    }

    /// Width of one on-disk checksum row.
    #[must_use]
    pub const fn row_len(self) -> usize {
        self.rsum_bytes as usize + self.checksum_bytes as usize
    }

    const fn in_range(self) -> bool {
        self.seq_matches >= 1
            && self.seq_matches <= 2
            && self.rsum_bytes >= 1
            && self.rsum_bytes <= 4
            && self.checksum_bytes >= 3
            && self.checksum_bytes <= 16
    }

    fn parse(value: &str) -> Option<Self> {
        let mut parts = value.split(',');
        let seq_matches = parts.next()?.trim().parse().ok()?;
        let rsum_bytes = parts.next()?.trim().parse().ok()?;
        let checksum_bytes = parts.next()?.trim().parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        let lengths = Self {
            seq_matches,
            rsum_bytes,
            checksum_bytes,
        };
        lengths.in_range().then_some(lengths)
    }
}

/// Parsed and validated control-file header.
#[derive(Clone, Debug)]
pub struct ControlHeader {
    /// Producer version string from the `oc-zsync` tag.
    pub version: String,
    /// Block size; always a positive power of two.
    pub blocksize: u32,
    /// Target file length in bytes.
    pub length: u64,
    /// Stored checksum widths and the consecutive-match requirement.
    pub hash_lengths: HashLengths,
    /// Whole-file SHA-1 of the target, 40 hex characters.
    pub sha1_hex: String,
}

impl ControlHeader {
    /// Number of blocks the checksum table must carry.
    #[must_use]
    pub const fn nblocks(&self) -> u64 {
        self.length.div_ceil(self.blocksize as u64)
    }

    /// `log2` of the block size.
    #[must_use]
    pub const fn blockshift(&self) -> u32 {
        self.blocksize.trailing_zeros()
    }

    /// Parses the text header up to and including the blank terminator line.
    ///
    /// Field order is not significant; unknown tags are fatal unless a
    /// `Safe:` field names them.
    pub fn read_from<R: BufRead>(reader: &mut R) -> Result<Self, ControlError> {
        let mut fields: Vec<(String, String)> = Vec::new();
        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                return Err(HeaderError::UnterminatedHeader.into());
            }
            while line.ends_with(['\n', '\r', ' ']) {
                line.pop();
            }
            if line.is_empty() {
                break;
            }
            let Some(colon) = line.find(':') else {
                return Err(HeaderError::MalformedLine { line }.into());
            };
            if line.as_bytes().get(colon + 1) != Some(&b' ') {
                return Err(HeaderError::MalformedLine { line }.into());
            }
            let name = line[..colon].to_owned();
            let value = line[colon + 2..].to_owned();
            fields.push((name, value));
        }

        let safe: HashSet<&str> = fields
            .iter()
            .filter(|(name, _)| name == "Safe")
            .flat_map(|(_, value)| value.split_whitespace())
            .collect();

        let mut version = String::new();
        let mut blocksize = None;
        let mut length = None;
        let mut hash_lengths = HashLengths {
            seq_matches: 1,
            rsum_bytes: 4,
            checksum_bytes: 16,
        };
        let mut sha1_hex = None;

        for (name, value) in &fields {
            match name.as_str() {
                "oc-zsync" => version = value.clone(),
                "Blocksize" => {
                    blocksize = match value.parse::<u32>() {
                        Ok(size) if size.is_power_of_two() => Some(size),
                        _ => {
                            return Err(HeaderError::Blocksize {
                                value: value.clone(),
                            }
                            .into());
                        }
                    };
                }
                "Length" => {
                    length = match value.parse::<u64>() {
                        Ok(len) => Some(len),
                        Err(_) => {
                            return Err(HeaderError::Length {
                                value: value.clone(),
                            }
                            .into());
                        }
                    };
                }
                "Hash-Lengths" => {
                    hash_lengths = HashLengths::parse(value).ok_or_else(|| {
                        HeaderError::HashLengths {
                            value: value.clone(),
                        }
                    })?;
                }
                "SHA-1" => {
                    if value.len() != 40 || !value.bytes().all(|b| b.is_ascii_hexdigit()) {
                        return Err(HeaderError::Sha1Digest.into());
                    }
                    sha1_hex = Some(value.clone());
                }
                "Safe" => {}
                other => {
                    if !safe.contains(other) {
                        return Err(HeaderError::UnknownTag {
                            name: other.to_owned(),
                        }
                        .into());
                    }
                }
            }
        }

        let (Some(blocksize), Some(length)) = (blocksize, length) else {
            return Err(HeaderError::MissingFields.into());
        };
        if length == 0 {
            return Err(HeaderError::MissingFields.into());
        }
        let sha1_hex = sha1_hex.ok_or(HeaderError::MissingSha1)?;

        Ok(Self {
            version,
            blocksize,
            length,
            hash_lengths,
            sha1_hex,
        })
    }

    /// Writes the header followed by the blank terminator line.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), ControlError> {
        writeln!(writer, "oc-zsync: {}", self.version)?;
        writeln!(writer, "Blocksize: {}", self.blocksize)?;
        writeln!(writer, "Length: {}", self.length)?;
        writeln!(
            writer,
            "Hash-Lengths: {},{},{}",
            self.hash_lengths.seq_matches,
            self.hash_lengths.rsum_bytes,
            self.hash_lengths.checksum_bytes
        )?;
        writeln!(writer, "SHA-1: {}", self.sha1_hex)?;
        writeln!(writer)?;
        Ok(())
    }
}
