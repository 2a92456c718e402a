use std::io::{self, Read};

use checksums::{Md4, Rsum};

use crate::index::BlockIndex;

/// One confirmed block match.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Match {
    /// Offset in the seed file where the block's bytes were found.
    pub seed_offset: u64,
    /// Target block id the bytes belong to.
    pub block: u32,
}

impl Match {
    /// Offset of the block inside the target file.
    #[must_use]
    pub const fn target_offset(&self, blocksize: u32) -> u64 {
        self.block as u64 * blocksize as u64
    }
}

/// Every match recorded during a seed scan, in seed order.
#[derive(Clone, Debug)]
pub struct MatchSet {
    blocksize: u32,
    matches: Vec<Match>,
}

impl MatchSet {
    pub(crate) const fn new(blocksize: u32) -> Self {
        Self {
            blocksize,
            matches: Vec::new(),
        }
    }

    /// Block size the matches were found at.
    #[must_use]
    pub const fn blocksize(&self) -> u32 {
        self.blocksize
    }

    /// Number of confirmed matches.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.matches.len()
    }

    /// Whether nothing matched.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// The matches in the order they were confirmed (ascending seed offset).
    #[must_use]
    pub fn as_slice(&self) -> &[Match] {
        &self.matches
    }

    /// Consumes the set, yielding the raw matches for planning.
    #[must_use]
    pub fn into_vec(self) -> Vec<Match> {
        self.matches
    }
}

/// Streams a seed file through a sliding window, probing the block index at
/// every offset.
///
/// The scan works on a 16-block buffer with `blocksize * seq_matches` bytes
/// of carry-over so adjacency probes near the end of one buffer can read
/// into the next. Past end-of-file the window sees zeros, matching the
/// zero-padding the builder applied to the target's final block.
#[derive(Debug)]
pub struct Matcher {
    index: BlockIndex,
    matches: MatchSet,
    prev_valid: bool,
    pending_skip: usize,
}

impl Matcher {
    /// Wraps a freshly built index.
    #[must_use]
    pub fn new(index: BlockIndex) -> Self {
        let blocksize = index.params().blocksize;
        Self {
            index,
            matches: MatchSet::new(blocksize),
            prev_valid: false,
            pending_skip: 0,
        }
    }

    /// Reads the whole seed stream and records every confirmed match.
    /// Returns the number of blocks confirmed by this scan.
    pub fn scan<R: Read>(&mut self, seed: &mut R) -> io::Result<usize> {
        let params = self.index.params();
        let bs = params.blocksize as usize;
        let ctx = params.context();
        let bufsize = bs * 16;
        let mut buf = vec![0u8; bufsize + ctx];

        let mut base = 0u64;
        let mut got = 0usize;
        let mut first = true;
        loop {
            let data_len = if first {
                read_full(seed, &mut buf[..bufsize])?
            } else {
                buf.copy_within(bufsize - ctx..bufsize, 0);
                ctx + read_full(seed, &mut buf[ctx..bufsize])?
            };
            let at_eof = data_len < bufsize;
            let len = if at_eof {
                buf[data_len..data_len + ctx].fill(0);
                data_len + ctx
            } else {
                bufsize
            };

            let (found, end_x) = self.scan_buffer(&buf[..len], base);
            got += found;
            if at_eof {
                break;
            }
            // A match can consume bytes past the carry boundary; skip them
            // instead of rescanning when the next buffer starts.
            self.pending_skip = end_x.saturating_sub(bufsize - ctx);
            base += (bufsize - ctx) as u64;
            first = false;
        }
        Ok(got)
    }

    /// Releases the depleted index together with the recorded matches.
    #[must_use]
    pub fn finish(self) -> (BlockIndex, MatchSet) {
        (self.index, self.matches)
    }

    /// Probes every window position in `buf`, returning the number of
    /// matches and the offset the scan stopped at.
    fn scan_buffer(&mut self, buf: &[u8], base: u64) -> (usize, usize) {
        let params = self.index.params();
        let masks = self.index.masks();
        let bs = params.blocksize as usize;
        let seq2 = params.seq_matches > 1;
        let ctx = params.context();
        let shift = params.blockshift();
        let cb = usize::from(params.checksum_bytes);

        let mut x = std::mem::take(&mut self.pending_skip);
        let mut got = 0usize;
        if x + ctx >= buf.len() {
            return (got, x);
        }

        let mut r0 = Rsum::from_block(&buf[x..x + bs]);
        let mut r1 = if seq2 {
            Rsum::from_block(&buf[x + bs..x + 2 * bs])
        } else {
            Rsum::default()
        };

        while x + ctx < buf.len() {
            let mut accepted = None;
            if let Some(head) = self.index.probe(r0, r1) {
                let mut window_md4: Option<[u8; 16]> = None;
                let mut cursor = Some(head);
                while let Some(id) = cursor {
                    cursor = self.index.next_in_chain(id);
                    if self.index.sum(id).rsum != r0.truncated(masks) {
                        continue;
                    }
                    // Without an adjacent previous match, the next window
                    // must corroborate this candidate before MD4 is spent
                    // on it.
                    if seq2
                        && !self.prev_valid
                        && self.index.sum(id + 1).rsum != r1.truncated(masks)
                    {
                        continue;
                    }
                    let digest =
                        window_md4.get_or_insert_with(|| Md4::digest(&buf[x..x + bs]));
                    if digest[..cb] != self.index.sum(id).strong[..cb] {
                        continue;
                    }
                    if seq2 && !self.prev_valid {
                        let next_digest = Md4::digest(&buf[x + bs..x + 2 * bs]);
                        if next_digest[..cb] != self.index.sum(id + 1).strong[..cb] {
                            continue;
                        }
                    }
                    accepted = Some(id);
                    break;
                }
            }

            if let Some(id) = accepted {
                self.matches.matches.push(Match {
                    seed_offset: base + x as u64,
                    block: id,
                });
                self.index.remove(id);
                got += 1;
                self.prev_valid = true;
                x += bs;
                if x + ctx >= buf.len() {
                    return (got, x);
                }
                r0 = Rsum::from_block(&buf[x..x + bs]);
                if seq2 {
                    r1 = Rsum::from_block(&buf[x + bs..x + 2 * bs]);
                }
            } else {
                self.prev_valid = false;
                r0 = r0.roll(buf[x], buf[x + bs], shift);
                if seq2 {
                    r1 = r1.roll(buf[x + bs], buf[x + 2 * bs], shift);
                }
                x += 1;
            }
        }
        (got, x)
    }
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
