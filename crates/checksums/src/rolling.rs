use core::fmt;

/// Weak rolling block checksum (often called `rsum`).
///
/// The checksum is the pair `(a, b)` where `a` is the byte sum of the block
/// and `b` weights each byte by its distance from the end of the block, both
/// truncated to 16 bits. Sliding the window forward by one byte is a
/// constant-time update, which is what makes probing every seed offset
/// affordable.
#[doc(alias = "rsum")]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct Rsum {
    /// Plain byte sum, mod 2^16.
    pub a: u16,
    /// Distance-weighted byte sum, mod 2^16.
    pub b: u16,
}

impl Rsum {
    /// Computes the checksum of a full block.
    #[must_use]
    pub fn from_block(block: &[u8]) -> Self {
        let mut a = 0u32;
        let mut b = 0u32;
        let mut weight = block.len() as u32;
        for &byte in block {
            a = a.wrapping_add(u32::from(byte));
            b = b.wrapping_add(weight.wrapping_mul(u32::from(byte)));
            weight -= 1;
        }
        Self {
            a: (a & 0xffff) as u16,
            b: (b & 0xffff) as u16,
        }
    }

    /// Slides the window one byte forward: `outgoing` leaves on the left,
    /// `incoming` enters on the right. `blockshift` is `log2` of the window
    /// length.
    ///
    /// The result is identical to [`Rsum::from_block`] over the shifted
    /// window.
    #[inline]
    #[must_use]
    pub fn roll(self, outgoing: u8, incoming: u8, blockshift: u32) -> Self {
        let out = u16::from(outgoing);
        let a = self.a.wrapping_add(u16::from(incoming)).wrapping_sub(out);
        let b = self.b.wrapping_add(a).wrapping_sub(out.wrapping_shl(blockshift));
        Self { a, b }
    }

    /// Applies a truncation mask, zeroing the bits the on-disk format does
    /// not store.
    #[inline]
    #[must_use]
    pub const fn truncated(self, masks: RsumMasks) -> Self {
        Self {
            a: self.a & masks.a,
            b: self.b & masks.b,
        }
    }

    /// Network-byte-order representation: `a` then `b`, each big-endian.
    #[must_use]
    pub const fn to_be_bytes(self) -> [u8; 4] {
        let a = self.a.to_be_bytes();
        let b = self.b.to_be_bytes();
        [a[0], a[1], b[0], b[1]]
    }

    /// Inverse of [`Rsum::to_be_bytes`].
    #[must_use]
    pub const fn from_be_bytes(bytes: [u8; 4]) -> Self {
        Self {
            a: u16::from_be_bytes([bytes[0], bytes[1]]),
            b: u16::from_be_bytes([bytes[2], bytes[3]]),
        }
    }
}

/// Comparison masks for checksums stored at reduced width.
///
/// The on-disk format keeps only the trailing `width` bytes of the
/// network-byte-order pair, truncating from the low-entropy end: the whole
/// of `a` goes first, then `a`'s low byte, and `b` is always kept at least
/// one byte wide.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RsumMasks {
    /// Mask applied to the `a` half before comparing.
    pub a: u16,
    /// Mask applied to the `b` half before comparing.
    pub b: u16,
}

impl RsumMasks {
    /// Builds the masks for a stored rsum width of `width` bytes.
    pub fn for_width(width: u8) -> Result<Self, RsumError> {
        let a = match width {
            1 | 2 => 0x0000,
            3 => 0x00ff,
            4 => 0xffff,
            _ => return Err(RsumError::InvalidWidth { width }),
        };
        let b = if width == 1 { 0x00ff } else { 0xffff };
        Ok(Self { a, b })
    }
}

/// Error raised when a stored rsum width is outside the format's range.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RsumError {
    /// The width is not in `1..=4`.
    InvalidWidth {
        /// The offending width in bytes.
        width: u8,
    },
}

impl fmt::Display for RsumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidWidth { width } => {
                write!(f, "rsum width of {width} bytes is outside 1..=4")
            }
        }
    }
}

impl std::error::Error for RsumError {}
