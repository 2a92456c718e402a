//! Strong checksums confirming what the rolling checksum only suggests.
//!
//! Per-block MD4 digests discriminate rsum collisions during matching; a
//! whole-file SHA-1 is carried in the control file and checked once the
//! transfer completes.

use digest::Digest;

/// Streaming MD4 hasher used for per-block strong checksums.
#[derive(Clone, Debug, Default)]
pub struct Md4 {
    inner: md4::Md4,
}

impl Md4 {
    /// Creates a hasher with an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: md4::Md4::new(),
        }
    }

    /// Feeds additional bytes into the digest state.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finalises the digest and returns the 128-bit MD4 output.
    #[must_use]
    pub fn finalize(self) -> [u8; 16] {
        self.inner.finalize().into()
    }

    /// Computes the MD4 digest of `data` in one shot.
    #[must_use]
    pub fn digest(data: &[u8]) -> [u8; 16] {
        md4::Md4::digest(data).into()
    }
}

/// Streaming SHA-1 hasher for the whole-file integrity gate.
#[derive(Clone, Debug, Default)]
pub struct Sha1 {
    inner: sha1::Sha1,
}

impl Sha1 {
    /// Creates a hasher with an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: sha1::Sha1::new(),
        }
    }

    /// Feeds additional bytes into the digest state.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finalises the digest and returns the 160-bit SHA-1 output.
    #[must_use]
    pub fn finalize(self) -> [u8; 20] {
        self.inner.finalize().into()
    }

    /// Finalises the digest as a lowercase hex string.
    #[must_use]
    pub fn finalize_hex(self) -> String {
        sha1_hex(&self.finalize())
    }
}

/// Renders a SHA-1 digest as 40 lowercase hex characters.
#[must_use]
pub fn sha1_hex(digest: &[u8; 20]) -> String {
    use std::fmt::Write as _;

    let mut out = String::with_capacity(40);
    for byte in digest {
        let _ = write!(&mut out, "{byte:02x}");
    }
    out
}
