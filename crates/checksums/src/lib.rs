#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `checksums` provides the two checksum families the delta-transfer engine
//! is built on: the weak rolling block checksum (`rsum`) used to locate
//! candidate blocks while sliding a window over the seed file, and the
//! strong digests (per-block MD4, whole-file SHA-1) used to confirm
//! candidates and to gate the finished transfer.
//!
//! # Design
//!
//! - [`rolling`] implements the 16-bit pair checksum with a constant-time
//!   roll update, so the matcher can advance its window one byte at a time
//!   without rescanning the block.
//! - [`strong`] exposes streaming wrappers over the RustCrypto `md4` and
//!   `sha1` hashers. Per-block MD4 only discriminates rsum collisions; the
//!   whole-file SHA-1 is the final integrity gate, so MD4's weakness as an
//!   authenticator is acceptable here.
//!
//! # Invariants
//!
//! - Both halves of the rolling checksum are truncated to 16 bits after
//!   every update.
//! - Rolling a window forward produces bit-identical results to recomputing
//!   the checksum over the shifted window (verified by property tests).

pub mod block;
/// Weak rolling block checksum.
pub mod rolling;
pub mod strong;

pub use block::BlockSum;
pub use rolling::{Rsum, RsumError, RsumMasks};
pub use strong::{Md4, Sha1, sha1_hex};
