// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Incremental CRC32 accumulator for a single append log.
//!
//! Each append log keeps one of these alive for its whole lifetime: every
//! appended record feeds the running checksum, and the 8-byte big-endian
//! digest it exports is what gets written to the log's sibling `.crc` file.

/// A running CRC32 value that can be extended incrementally and exported as
/// an 8-byte big-endian digest, matching the `L.crc == CRC32(bytes of L)`
/// invariant every append log maintains.
#[derive(Clone, Default)]
pub struct CrcAccumulator {
    hasher: crc32fast::Hasher,
}

impl CrcAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an accumulator already primed with the checksum of `bytes`,
    /// used to seed state from the bytes a log already contains on open.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut acc = Self::new();
        acc.update(bytes);
        acc
    }

    /// Feeds `bytes` into the running checksum.
    pub fn update(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// The current digest as 8 big-endian bytes (the upper 4 bytes are
    /// always zero; the on-disk format is fixed-width so a future wider
    /// checksum could be dropped in without changing the file layout).
    pub fn digest_be_bytes(&self) -> [u8; 8] {
        let value = self.hasher.clone().finalize() as u64;
        value.to_be_bytes()
    }

    pub fn digest(&self) -> u32 {
        self.hasher.clone().finalize()
    }
}

/// Computes the CRC32 of `bytes` directly, for one-shot use (e.g. verifying
/// a freshly-squashed log without needing to carry an accumulator around).
pub fn crc32_of(bytes: &[u8]) -> u32 {
    crc32fast::hash(bytes)
}

/// Parses an 8-byte big-endian CRC file payload. A missing, empty, or
/// underflowing CRC file reads back as 0 rather than an error — recovery
/// treats "no CRC recorded yet" the same as "CRC is 0".
pub fn parse_crc_file(bytes: &[u8]) -> u64 {
    if bytes.len() < 8 {
        return 0;
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[bytes.len() - 8..]);
    u64::from_be_bytes(buf)
}
