// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque byte buffer used for block hashes, validator ids, and deploy ids.
///
/// Deliberately thin: the engine treats these as uninterpreted bytes and
/// only ever compares, hashes, or measures the length of them. Width
/// validation (e.g. "must be exactly `H` bytes") is the caller's job.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct FixedBytes(Vec<u8>);

impl FixedBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for FixedBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for FixedBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for FixedBytes {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Debug for FixedBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

impl fmt::Display for FixedBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_vec() {
        let bytes = vec![1, 2, 3, 4];
        let fb = FixedBytes::from(bytes.clone());
        assert_eq!(fb.as_bytes(), &bytes[..]);
        assert_eq!(fb.into_bytes(), bytes);
    }

    #[test]
    fn debug_is_hex() {
        let fb = FixedBytes::from(vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(format!("{fb:?}"), "deadbeef");
    }

    #[test]
    fn ordering_is_lexicographic_on_bytes() {
        let a = FixedBytes::from(vec![1, 2]);
        let b = FixedBytes::from(vec![1, 3]);
        assert!(a < b);
    }

    #[quickcheck_macros::quickcheck]
    fn into_bytes_roundtrips_any_buffer(bytes: Vec<u8>) -> bool {
        FixedBytes::from(bytes.clone()).into_bytes() == bytes
    }

    #[quickcheck_macros::quickcheck]
    fn ordering_matches_the_underlying_byte_vec(a: Vec<u8>, b: Vec<u8>) -> bool {
        (FixedBytes::from(a.clone()).cmp(&FixedBytes::from(b.clone()))) == a.cmp(&b)
    }
}
