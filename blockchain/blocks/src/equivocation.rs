// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::collections::BTreeSet;

use crate::{BlockHash, Validator};

/// Evidence that a validator produced two distinct blocks at the same
/// sequence number. `detected_block_hashes` accumulates every block hash
/// seen as part of the equivocation; the set only ever grows for a given
/// `(equivocator, equivocation_base_seq_num)` key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EquivocationRecord {
    pub equivocator: Validator,
    pub equivocation_base_seq_num: i32,
    pub detected_block_hashes: BTreeSet<BlockHash>,
}

impl EquivocationRecord {
    pub fn new(equivocator: Validator, equivocation_base_seq_num: i32) -> Self {
        Self {
            equivocator,
            equivocation_base_seq_num,
            detected_block_hashes: BTreeSet::new(),
        }
    }

    /// The identity of this record for the purposes of last-write-wins
    /// squashing: two records with the same key are the same equivocation,
    /// differing only in which hashes have been observed so far.
    pub fn key(&self) -> (Validator, i32) {
        (self.equivocator.clone(), self.equivocation_base_seq_num)
    }

    /// Returns a copy of this record with `hash` added to the detected set.
    pub fn with_hash(&self, hash: BlockHash) -> Self {
        let mut next = self.clone();
        next.detected_block_hashes.insert(hash);
        next
    }
}
