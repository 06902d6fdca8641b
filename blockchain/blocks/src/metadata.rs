// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use serde::{Deserialize, Serialize};

use crate::{BlockHash, DeployId, Validator};

/// Errors raised by the block-metadata codec.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to encode block metadata: {0}")]
    Encode(#[source] bincode::Error),
    #[error("failed to decode block metadata: {0}")]
    Decode(#[source] bincode::Error),
}

/// A validated block as handed to the storage engine by an external
/// collaborator (block validation). The engine never constructs one of
/// these itself; it only ever reads the fields it needs out of it via
/// [`BlockMetadata::from_block`].
#[derive(Clone, Debug)]
pub struct Block {
    pub block_hash: BlockHash,
    pub parents: Vec<BlockHash>,
    pub block_num: i64,
    pub seq_num: i32,
    /// Empty for genesis; otherwise must be exactly `V` bytes.
    pub sender: Validator,
    pub justifications: Vec<(Validator, BlockHash)>,
    pub bonds: Vec<(Validator, i64)>,
    pub deploy_signatures: Vec<DeployId>,
}

/// The engine's own persisted view of a block: everything `insert` needs
/// to maintain the DAG indices, independent of the wire representation the
/// block arrived in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockMetadata {
    pub block_hash: BlockHash,
    pub parents: Vec<BlockHash>,
    pub block_num: i64,
    pub seq_num: i32,
    pub sender: Validator,
    pub justifications: Vec<(Validator, BlockHash)>,
    pub bonds: Vec<(Validator, i64)>,
    pub invalid: bool,
}

impl BlockMetadata {
    pub fn from_block(block: &Block, invalid: bool) -> Self {
        Self {
            block_hash: block.block_hash.clone(),
            parents: block.parents.clone(),
            block_num: block.block_num,
            seq_num: block.seq_num,
            sender: block.sender.clone(),
            justifications: block.justifications.clone(),
            bonds: block.bonds.clone(),
            invalid,
        }
    }

    /// Deterministic opaque encoding. `bincode`'s fixed-layout struct
    /// encoding is byte-for-byte stable for a given value, which is all the
    /// CRC-verified append log requires — it never needs to compare two
    /// semantically-equal-but-differently-encoded byte strings.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        bincode::serialize(self).map_err(Error::Encode)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        bincode::deserialize(bytes).map_err(Error::Decode)
    }

    /// Validators with bonds in this block that have no justification here,
    /// i.e. validators the DAG is seeing for the first time through this
    /// block. Used by `insert` to seed `latestMessages` entries pointing at
    /// genesis for brand-new validators.
    pub fn new_validators(&self) -> Vec<Validator> {
        let justified: std::collections::HashSet<&Validator> =
            self.justifications.iter().map(|(v, _)| v).collect();
        self.bonds
            .iter()
            .map(|(v, _)| v)
            .filter(|v| !justified.contains(v))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BlockMetadata {
        BlockMetadata {
            block_hash: BlockHash::from(vec![1; 32]),
            parents: vec![BlockHash::from(vec![0; 32])],
            block_num: 7,
            seq_num: 1,
            sender: Validator::from(vec![9; 32]),
            justifications: vec![(Validator::from(vec![9; 32]), BlockHash::from(vec![0; 32]))],
            bonds: vec![
                (Validator::from(vec![9; 32]), 100),
                (Validator::from(vec![8; 32]), 50),
            ],
            invalid: false,
        }
    }

    #[test]
    fn roundtrips_byte_for_byte() {
        let meta = sample();
        let bytes = meta.to_bytes().unwrap();
        let decoded = BlockMetadata::from_bytes(&bytes).unwrap();
        assert_eq!(meta, decoded);

        // Encoding is deterministic: encoding again yields identical bytes.
        assert_eq!(bytes, decoded.to_bytes().unwrap());
    }

    #[test]
    fn rejects_truncated_bytes() {
        let meta = sample();
        let mut bytes = meta.to_bytes().unwrap();
        bytes.truncate(bytes.len() - 1);
        assert!(BlockMetadata::from_bytes(&bytes).is_err());
    }

    #[test]
    fn new_validators_excludes_justified() {
        let meta = sample();
        let new = meta.new_validators();
        assert_eq!(new, vec![Validator::from(vec![8; 32])]);
    }

    #[quickcheck_macros::quickcheck]
    fn bincode_roundtrips_for_any_field_values(
        block_hash: Vec<u8>,
        parents: Vec<Vec<u8>>,
        block_num: i64,
        seq_num: i32,
        sender: Vec<u8>,
        bonds: Vec<(Vec<u8>, i64)>,
        invalid: bool,
    ) -> bool {
        let meta = BlockMetadata {
            block_hash: BlockHash::from(block_hash),
            parents: parents.into_iter().map(BlockHash::from).collect(),
            block_num,
            seq_num,
            sender: Validator::from(sender),
            justifications: Vec::new(),
            bonds: bonds
                .into_iter()
                .map(|(v, stake)| (Validator::from(v), stake))
                .collect(),
            invalid,
        };
        let bytes = meta.to_bytes().unwrap();
        BlockMetadata::from_bytes(&bytes).unwrap() == meta
    }
}
