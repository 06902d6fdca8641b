// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! The lock-free read representation handed back from every write.
//!
//! A [`Representation`] is a cheap snapshot: a handful of cloned `Arc`s
//! plus the block-number index and checkpoint loader handles, all taken
//! under the engine's mutex for an instant. Every query after that runs
//! without re-acquiring the lock, except cold lookups that fall through to
//! a checkpoint — those go through [`crate::checkpoint::CheckpointLoader`],
//! which serializes concurrent loads of the same checkpoint internally.

use std::collections::BTreeSet;
use std::sync::Arc;

use ahash::AHashMap;

use blockdag_blocks::{BlockHash, BlockMetadata, DeployId, Validator};

use crate::checkpoint::{Checkpoint, CheckpointLoader};
use crate::error::{Error, Result};
use crate::kv_index::BlockNumberIndex;
use crate::state::DagState;

/// The largest slice length a caller can request (`2^31 - 1`).
const MAX_TOPO_SORT_LEN: usize = i32::MAX as usize;

pub struct Representation {
    latest_messages: Arc<AHashMap<Validator, BlockHash>>,
    child_map: Arc<AHashMap<BlockHash, BTreeSet<BlockHash>>>,
    data_lookup: Arc<AHashMap<BlockHash, BlockMetadata>>,
    topo_sort: Arc<Vec<Vec<BlockHash>>>,
    block_hashes_by_deploy: Arc<AHashMap<DeployId, BlockHash>>,
    invalid_blocks: Arc<AHashMap<BlockHash, BlockMetadata>>,
    sort_offset: i64,
    checkpoints: Arc<Vec<Checkpoint>>,
    index: Arc<BlockNumberIndex>,
    checkpoint_loader: Arc<CheckpointLoader>,
    hash_width: usize,
}

impl Representation {
    pub(crate) fn snapshot(
        state: &DagState,
        index: Arc<BlockNumberIndex>,
        checkpoint_loader: Arc<CheckpointLoader>,
        hash_width: usize,
    ) -> Self {
        Self {
            latest_messages: state.latest_messages.clone(),
            child_map: state.child_map.clone(),
            data_lookup: state.data_lookup.clone(),
            topo_sort: state.topo_sort.clone(),
            block_hashes_by_deploy: state.block_hashes_by_deploy.clone(),
            invalid_blocks: state.invalid_blocks.clone(),
            sort_offset: state.sort_offset,
            checkpoints: state.checkpoints.clone(),
            index,
            checkpoint_loader,
            hash_width,
        }
    }

    fn checkpoint_for_number(&self, block_num: i64) -> Option<&Checkpoint> {
        self.checkpoints
            .iter()
            .find(|c| c.start <= block_num && block_num < c.end)
    }

    pub fn children(&self, hash: &BlockHash) -> Result<Option<BTreeSet<BlockHash>>> {
        if let Some(children) = self.child_map.get(hash) {
            return Ok(Some(children.clone()));
        }
        let Some(block_num) = self.index.get(hash)? else {
            return Ok(None);
        };
        let Some(checkpoint) = self.checkpoint_for_number(block_num) else {
            return Ok(None);
        };
        let info = self.checkpoint_loader.load(checkpoint)?;
        Ok(info.child_map.get(hash).cloned())
    }

    pub fn lookup(&self, hash: &BlockHash) -> Result<Option<BlockMetadata>> {
        if let Some(metadata) = self.data_lookup.get(hash) {
            return Ok(Some(metadata.clone()));
        }
        let Some(block_num) = self.index.get(hash)? else {
            return Ok(None);
        };
        let Some(checkpoint) = self.checkpoint_for_number(block_num) else {
            return Ok(None);
        };
        let info = self.checkpoint_loader.load(checkpoint)?;
        Ok(info.data_lookup.get(hash).cloned())
    }

    pub fn contains(&self, hash: &BlockHash) -> Result<bool> {
        if hash.len() != self.hash_width {
            return Ok(false);
        }
        if self.data_lookup.contains_key(hash) {
            return Ok(true);
        }
        self.index.contains(hash)
    }

    pub fn lookup_by_deploy_id(&self, deploy_id: &DeployId) -> Option<BlockHash> {
        self.block_hashes_by_deploy.get(deploy_id).cloned()
    }

    /// Row `i` holds the hashes of blocks with `blockNum == startBlockNumber + i`.
    pub fn topo_sort(&self, start_block_number: i64) -> Result<Vec<Vec<BlockHash>>> {
        if start_block_number >= self.sort_offset {
            let drop_count = (start_block_number - self.sort_offset).max(0) as usize;
            return Ok(self.topo_sort.iter().skip(drop_count).cloned().collect());
        }

        let mut rows = Vec::new();
        for checkpoint in self.checkpoints.iter() {
            if checkpoint.start < self.sort_offset && checkpoint.end > start_block_number {
                let info = self.checkpoint_loader.load(checkpoint)?;
                let skip = (start_block_number - info.sort_offset).max(0) as usize;
                rows.extend(info.topo_sort.iter().skip(skip).cloned());
            }
        }
        rows.extend(self.topo_sort.iter().cloned());

        if rows.len() > MAX_TOPO_SORT_LEN {
            return Err(Error::TopoSortLengthIsTooBig(rows.len()));
        }
        Ok(rows)
    }

    /// Mirrors the formula `sortOffset - (n - liveLen)` verbatim; see
    /// DESIGN.md for why this is kept as-is rather than "fixed".
    pub fn topo_sort_tail(&self, n: usize) -> Result<Vec<Vec<BlockHash>>> {
        let live_len = self.topo_sort.len() as i64;
        let start = (self.sort_offset - (n as i64 - live_len)).max(0);
        self.topo_sort(start)
    }

    /// A total ordering on blocks from `startBlockNumber` onward, given by
    /// position in the flattened topological sort.
    pub fn derive_ordering(&self, start_block_number: i64) -> Result<AHashMap<BlockHash, usize>> {
        let flattened = self.topo_sort(start_block_number)?;
        let mut ranks = AHashMap::default();
        for (rank, hash) in flattened.into_iter().flatten().enumerate() {
            ranks.insert(hash, rank);
        }
        Ok(ranks)
    }

    pub fn latest_message_hash(&self, validator: &Validator) -> Option<BlockHash> {
        self.latest_messages.get(validator).cloned()
    }

    pub fn latest_message(&self, validator: &Validator) -> Result<Option<BlockMetadata>> {
        match self.latest_message_hash(validator) {
            Some(hash) => self.lookup(&hash),
            None => Ok(None),
        }
    }

    pub fn latest_message_hashes(&self) -> AHashMap<Validator, BlockHash> {
        (*self.latest_messages).clone()
    }

    pub fn latest_messages(&self) -> Result<AHashMap<Validator, BlockMetadata>> {
        let mut out = AHashMap::default();
        for (validator, hash) in self.latest_messages.iter() {
            if let Some(metadata) = self.lookup(hash)? {
                out.insert(validator.clone(), metadata);
            }
        }
        Ok(out)
    }

    pub fn invalid_blocks(&self) -> Vec<BlockMetadata> {
        self.invalid_blocks.values().cloned().collect()
    }

    /// Cheap, read-only summary of this snapshot, useful for metrics
    /// reporting by the embedding node.
    pub fn stats(&self) -> RepresentationStats {
        RepresentationStats {
            live_block_count: self.data_lookup.len(),
            invalid_block_count: self.invalid_blocks.len(),
            checkpoint_count: self.checkpoints.len(),
            sort_offset: self.sort_offset,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RepresentationStats {
    pub live_block_count: usize,
    pub invalid_block_count: usize,
    pub checkpoint_count: usize,
    pub sort_offset: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::CheckpointLoader;
    use crate::kv_index::BlockNumberIndexConfig;
    use tempfile::tempdir;

    fn hash(b: u8) -> BlockHash {
        BlockHash::from(vec![b; 4])
    }

    fn build(state: DagState) -> (Representation, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let index = Arc::new(
            BlockNumberIndex::open(&dir.path().join("index"), &BlockNumberIndexConfig::default())
                .unwrap(),
        );
        let loader = Arc::new(CheckpointLoader::new(4));
        let repr = Representation::snapshot(&state, index, loader, 4);
        (repr, dir)
    }

    #[test]
    fn topo_sort_drops_rows_below_start_when_live() {
        let mut state = DagState::empty();
        state.sort_offset = 5;
        state.topo_sort = Arc::new(vec![vec![hash(1)], vec![hash(2)], vec![hash(3)]]);
        let (repr, _dir) = build(state);

        let rows = repr.topo_sort(6).unwrap();
        assert_eq!(rows, vec![vec![hash(2)], vec![hash(3)]]);
    }

    #[test]
    fn topo_sort_tail_mirrors_the_documented_formula_verbatim() {
        let mut state = DagState::empty();
        state.sort_offset = 10;
        state.topo_sort = Arc::new(vec![vec![hash(1)], vec![hash(2)], vec![hash(3)]]);
        let (repr, _dir) = build(state);

        // live_len = 3, n = 2 => start = max(0, 10 - (2 - 3)) = 11, which is
        // past sort_offset so topo_sort(11) drops one live row.
        let rows = repr.topo_sort_tail(2).unwrap();
        assert_eq!(rows, vec![vec![hash(2)], vec![hash(3)]]);
    }

    #[test]
    fn contains_rejects_wrong_length_hashes_without_touching_the_index() {
        let state = DagState::empty();
        let (repr, _dir) = build(state);
        let wrong_length = BlockHash::from(vec![1u8; 3]);
        assert!(!repr.contains(&wrong_length).unwrap());
    }

    #[test]
    fn stats_reports_counts_from_the_snapshot() {
        let mut state = DagState::empty();
        state.sort_offset = 7;
        state.data_lookup = Arc::new(AHashMap::from_iter([(
            hash(1),
            BlockMetadata {
                block_hash: hash(1),
                parents: vec![],
                block_num: 0,
                seq_num: 0,
                sender: Validator::from(vec![]),
                justifications: vec![],
                bonds: vec![],
                invalid: false,
            },
        )]));
        let (repr, _dir) = build(state);

        let stats = repr.stats();
        assert_eq!(stats.live_block_count, 1);
        assert_eq!(stats.invalid_block_count, 0);
        assert_eq!(stats.checkpoint_count, 0);
        assert_eq!(stats.sort_offset, 7);
    }

    #[test]
    fn derive_ordering_ranks_by_flattened_position() {
        let mut state = DagState::empty();
        state.sort_offset = 0;
        state.topo_sort = Arc::new(vec![vec![hash(1), hash(2)], vec![hash(3)]]);
        let (repr, _dir) = build(state);

        let ranks = repr.derive_ordering(0).unwrap();
        assert_eq!(ranks[&hash(1)], 0);
        assert_eq!(ranks[&hash(2)], 1);
        assert_eq!(ranks[&hash(3)], 2);
    }
}
