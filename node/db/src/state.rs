// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! The in-memory DAG aggregate and its pure update functions.
//!
//! Every collection is held behind an [`Arc`]. Building a read
//! representation (see [`crate::representation`]) is then just cloning a
//! handful of `Arc`s under the mutex; mutating state goes through
//! [`Arc::make_mut`], which clones the underlying map only if a snapshot
//! is still holding a reference to it. This keeps reads and writes from
//! contending with each other beyond the mutex itself.

use std::collections::BTreeSet;
use std::sync::Arc;

use ahash::AHashMap;

use blockdag_blocks::{BlockHash, BlockMetadata, DeployId, EquivocationRecord, Validator};

use crate::checkpoint::Checkpoint;

/// The mutable aggregate guarded by [`crate::store::DagStore`]'s mutex.
pub struct DagState {
    pub latest_messages: Arc<AHashMap<Validator, BlockHash>>,
    pub child_map: Arc<AHashMap<BlockHash, BTreeSet<BlockHash>>>,
    pub data_lookup: Arc<AHashMap<BlockHash, BlockMetadata>>,
    pub topo_sort: Arc<Vec<Vec<BlockHash>>>,
    pub block_hashes_by_deploy: Arc<AHashMap<DeployId, BlockHash>>,
    pub equivocations_tracker: Arc<AHashMap<(Validator, i32), EquivocationRecord>>,
    pub invalid_blocks: Arc<AHashMap<BlockHash, BlockMetadata>>,
    pub sort_offset: i64,
    pub checkpoints: Arc<Vec<Checkpoint>>,
    pub latest_messages_log_size: i32,
}

impl DagState {
    pub fn empty() -> Self {
        Self {
            latest_messages: Arc::new(AHashMap::default()),
            child_map: Arc::new(AHashMap::default()),
            data_lookup: Arc::new(AHashMap::default()),
            topo_sort: Arc::new(Vec::new()),
            block_hashes_by_deploy: Arc::new(AHashMap::default()),
            equivocations_tracker: Arc::new(AHashMap::default()),
            invalid_blocks: Arc::new(AHashMap::default()),
            sort_offset: 0,
            checkpoints: Arc::new(Vec::new()),
            latest_messages_log_size: 0,
        }
    }
}

/// Ensures `child_map` has an (possibly empty) entry for `block_hash`, then
/// records `block_hash` as a child of every entry in `parents`.
pub fn update_child_map(
    child_map: &mut AHashMap<BlockHash, BTreeSet<BlockHash>>,
    parents: &[BlockHash],
    block_hash: &BlockHash,
) {
    child_map.entry(block_hash.clone()).or_default();
    for parent in parents {
        child_map
            .entry(parent.clone())
            .or_default()
            .insert(block_hash.clone());
    }
}

/// Pure over `(topoSort, sortOffset, block)`: extends `topo_sort` with
/// empty rows as needed so that row `blockNum - sortOffset` exists, then
/// appends `block_hash` to it.
pub fn update_topo_sort(
    topo_sort: &mut Vec<Vec<BlockHash>>,
    sort_offset: i64,
    block_num: i64,
    block_hash: BlockHash,
) {
    let row = (block_num - sort_offset) as usize;
    if row >= topo_sort.len() {
        topo_sort.resize(row + 1, Vec::new());
    }
    topo_sort[row].push(block_hash);
}

/// Merges `pairs` into `latest_messages`, last write wins per validator
/// key.
pub fn merge_latest_messages(
    latest_messages: &mut AHashMap<Validator, BlockHash>,
    pairs: impl IntoIterator<Item = (Validator, BlockHash)>,
) {
    for (validator, hash) in pairs {
        latest_messages.insert(validator, hash);
    }
}
