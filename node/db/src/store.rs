// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! The top-level engine: `DagStore::open`/`insert`/`getRepresentation`/
//! `clear`/`close`. Everything mutating goes through one
//! [`parking_lot::Mutex`] guarding one plain struct.

use std::sync::Arc;

use parking_lot::Mutex;

use blockdag_blocks::{Block, BlockMetadata};

use crate::append_log::AppendLog;
use crate::checkpoint::{self, CheckpointLoader};
use crate::config::DagStoreConfig;
use crate::equivocations::EquivocationsHandle;
use crate::error::{Error, Result};
use crate::kv_index::{self, BlockNumberIndex};
use crate::records::{block_hash_by_deploy, latest_message, length_prefixed};
use crate::representation::Representation;
use crate::state::{self, DagState};

struct Inner {
    state: DagState,
    latest_messages_log: AppendLog,
    block_metadata_log: AppendLog,
    equivocations_log: AppendLog,
    invalid_blocks_log: AppendLog,
    block_hashes_by_deploy_log: AppendLog,
    index: Arc<BlockNumberIndex>,
    checkpoint_loader: Arc<CheckpointLoader>,
    config: DagStoreConfig,
}

impl Inner {
    fn representation(&self) -> Representation {
        Representation::snapshot(
            &self.state,
            self.index.clone(),
            self.checkpoint_loader.clone(),
            self.config.hash_width,
        )
    }

    /// Squashes the latest-messages log when `latestMessagesLogSize >
    /// |latestMessages| * factor`.
    fn maybe_squash(&mut self) -> Result<()> {
        let threshold =
            self.state.latest_messages.len() as i64 * self.config.latest_messages_log_max_size_factor as i64;
        if (self.state.latest_messages_log_size as i64) <= threshold {
            return Ok(());
        }
        let mut bytes = Vec::new();
        for (validator, hash) in self.state.latest_messages.iter() {
            bytes.extend(latest_message::encode(validator, hash));
        }
        self.latest_messages_log.replace_with(&bytes)?;
        self.state.latest_messages_log_size = 0;
        Ok(())
    }
}

pub struct DagStore {
    inner: Mutex<Inner>,
}

impl DagStore {
    pub fn open(config: DagStoreConfig) -> Result<Self> {
        for path in [
            &config.latest_messages_log_path,
            &config.block_metadata_log_path,
            &config.equivocations_tracker_log_path,
            &config.invalid_blocks_log_path,
            &config.block_hashes_by_deploy_log_path,
        ] {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::create_dir_all(&config.checkpoints_dir)?;

        let checkpoints = checkpoint::list_checkpoints(&config.checkpoints_dir)?;
        let sort_offset = checkpoints.last().map(|c| c.end).unwrap_or(0);

        let (latest_message_records, latest_messages_log) = crate::recovery::recover_latest_messages(
            config.latest_messages_log_path.clone(),
            config.latest_messages_crc_path.clone(),
            config.hash_width,
        )?;
        let latest_messages_log_size = latest_message_records.len() as i32;
        let mut latest_messages = ahash::AHashMap::default();
        for (validator, hash) in latest_message_records {
            latest_messages.insert(validator, hash);
        }

        let (metadata_payloads, block_metadata_log) = crate::recovery::recover_block_metadata(
            config.block_metadata_log_path.clone(),
            config.block_metadata_crc_path.clone(),
        )?;
        let mut data_lookup = ahash::AHashMap::default();
        let mut child_map = ahash::AHashMap::default();
        let mut topo_sort: Vec<Vec<blockdag_blocks::BlockHash>> = Vec::new();
        for bytes in &metadata_payloads {
            let metadata = BlockMetadata::from_bytes(bytes)?;
            state::update_child_map(&mut child_map, &metadata.parents, &metadata.block_hash);
            state::update_topo_sort(
                &mut topo_sort,
                sort_offset,
                metadata.block_num,
                metadata.block_hash.clone(),
            );
            data_lookup.insert(metadata.block_hash.clone(), metadata);
        }

        let (invalid_payloads, invalid_blocks_log) = crate::recovery::recover_invalid_blocks(
            config.invalid_blocks_log_path.clone(),
            config.invalid_blocks_crc_path.clone(),
        )?;
        let mut invalid_blocks = ahash::AHashMap::default();
        for bytes in &invalid_payloads {
            let metadata = BlockMetadata::from_bytes(bytes)?;
            invalid_blocks.insert(metadata.block_hash.clone(), metadata);
        }

        let (equivocation_records, equivocations_log) = crate::recovery::recover_equivocations(
            config.equivocations_tracker_log_path.clone(),
            config.equivocations_tracker_crc_path.clone(),
            config.hash_width,
        )?;
        let mut equivocations_tracker = ahash::AHashMap::default();
        for record in equivocation_records {
            equivocations_tracker.insert(record.key(), record);
        }

        let (deploy_pairs, block_hashes_by_deploy_log) = crate::recovery::recover_block_hashes_by_deploy(
            config.block_hashes_by_deploy_log_path.clone(),
            config.block_hashes_by_deploy_crc_path.clone(),
            config.hash_width,
        )?;
        let mut block_hashes_by_deploy = ahash::AHashMap::default();
        for (deploy_id, hash) in deploy_pairs {
            block_hashes_by_deploy.insert(deploy_id, hash);
        }

        let index = Arc::new(BlockNumberIndex::open(
            &config.block_number_index_dir,
            &config.block_number_index,
        )?);
        let checkpoint_loader = Arc::new(CheckpointLoader::new(config.checkpoint_cache_capacity));

        let state = DagState {
            latest_messages: Arc::new(latest_messages),
            child_map: Arc::new(child_map),
            data_lookup: Arc::new(data_lookup),
            topo_sort: Arc::new(topo_sort),
            block_hashes_by_deploy: Arc::new(block_hashes_by_deploy),
            equivocations_tracker: Arc::new(equivocations_tracker),
            invalid_blocks: Arc::new(invalid_blocks),
            sort_offset,
            checkpoints: Arc::new(checkpoints),
            latest_messages_log_size,
        };

        Ok(Self {
            inner: Mutex::new(Inner {
                state,
                latest_messages_log,
                block_metadata_log,
                equivocations_log,
                invalid_blocks_log,
                block_hashes_by_deploy_log,
                index,
                checkpoint_loader,
                config,
            }),
        })
    }

    /// `insert(block, genesis, invalid) → representation`.
    pub fn insert(&self, block: &Block, genesis: &Block, invalid: bool) -> Result<Representation> {
        let mut inner = self.inner.lock();

        if inner.state.data_lookup.contains_key(&block.block_hash) {
            log::warn!(
                "block {block_hash:?} already present; insert is a no-op",
                block_hash = block.block_hash
            );
            return Ok(inner.representation());
        }

        if block.block_hash.len() != inner.config.hash_width {
            return Err(Error::BlockHashIsMalformed {
                block_hash: format!("{:?}", block.block_hash),
                hash_len: block.block_hash.len(),
                expected: inner.config.hash_width,
            });
        }

        // Validate everything before mutating anything, so a malformed
        // block leaves state untouched, even though sender validation
        // conceptually belongs later in the mutation order below.
        let metadata = BlockMetadata::from_block(block, invalid);
        let mut new_latest_message_pairs: Vec<_> = metadata
            .new_validators()
            .into_iter()
            .map(|validator| (validator, genesis.block_hash.clone()))
            .collect();

        if block.sender.is_empty() {
            log::warn!(
                "block {block_hash:?} has an empty sender; proceeding without a sender \
                 latest-message entry (expected for genesis)",
                block_hash = block.block_hash
            );
        } else if block.sender.len() == inner.config.hash_width {
            new_latest_message_pairs.push((block.sender.clone(), block.block_hash.clone()));
        } else {
            return Err(Error::BlockSenderIsMalformed {
                block_hash: format!("{:?}", block.block_hash),
                sender_len: block.sender.len(),
                expected: inner.config.hash_width,
            });
        }

        // 1. squash if over threshold.
        inner.maybe_squash()?;

        // 3/4. invalid-block set, data lookup.
        if invalid {
            Arc::make_mut(&mut inner.state.invalid_blocks)
                .insert(block.block_hash.clone(), metadata.clone());
        }
        Arc::make_mut(&mut inner.state.data_lookup).insert(block.block_hash.clone(), metadata.clone());

        // 5. child map.
        state::update_child_map(
            Arc::make_mut(&mut inner.state.child_map),
            &block.parents,
            &block.block_hash,
        );

        // 6. topological sort.
        let sort_offset = inner.state.sort_offset;
        state::update_topo_sort(
            Arc::make_mut(&mut inner.state.topo_sort),
            sort_offset,
            block.block_num,
            block.block_hash.clone(),
        );

        // 8. latest messages.
        state::merge_latest_messages(
            Arc::make_mut(&mut inner.state.latest_messages),
            new_latest_message_pairs.clone(),
        );

        // 9. block-number index.
        inner.index.put(&block.block_hash, block.block_num)?;

        // 10. deploy index.
        for deploy_id in &block.deploy_signatures {
            Arc::make_mut(&mut inner.state.block_hashes_by_deploy)
                .insert(deploy_id.clone(), block.block_hash.clone());
        }

        // 11. persist: latest-messages, block-metadata, invalid (if any), deploy-index.
        for (validator, hash) in &new_latest_message_pairs {
            let bytes = latest_message::encode(validator, hash);
            inner.latest_messages_log.append(&bytes)?;
            inner.state.latest_messages_log_size += 1;
        }
        let metadata_bytes = length_prefixed::encode(&metadata.to_bytes()?);
        inner.block_metadata_log.append(&metadata_bytes)?;
        if invalid {
            inner.invalid_blocks_log.append(&metadata_bytes)?;
        }
        for deploy_id in &block.deploy_signatures {
            let bytes = block_hash_by_deploy::encode(deploy_id, &block.block_hash);
            inner.block_hashes_by_deploy_log.append(&bytes)?;
        }

        Ok(inner.representation())
    }

    pub fn get_representation(&self) -> Representation {
        self.inner.lock().representation()
    }

    pub fn access_equivocations_tracker<F, A>(&self, f: F) -> Result<A>
    where
        F: FnOnce(&mut EquivocationsHandle) -> Result<A>,
    {
        let mut inner = self.inner.lock();
        let Inner {
            state,
            equivocations_log,
            ..
        } = &mut *inner;
        let mut handle = EquivocationsHandle::new(state, equivocations_log);
        f(&mut handle)
    }

    /// Closes all streams; truncates all five logs to empty; zeros all
    /// in-memory state; reopens append streams; drops the block-number
    /// index.
    pub fn clear(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.latest_messages_log.clear()?;
        inner.block_metadata_log.clear()?;
        inner.equivocations_log.clear()?;
        inner.invalid_blocks_log.clear()?;
        inner.block_hashes_by_deploy_log.clear()?;
        inner.state = DagState::empty();
        kv_index::drop_index(&inner.config.block_number_index_dir)?;
        inner.index = Arc::new(BlockNumberIndex::open(
            &inner.config.block_number_index_dir,
            &inner.config.block_number_index,
        )?);
        Ok(())
    }

    /// Closes all streams and the index; does not delete data.
    pub fn close(&self) -> Result<()> {
        let inner = self.inner.lock();
        inner.latest_messages_log.sync()?;
        inner.block_metadata_log.sync()?;
        inner.equivocations_log.sync()?;
        inner.invalid_blocks_log.sync()?;
        inner.block_hashes_by_deploy_log.sync()?;
        Ok(())
    }

    /// No-op: checkpoint rotation is not implemented by this engine. See
    /// DESIGN.md for why this is left as a no-op.
    pub fn checkpoint(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockdag_blocks::{BlockHash, DeployId, Validator};
    use tempfile::tempdir;

    fn make_config(dir: &std::path::Path) -> DagStoreConfig {
        DagStoreConfig::under_data_dir(dir)
    }

    fn genesis() -> Block {
        Block {
            block_hash: BlockHash::from(vec![0u8; 32]),
            parents: Vec::new(),
            block_num: 0,
            seq_num: 0,
            sender: Validator::from(Vec::new()),
            justifications: Vec::new(),
            bonds: Vec::new(),
            deploy_signatures: Vec::new(),
        }
    }

    fn child_block(hash: u8, parent: &Block, sender: u8) -> Block {
        Block {
            block_hash: BlockHash::from(vec![hash; 32]),
            parents: vec![parent.block_hash.clone()],
            block_num: parent.block_num + 1,
            seq_num: 0,
            sender: Validator::from(vec![sender; 32]),
            justifications: Vec::new(),
            bonds: vec![(Validator::from(vec![sender; 32]), 100)],
            deploy_signatures: vec![DeployId::from(vec![hash; 6])],
        }
    }

    #[test]
    fn insert_then_reopen_reconstructs_the_same_state() {
        let dir = tempdir().unwrap();
        let genesis = genesis();

        {
            let store = DagStore::open(make_config(dir.path())).unwrap();
            let a = child_block(1, &genesis, 9);
            let b = child_block(2, &a, 9);
            store.insert(&a, &genesis, false).unwrap();
            store.insert(&b, &genesis, false).unwrap();
        }

        let store = DagStore::open(make_config(dir.path())).unwrap();
        let repr = store.get_representation();
        let a_hash = BlockHash::from(vec![1u8; 32]);
        let b_hash = BlockHash::from(vec![2u8; 32]);
        assert!(repr.contains(&a_hash).unwrap());
        assert!(repr.contains(&b_hash).unwrap());
    }

    #[test]
    fn insert_is_idempotent_on_duplicate_block_hash() {
        let dir = tempdir().unwrap();
        let store = DagStore::open(make_config(dir.path())).unwrap();
        let genesis = genesis();
        let a = child_block(1, &genesis, 9);

        let first = store.insert(&a, &genesis, false).unwrap();
        let second = store.insert(&a, &genesis, false).unwrap();

        assert_eq!(
            first.lookup(&a.block_hash).unwrap(),
            second.lookup(&a.block_hash).unwrap()
        );
    }

    #[test]
    fn insert_rejects_a_malformed_sender_and_leaves_state_unchanged() {
        let dir = tempdir().unwrap();
        let store = DagStore::open(make_config(dir.path())).unwrap();
        let genesis = genesis();
        let mut a = child_block(1, &genesis, 9);
        a.sender = Validator::from(vec![1u8; 17]);

        let err = store.insert(&a, &genesis, false).unwrap_err();
        assert!(matches!(err, Error::BlockSenderIsMalformed { .. }));

        let repr = store.get_representation();
        assert!(!repr.contains(&a.block_hash).unwrap());
    }

    #[test]
    fn clear_empties_all_state() {
        let dir = tempdir().unwrap();
        let store = DagStore::open(make_config(dir.path())).unwrap();
        let genesis = genesis();
        let a = child_block(1, &genesis, 9);
        store.insert(&a, &genesis, false).unwrap();

        store.clear().unwrap();

        let repr = store.get_representation();
        assert!(!repr.contains(&a.block_hash).unwrap());
    }
}
