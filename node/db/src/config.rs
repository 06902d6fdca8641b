// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Engine configuration: every path and tuning knob `DagStore` needs.

use std::path::{Path, PathBuf};

use crate::kv_index::BlockNumberIndexConfig;

/// Every path and tuning value the engine needs, gathered so callers can
/// point it at an arbitrary data directory (tests use a fresh
/// [`tempfile::TempDir`] per case).
#[derive(Clone, Debug)]
pub struct DagStoreConfig {
    pub latest_messages_log_path: PathBuf,
    pub latest_messages_crc_path: PathBuf,
    pub block_metadata_log_path: PathBuf,
    pub block_metadata_crc_path: PathBuf,
    pub equivocations_tracker_log_path: PathBuf,
    pub equivocations_tracker_crc_path: PathBuf,
    pub invalid_blocks_log_path: PathBuf,
    pub invalid_blocks_crc_path: PathBuf,
    pub block_hashes_by_deploy_log_path: PathBuf,
    pub block_hashes_by_deploy_crc_path: PathBuf,
    pub checkpoints_dir: PathBuf,
    pub block_number_index_dir: PathBuf,
    pub block_number_index: BlockNumberIndexConfig,
    /// `k` in "squash when `latestMessagesLogSize > |latestMessages| * k`".
    /// Default 10.
    pub latest_messages_log_max_size_factor: i32,
    /// Fixed width shared by block hashes and validator ids.
    pub hash_width: usize,
    /// Checkpoint loader LRU capacity.
    pub checkpoint_cache_capacity: usize,
}

impl DagStoreConfig {
    /// Lays out every path under a single `data_dir`.
    pub fn under_data_dir(data_dir: &Path) -> Self {
        Self {
            latest_messages_log_path: data_dir.join("latest-messages.log"),
            latest_messages_crc_path: data_dir.join("latest-messages.crc"),
            block_metadata_log_path: data_dir.join("block-metadata.log"),
            block_metadata_crc_path: data_dir.join("block-metadata.crc"),
            equivocations_tracker_log_path: data_dir.join("equivocations-tracker.log"),
            equivocations_tracker_crc_path: data_dir.join("equivocations-tracker.crc"),
            invalid_blocks_log_path: data_dir.join("invalid-blocks.log"),
            invalid_blocks_crc_path: data_dir.join("invalid-blocks.crc"),
            block_hashes_by_deploy_log_path: data_dir.join("block-hashes-by-deploy.log"),
            block_hashes_by_deploy_crc_path: data_dir.join("block-hashes-by-deploy.crc"),
            checkpoints_dir: data_dir.join("checkpoints"),
            block_number_index_dir: data_dir.join("block-number-index"),
            block_number_index: BlockNumberIndexConfig::default(),
            latest_messages_log_max_size_factor: 10,
            hash_width: 32,
            checkpoint_cache_capacity: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn under_data_dir_nests_every_path_inside_the_given_directory() {
        let config = DagStoreConfig::under_data_dir(Path::new("/data"));
        assert_eq!(config.latest_messages_log_path, Path::new("/data/latest-messages.log"));
        assert_eq!(config.checkpoints_dir, Path::new("/data/checkpoints"));
        assert_eq!(config.block_number_index_dir, Path::new("/data/block-number-index"));
        assert_eq!(config.latest_messages_log_max_size_factor, 10);
    }
}
