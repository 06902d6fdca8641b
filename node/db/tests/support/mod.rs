// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Shared fixtures for the crash-recovery and consistency integration tests.

use blockdag_blocks::{Block, BlockHash, DeployId, Validator};
use blockdag_db::DagStoreConfig;

pub fn make_config(dir: &std::path::Path) -> DagStoreConfig {
    DagStoreConfig::under_data_dir(dir)
}

pub fn genesis() -> Block {
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

pub fn child_block(hash: u8, parent: &Block, sender: u8) -> Block {
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
