// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::path::PathBuf;

/// Errors raised by the block DAG storage engine.
///
/// Everything under `*Corrupted`/`*Malformed` is raised at `open` when
/// recovery cannot account for a log's trailing bytes with a single-record
/// truncation; everything else can also surface at runtime from `insert`.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("latest-messages log is malformed at byte offset {offset}")]
    LatestMessagesLogIsMalformed { offset: u64 },

    #[error(
        "latest-messages log is corrupted: stored crc {stored:#x} does not match computed crc \
         {computed:#x} even after dropping the last record (path: {path})"
    )]
    LatestMessagesLogIsCorrupted {
        path: PathBuf,
        stored: u64,
        computed: u64,
    },

    #[error("block-metadata log is corrupted beyond single-record recovery (path: {path})")]
    DataLookupIsCorrupted { path: PathBuf },

    #[error("equivocations-tracker log is malformed at byte offset {offset}")]
    EquivocationsTrackerLogIsMalformed { offset: u64 },

    #[error("invalid-blocks log is corrupted beyond single-record recovery (path: {path})")]
    InvalidBlocksIsCorrupted { path: PathBuf },

    #[error(
        "block-hashes-by-deploy log is corrupted beyond single-record recovery (path: {path})"
    )]
    BlockHashesByDeployLogIsCorrupted { path: PathBuf },

    #[error("checkpoints do not start from zero: {0:?}")]
    CheckpointsDoNotStartFromZero(Vec<PathBuf>),

    #[error("checkpoints are not consecutive: {0:?}")]
    CheckpointsAreNotConsecutive(Vec<PathBuf>),

    #[error("topological sort slice length {0} exceeds the platform maximum")]
    TopoSortLengthIsTooBig(usize),

    #[error("block {block_hash} has a malformed sender of length {sender_len} (expected 0 or {expected})")]
    BlockSenderIsMalformed {
        block_hash: String,
        sender_len: usize,
        expected: usize,
    },

    #[error("block {block_hash} has a malformed hash of length {hash_len} (expected {expected})")]
    BlockHashIsMalformed {
        block_hash: String,
        hash_len: usize,
        expected: usize,
    },

    #[error("block-metadata codec error: {0}")]
    Codec(#[from] blockdag_blocks::Error),

    #[error("block-number index error: {0}")]
    Index(#[from] parity_db::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
