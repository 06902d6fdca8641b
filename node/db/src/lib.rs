// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Crash-consistent append-only block DAG storage engine.
//!
//! This crate is the persistence core of a block DAG: five CRC-paired
//! append logs with single-record crash recovery, a checkpointed cold
//! tier with an LRU-cached loader, a block-hash → block-number index, and
//! a single-writer-mutex write path (`insert`) that keeps all of it in
//! sync. Everything else — block validation, the fork-choice estimator,
//! wire transport — is expected to sit on top of [`DagStore`] and the
//! read-only [`Representation`] it hands back.

mod append_log;
mod checkpoint;
mod config;
mod crc;
mod equivocations;
mod error;
mod kv_index;
mod random_access;
mod records;
mod recovery;
mod representation;
mod state;
mod store;

pub use checkpoint::{Checkpoint, CheckpointLoader, CheckpointedDagInfo};
pub use config::DagStoreConfig;
pub use equivocations::EquivocationsHandle;
pub use error::{Error, Result};
pub use kv_index::{BlockNumberIndex, BlockNumberIndexConfig};
pub use representation::{Representation, RepresentationStats};
pub use state::DagState;
pub use store::DagStore;
