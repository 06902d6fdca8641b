// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! The block-hash → block-number index.
//!
//! Backed by [`parity_db`], an embedded transactional key-value store.
//! Recovery for this index is entirely delegated to `parity_db`'s own
//! commit log — it keeps its own transactional guarantees and needs no
//! CRC pairing here.

use std::path::Path;

use blockdag_blocks::BlockHash;

use crate::error::Result;

const BLOCK_NUMBER_COLUMN: u8 = 0;

/// Tuning knobs carried over from an earlier LMDB-style interface.
/// `parity_db` manages its own memory mapping and reader accounting, so
/// these are accepted for interface compatibility and otherwise unused;
/// see DESIGN.md.
#[derive(Clone, Debug)]
pub struct BlockNumberIndexConfig {
    pub map_size: u64,
    pub max_dbs: u32,
    pub max_readers: u32,
    pub no_tls: bool,
}

impl Default for BlockNumberIndexConfig {
    fn default() -> Self {
        Self {
            map_size: 1 << 30,
            max_dbs: 8,
            max_readers: 126,
            no_tls: false,
        }
    }
}

/// The block-hash → block-number index.
pub struct BlockNumberIndex {
    db: parity_db::Db,
}

impl BlockNumberIndex {
    pub fn open(dir: &Path, _config: &BlockNumberIndexConfig) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let options = parity_db::Options::with_columns(dir, 1);
        let db = parity_db::Db::open_or_create(&options)?;
        Ok(Self { db })
    }

    pub fn get(&self, block_hash: &BlockHash) -> Result<Option<i64>> {
        let raw = self.db.get(BLOCK_NUMBER_COLUMN, block_hash.as_bytes())?;
        Ok(raw.map(|bytes| decode_i64(&bytes)))
    }

    pub fn put(&self, block_hash: &BlockHash, block_num: i64) -> Result<()> {
        self.db.commit(vec![(
            BLOCK_NUMBER_COLUMN,
            block_hash.as_bytes().to_vec(),
            Some(encode_i64(block_num).to_vec()),
        )])?;
        Ok(())
    }

    pub fn contains(&self, block_hash: &BlockHash) -> Result<bool> {
        Ok(self.get(block_hash)?.is_some())
    }
}

/// Drops (deletes) the index's on-disk directory — used by `DagStore::clear`.
pub fn drop_index(dir: &Path) -> std::io::Result<()> {
    if dir.exists() {
        std::fs::remove_dir_all(dir)?;
    }
    Ok(())
}

pub fn encode_i64(value: i64) -> [u8; 8] {
    value.to_be_bytes()
}

pub fn decode_i64(bytes: &[u8]) -> i64 {
    let mut buf = [0u8; 8];
    let n = bytes.len().min(8);
    buf[8 - n..].copy_from_slice(&bytes[bytes.len() - n..]);
    i64::from_be_bytes(buf)
}
