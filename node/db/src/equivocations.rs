// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! The equivocations tracker sub-interface: a scoped, mutex-held handle
//! exposing `records`, `insert`, `update` to callers of
//! [`crate::store::DagStore::access_equivocations_tracker`].

use std::sync::Arc;

use blockdag_blocks::{BlockHash, EquivocationRecord};

use crate::append_log::AppendLog;
use crate::error::Result;
use crate::records::equivocation;
use crate::state::DagState;

pub struct EquivocationsHandle<'a> {
    state: &'a mut DagState,
    log: &'a mut AppendLog,
}

impl<'a> EquivocationsHandle<'a> {
    pub(crate) fn new(state: &'a mut DagState, log: &'a mut AppendLog) -> Self {
        Self { state, log }
    }

    pub fn records(&self) -> Vec<EquivocationRecord> {
        self.state.equivocations_tracker.values().cloned().collect()
    }

    /// `insertEquivocationRecord(r)`: adds `r` and appends it to the log.
    pub fn insert(&mut self, record: EquivocationRecord) -> Result<()> {
        self.append(&record)?;
        Arc::make_mut(&mut self.state.equivocations_tracker).insert(record.key(), record);
        Ok(())
    }

    /// `updateEquivocationRecord(r, newHash)`: creates `r' = r with hashes
    /// += newHash`, removes `r` from memory, adds `r'`, and appends `r'`
    /// to the log. The stale `r` bytes already in the log are left alone
    /// — squash on next recovery collapses them via last-write-wins.
    pub fn update(&mut self, record: &EquivocationRecord, new_hash: BlockHash) -> Result<()> {
        let updated = record.with_hash(new_hash);
        self.append(&updated)?;
        let map = Arc::make_mut(&mut self.state.equivocations_tracker);
        map.remove(&record.key());
        map.insert(updated.key(), updated);
        Ok(())
    }

    fn append(&mut self, record: &EquivocationRecord) -> Result<()> {
        let hashes: Vec<BlockHash> = record.detected_block_hashes.iter().cloned().collect();
        let bytes = equivocation::encode(&record.equivocator, record.equivocation_base_seq_num, &hashes);
        self.log.append(&bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result as DbResult;
    use blockdag_blocks::Validator;
    use tempfile::tempdir;

    fn open_log(dir: &std::path::Path) -> AppendLog {
        AppendLog::open(dir.join("eq.log"), dir.join("eq.crc"), &[]).unwrap()
    }

    #[test]
    fn insert_adds_to_memory_and_appends_to_log() -> DbResult<()> {
        let dir = tempdir().unwrap();
        let mut state = DagState::empty();
        let mut log = open_log(dir.path());
        let mut handle = EquivocationsHandle::new(&mut state, &mut log);

        let record = EquivocationRecord::new(Validator::from(vec![1u8; 4]), 3);
        handle.insert(record.clone())?;

        assert_eq!(handle.records().len(), 1);
        assert!(log.path().metadata().unwrap().len() > 0);
        Ok(())
    }

    #[test]
    fn update_replaces_the_record_in_memory_but_keeps_appending() -> DbResult<()> {
        let dir = tempdir().unwrap();
        let mut state = DagState::empty();
        let mut log = open_log(dir.path());
        let validator = Validator::from(vec![2u8; 4]);
        let original = EquivocationRecord::new(validator.clone(), 9);

        {
            let mut handle = EquivocationsHandle::new(&mut state, &mut log);
            handle.insert(original.clone())?;
        }

        let new_hash = BlockHash::from(vec![5u8; 4]);
        {
            let mut handle = EquivocationsHandle::new(&mut state, &mut log);
            handle.update(&original, new_hash.clone())?;
        }

        let records = state.equivocations_tracker.values().collect::<Vec<_>>();
        assert_eq!(records.len(), 1);
        assert!(records[0].detected_block_hashes.contains(&new_hash));
        Ok(())
    }
}
