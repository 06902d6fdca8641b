// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! S1 and S4: recovery of a torn trailing record and of a zero-byte CRC
//! file, both against real files on disk.

mod support;

use blockdag_db::DagStore;
use tempfile::tempdir;

/// S1 — recovery drops a partial last record.
///
/// Insert three blocks `A, B, C`. After `C`'s block-metadata record and CRC
/// have been committed, truncate the block-metadata log by exactly 5
/// bytes, simulating a torn trailing write. Reopening must succeed with
/// `dataLookup` containing `{A, B}` but not `C`.
#[test]
fn recovery_drops_a_partial_trailing_record() {
    let dir = tempdir().unwrap();
    let config = support::make_config(dir.path());
    let genesis = support::genesis();

    {
        let store = DagStore::open(config.clone()).unwrap();
        let a = support::child_block(1, &genesis, 9);
        let b = support::child_block(2, &a, 9);
        let c = support::child_block(3, &b, 9);
        store.insert(&a, &genesis, false).unwrap();
        store.insert(&b, &genesis, false).unwrap();
        store.insert(&c, &genesis, false).unwrap();
        store.close().unwrap();
    }

    let log_len = std::fs::metadata(&config.block_metadata_log_path).unwrap().len();
    let truncated_len = log_len - 5;
    let file = std::fs::OpenOptions::new()
        .write(true)
        .open(&config.block_metadata_log_path)
        .unwrap();
    file.set_len(truncated_len).unwrap();
    drop(file);

    let store = DagStore::open(config).unwrap();
    let repr = store.get_representation();

    let a_hash = blockdag_blocks::BlockHash::from(vec![1u8; 32]);
    let b_hash = blockdag_blocks::BlockHash::from(vec![2u8; 32]);
    let c_hash = blockdag_blocks::BlockHash::from(vec![3u8; 32]);
    assert!(repr.lookup(&a_hash).unwrap().is_some());
    assert!(repr.lookup(&b_hash).unwrap().is_some());
    assert!(repr.lookup(&c_hash).unwrap().is_none());
    assert!(!repr.contains(&c_hash).unwrap());
}

/// S4 — malformed (zero-byte) CRC file.
///
/// A zero-byte `latest-messages.crc` reads back as CRC 0 with a warning;
/// `latestMessages` is empty, and the log stays usable for a subsequent
/// insert.
#[test]
fn zero_byte_crc_file_is_treated_as_crc_zero() {
    let dir = tempdir().unwrap();
    let config = support::make_config(dir.path());
    std::fs::create_dir_all(config.latest_messages_log_path.parent().unwrap()).unwrap();
    std::fs::write(&config.latest_messages_log_path, b"").unwrap();
    std::fs::write(&config.latest_messages_crc_path, b"").unwrap();

    let store = DagStore::open(config).unwrap();
    let repr = store.get_representation();
    assert!(repr.latest_message_hashes().is_empty());

    let genesis = support::genesis();
    let a = support::child_block(1, &genesis, 9);
    store.insert(&a, &genesis, false).unwrap();
    assert!(store.get_representation().contains(&a.block_hash).unwrap());
}
