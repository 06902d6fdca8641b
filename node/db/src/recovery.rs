// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Log recovery.
//!
//! Each of the five logs is replayed independently: decode records
//! front-to-back, stop at the first record that cannot be decoded (a torn
//! trailing write), then reconcile against the sibling CRC file. At most a
//! single record may be dropped; anything beyond that is fatal corruption
//! and recovery refuses to open.

use std::path::{Path, PathBuf};

use blockdag_blocks::{BlockHash, DeployId, Validator};

use crate::append_log::AppendLog;
use crate::crc::crc32_of;
use crate::error::{Error, Result};
use crate::random_access::RandomAccessFile;
use crate::records::{block_hash_by_deploy, equivocation, latest_message, length_prefixed};

/// Outcome of replaying one log's decodable records against its CRC.
struct Recovered<T> {
    records: Vec<T>,
    valid_len: usize,
    truncated: bool,
}

/// Decodes as many records as possible, then accepts either the full
/// decode or the decode minus its last record, whichever's CRC matches
/// what's on disk.
fn recover<T>(
    bytes: &[u8],
    stored_crc: u64,
    mut decode_one: impl FnMut(&[u8]) -> Option<(T, usize)>,
) -> Option<Recovered<T>> {
    let mut records = Vec::new();
    let mut boundaries = vec![0usize];
    let mut offset = 0usize;
    while offset < bytes.len() {
        match decode_one(&bytes[offset..]) {
            Some((value, len)) => {
                offset += len;
                records.push(value);
                boundaries.push(offset);
            }
            None => break,
        }
    }

    if crc32_of(&bytes[..offset]) as u64 == stored_crc {
        let truncated = offset < bytes.len();
        return Some(Recovered {
            records,
            valid_len: offset,
            truncated,
        });
    }

    if boundaries.len() < 2 {
        return None;
    }
    let without_last = boundaries[boundaries.len() - 2];
    if crc32_of(&bytes[..without_last]) as u64 == stored_crc {
        records.pop();
        return Some(Recovered {
            records,
            valid_len: without_last,
            truncated: true,
        });
    }
    None
}

/// Truncates the on-disk log to `valid_len` if recovery dropped a trailing
/// record, logging a warning for the silent tail truncation.
fn reopen_log(
    path: &Path,
    crc_path: PathBuf,
    bytes: &[u8],
    valid_len: usize,
    truncated: bool,
    log_name: &str,
) -> Result<AppendLog> {
    if truncated {
        log::warn!(
            "{log_name} log at {} had a trailing record that did not match its CRC; \
             truncating to {} bytes and dropping it",
            path.display(),
            valid_len
        );
        let mut raf = RandomAccessFile::open_read_write(path)?;
        raf.set_len(valid_len as u64)?;
        raf.sync_all()?;
    }
    AppendLog::open(path.to_path_buf(), crc_path, &bytes[..valid_len])
}

fn finish<T>(
    path: &Path,
    crc_path: PathBuf,
    bytes: &[u8],
    recovered: Recovered<T>,
    log_name: &str,
) -> Result<(Vec<T>, AppendLog)> {
    let log = reopen_log(
        path,
        crc_path,
        bytes,
        recovered.valid_len,
        recovered.truncated,
        log_name,
    )?;
    Ok((recovered.records, log))
}

fn read_log_bytes(path: &Path) -> Result<Vec<u8>> {
    let mut raf = RandomAccessFile::open_read_write(path)?;
    Ok(raf.read_all()?)
}

pub fn recover_latest_messages(
    path: PathBuf,
    crc_path: PathBuf,
    hash_width: usize,
) -> Result<(Vec<(Validator, BlockHash)>, AppendLog)> {
    let bytes = read_log_bytes(&path)?;
    let stored_crc = AppendLog::read_crc(&crc_path)?;
    let recovered = recover(&bytes, stored_crc, |slice| {
        latest_message::decode_one(slice, hash_width)
            .map(|d| ((d.value.validator, d.value.block_hash), d.len))
    })
    .ok_or_else(|| Error::LatestMessagesLogIsCorrupted {
        path: path.clone(),
        stored: stored_crc,
        computed: crc32_of(&bytes) as u64,
    })?;
    finish(&path, crc_path, &bytes, recovered, "latest-messages")
}

pub fn recover_block_metadata(path: PathBuf, crc_path: PathBuf) -> Result<(Vec<Vec<u8>>, AppendLog)> {
    let bytes = read_log_bytes(&path)?;
    let stored_crc = AppendLog::read_crc(&crc_path)?;
    let recovered = recover(&bytes, stored_crc, |slice| {
        length_prefixed::decode_one(slice).map(|d| (d.value.to_vec(), d.len))
    })
    .ok_or_else(|| Error::DataLookupIsCorrupted { path: path.clone() })?;
    finish(&path, crc_path, &bytes, recovered, "block-metadata")
}

pub fn recover_invalid_blocks(path: PathBuf, crc_path: PathBuf) -> Result<(Vec<Vec<u8>>, AppendLog)> {
    let bytes = read_log_bytes(&path)?;
    let stored_crc = AppendLog::read_crc(&crc_path)?;
    let recovered = recover(&bytes, stored_crc, |slice| {
        length_prefixed::decode_one(slice).map(|d| (d.value.to_vec(), d.len))
    })
    .ok_or_else(|| Error::InvalidBlocksIsCorrupted { path: path.clone() })?;
    finish(&path, crc_path, &bytes, recovered, "invalid-blocks")
}

/// Recovers the equivocations-tracker log, then squashes the decoded list
/// by last-write-wins on `(equivocator, baseSeqNum)`.
pub fn recover_equivocations(
    path: PathBuf,
    crc_path: PathBuf,
    hash_width: usize,
) -> Result<(Vec<blockdag_blocks::EquivocationRecord>, AppendLog)> {
    let bytes = read_log_bytes(&path)?;
    let stored_crc = AppendLog::read_crc(&crc_path)?;
    let recovered = recover(&bytes, stored_crc, |slice| {
        equivocation::decode_one(slice, hash_width).map(|d| (d.value, d.len))
    })
    .ok_or_else(|| Error::EquivocationsTrackerLogIsMalformed {
        offset: bytes.len() as u64,
    })?;

    let mut squashed: Vec<blockdag_blocks::EquivocationRecord> = Vec::new();
    for record in recovered.records {
        let mut merged = blockdag_blocks::EquivocationRecord::new(
            record.validator.clone(),
            record.equivocation_base_seq_num,
        );
        for hash in record.detected_block_hashes {
            merged = merged.with_hash(hash);
        }
        if let Some(existing) = squashed.iter_mut().find(|r| r.key() == merged.key()) {
            *existing = merged;
        } else {
            squashed.push(merged);
        }
    }

    let log = reopen_log(
        &path,
        crc_path,
        &bytes,
        recovered.valid_len,
        recovered.truncated,
        "equivocations-tracker",
    )?;
    Ok((squashed, log))
}

pub fn recover_block_hashes_by_deploy(
    path: PathBuf,
    crc_path: PathBuf,
    hash_width: usize,
) -> Result<(Vec<(DeployId, BlockHash)>, AppendLog)> {
    let bytes = read_log_bytes(&path)?;
    let stored_crc = AppendLog::read_crc(&crc_path)?;
    let recovered = recover(&bytes, stored_crc, |slice| {
        block_hash_by_deploy::decode_one(slice, hash_width)
            .map(|d| ((d.value.deploy_id, d.value.block_hash), d.len))
    })
    .ok_or_else(|| Error::BlockHashesByDeployLogIsCorrupted { path: path.clone() })?;
    finish(&path, crc_path, &bytes, recovered, "block-hashes-by-deploy")
}
