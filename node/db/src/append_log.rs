// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! A bounded append-only log file paired with a sibling CRC file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::crc::{parse_crc_file, CrcAccumulator};
use crate::error::Result;

/// One of the five append logs plus its `.crc` sibling.
///
/// The CRC accumulator tracks the checksum of everything currently in the
/// file; every [`AppendLog::append`] extends both the file and the
/// accumulator together, then commits the new digest via an atomic rename
/// over the `.crc` file. That rename is the sole commit point: readers
/// opening the log later trust the `.crc` file over the log's apparent
/// length.
pub struct AppendLog {
    path: PathBuf,
    crc_path: PathBuf,
    file: File,
    crc: CrcAccumulator,
}

impl AppendLog {
    /// Opens (or creates) the log for appending, seeding the CRC
    /// accumulator from `initial_bytes` — the bytes recovery has already
    /// determined are the valid prefix of the file.
    pub fn open(path: PathBuf, crc_path: PathBuf, initial_bytes: &[u8]) -> Result<Self> {
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&path)?;
        Ok(Self {
            path,
            crc_path,
            file,
            crc: CrcAccumulator::from_bytes(initial_bytes),
        })
    }

    /// Reads the sibling `.crc` file, defaulting to 0 if it is missing,
    /// empty, or shorter than 8 bytes.
    pub fn read_crc(crc_path: &Path) -> Result<u64> {
        match std::fs::read(crc_path) {
            Ok(bytes) => Ok(parse_crc_file(&bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    /// Appends `record`, flushes it to disk, then atomically commits the
    /// updated CRC. The append and the CRC commit are two separate
    /// durability events; a crash between them is exactly what recovery's
    /// tail-truncation step is built to repair.
    pub fn append(&mut self, record: &[u8]) -> Result<()> {
        self.file.write_all(record)?;
        self.file.flush()?;
        self.file.sync_all()?;
        self.crc.update(record);
        self.commit_crc()
    }

    fn commit_crc(&self) -> Result<()> {
        blockdag_utils::atomic_write_synced_dir(&self.crc_path, &self.crc.digest_be_bytes())?;
        Ok(())
    }

    /// Replaces the log's entire contents with `new_contents` (squashing
    /// the latest-messages log, or truncating to empty on `clear`),
    /// commits the matching CRC, then reopens the append stream on the
    /// freshly-written file.
    pub fn replace_with(&mut self, new_contents: &[u8]) -> Result<()> {
        blockdag_utils::atomic_write_synced_dir(&self.path, new_contents)?;
        self.crc = CrcAccumulator::from_bytes(new_contents);
        self.commit_crc()?;
        self.file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)?;
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.replace_with(&[])
    }

    /// Flushes the underlying file without consuming the log, used by
    /// `DagStore::close` which does not own the logs outright.
    pub fn sync(&self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    pub fn close(self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    pub fn crc(&self) -> u32 {
        self.crc.digest()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
