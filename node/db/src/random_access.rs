// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Positioned file access used during log recovery.
//!
//! Recovery needs to read a log front-to-back and, if the tail turns out to
//! be a partial record, truncate the file to drop it. A plain
//! [`std::fs::File`] already does this; this wrapper just names the
//! operations so recovery code reads as a direct translation of the
//! recovery algorithm.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

pub struct RandomAccessFile {
    file: File,
}

impl RandomAccessFile {
    pub fn open_read_write(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        Ok(Self { file })
    }

    pub fn len(&self) -> std::io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    pub fn is_empty(&self) -> std::io::Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Reads the entire file from the start into memory. Logs in this
    /// engine are replayed whole on open; there is no need for partial
    /// streaming reads since the five logs are bounded by checkpoint
    /// rotation in practice.
    pub fn read_all(&mut self) -> std::io::Result<Vec<u8>> {
        self.file.seek(SeekFrom::Start(0))?;
        let mut buf = Vec::with_capacity(self.len()? as usize);
        self.file.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Truncates the file to exactly `len` bytes, used to drop a partial
    /// trailing record detected during recovery.
    pub fn set_len(&mut self, len: u64) -> std::io::Result<()> {
        self.file.set_len(len)
    }

    pub fn sync_all(&self) -> std::io::Result<()> {
        self.file.sync_all()
    }
}
