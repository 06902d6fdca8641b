// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Per-log record framing: each append log has its own fixed layout.
//!
//! Every record format here is self-delimiting: `decode_one` consumes
//! exactly one record from the front of a byte slice and reports how many
//! bytes it used, so recovery can walk a log front-to-back and knows the
//! exact byte offset of a truncated tail record.

use blockdag_blocks::BlockHash;

/// One decoded record plus the number of bytes it occupied in the log.
pub struct Decoded<T> {
    pub value: T,
    pub len: usize,
}

fn read_i32(bytes: &[u8], offset: usize) -> Option<i32> {
    bytes
        .get(offset..offset + 4)
        .map(|s| i32::from_be_bytes(s.try_into().unwrap()))
}

/// `latest-messages` log: `validator || blockHash`, both fixed-width
/// [`BlockHash`]-sized buffers.
pub mod latest_message {
    use super::*;

    pub struct Record {
        pub validator: BlockHash,
        pub block_hash: BlockHash,
    }

    pub fn encode(validator: &BlockHash, block_hash: &BlockHash) -> Vec<u8> {
        let mut buf = Vec::with_capacity(validator.len() + block_hash.len());
        buf.extend_from_slice(validator.as_bytes());
        buf.extend_from_slice(block_hash.as_bytes());
        buf
    }

    /// Decodes one record given the fixed hash width in use. Returns `None`
    /// if fewer than `2 * hash_width` bytes remain (a partial trailing
    /// record for recovery to truncate).
    pub fn decode_one(bytes: &[u8], hash_width: usize) -> Option<Decoded<Record>> {
        let total = hash_width * 2;
        if bytes.len() < total {
            return None;
        }
        let validator = BlockHash::from(&bytes[..hash_width]);
        let block_hash = BlockHash::from(&bytes[hash_width..total]);
        Some(Decoded {
            value: Record {
                validator,
                block_hash,
            },
            len: total,
        })
    }
}

/// `block-metadata` (data lookup) and `invalid-blocks` logs: a big-endian
/// `i32` length prefix followed by that many bytes of bincode-encoded
/// [`blockdag_blocks::BlockMetadata`].
pub mod length_prefixed {
    use super::*;

    pub fn encode(payload: &[u8]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + payload.len());
        buf.extend_from_slice(&(payload.len() as i32).to_be_bytes());
        buf.extend_from_slice(payload);
        buf
    }

    /// Decodes one length-prefixed record. Returns `None` if the length
    /// prefix itself is incomplete, the declared length is negative, or
    /// fewer than `size` payload bytes remain.
    pub fn decode_one(bytes: &[u8]) -> Option<Decoded<&[u8]>> {
        let size = read_i32(bytes, 0)?;
        if size < 0 {
            return None;
        }
        let size = size as usize;
        let payload = bytes.get(4..4 + size)?;
        Some(Decoded {
            value: payload,
            len: 4 + size,
        })
    }
}

/// `equivocations-tracker` log: `validator || seqNum:i32 || count:i32 ||
/// hash * count`.
pub mod equivocation {
    use super::*;

    pub struct Record {
        pub validator: BlockHash,
        pub equivocation_base_seq_num: i32,
        pub detected_block_hashes: Vec<BlockHash>,
    }

    pub fn encode(
        validator: &BlockHash,
        equivocation_base_seq_num: i32,
        detected_block_hashes: &[BlockHash],
    ) -> Vec<u8> {
        let mut buf = Vec::with_capacity(
            validator.len() + 8 + detected_block_hashes.len() * validator.len(),
        );
        buf.extend_from_slice(validator.as_bytes());
        buf.extend_from_slice(&equivocation_base_seq_num.to_be_bytes());
        buf.extend_from_slice(&(detected_block_hashes.len() as i32).to_be_bytes());
        for hash in detected_block_hashes {
            buf.extend_from_slice(hash.as_bytes());
        }
        buf
    }

    pub fn decode_one(bytes: &[u8], hash_width: usize) -> Option<Decoded<Record>> {
        if bytes.len() < hash_width {
            return None;
        }
        let validator = BlockHash::from(&bytes[..hash_width]);
        let mut offset = hash_width;

        let equivocation_base_seq_num = read_i32(bytes, offset)?;
        offset += 4;
        let count = read_i32(bytes, offset)?;
        if count < 0 {
            return None;
        }
        offset += 4;
        let count = count as usize;

        let needed = count * hash_width;
        let hash_bytes = bytes.get(offset..offset + needed)?;
        let detected_block_hashes = hash_bytes
            .chunks_exact(hash_width)
            .map(BlockHash::from)
            .collect();
        offset += needed;

        Some(Decoded {
            value: Record {
                validator,
                equivocation_base_seq_num,
                detected_block_hashes,
            },
            len: offset,
        })
    }
}

/// `block-hashes-by-deploy` log: `deploySize:i32 || deployId ||
/// blockHash`.
pub mod block_hash_by_deploy {
    use super::*;

    pub struct Record {
        pub deploy_id: blockdag_blocks::DeployId,
        pub block_hash: BlockHash,
    }

    pub fn encode(deploy_id: &blockdag_blocks::DeployId, block_hash: &BlockHash) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + deploy_id.len() + block_hash.len());
        buf.extend_from_slice(&(deploy_id.len() as i32).to_be_bytes());
        buf.extend_from_slice(deploy_id.as_bytes());
        buf.extend_from_slice(block_hash.as_bytes());
        buf
    }

    pub fn decode_one(bytes: &[u8], hash_width: usize) -> Option<Decoded<Record>> {
        let deploy_size = read_i32(bytes, 0)?;
        if deploy_size < 0 {
            return None;
        }
        let deploy_size = deploy_size as usize;
        let mut offset = 4;

        let deploy_id = bytes.get(offset..offset + deploy_size)?;
        offset += deploy_size;

        let block_hash = bytes.get(offset..offset + hash_width)?;
        offset += hash_width;

        Some(Decoded {
            value: Record {
                deploy_id: blockdag_blocks::DeployId::from(deploy_id),
                block_hash: BlockHash::from(block_hash),
            },
            len: offset,
        })
    }
}
