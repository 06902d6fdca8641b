// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Block-level data types shared between the DAG storage engine and its
//! external collaborators (block validation, the consensus estimator, the
//! interpreter). This crate owns the wire-agnostic data model; the engine
//! crate (`blockdag_db`) owns how these types are framed on disk.

mod equivocation;
mod hash;
mod metadata;

pub use equivocation::EquivocationRecord;
pub use hash::FixedBytes;
pub use metadata::{Block, BlockMetadata, Error};

/// Opaque block identifier. Fixed-width in practice (typically 32 bytes);
/// the width is a deployment constant enforced by the engine, not by this
/// type, so malformed-length hashes can be represented and rejected at
/// runtime the way the storage engine's invariants require.
pub type BlockHash = FixedBytes;

/// Opaque validator identifier. Same representation and width-enforcement
/// story as [`BlockHash`].
pub type Validator = FixedBytes;

/// Opaque deploy identifier. Unlike [`BlockHash`]/[`Validator`] this is
/// genuinely variable-width; its length is carried alongside it in every
/// on-disk record.
pub type DeployId = FixedBytes;
