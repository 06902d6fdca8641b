// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Small filesystem helpers shared by the block DAG storage engine.
//!
//! The one piece of logic worth sharing is "durably replace a file": every
//! append log's CRC sibling, every squashed log, and the equivocations log
//! rewrite all commit by writing a temp file in the target's directory and
//! renaming it over the destination. Centralizing it keeps the commit-point
//! semantics identical across call sites.

pub mod io;

pub use io::atomic_write;
