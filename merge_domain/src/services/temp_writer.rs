// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Temp Writer Port
//!
//! The step of the atomic writer that actually streams bytes to the temp
//! path is expressed as a constructor-injected strategy, not process-global
//! state that test code re-fetches and swaps out. This makes the transient
//! IO retry scenario (a write that fails twice then succeeds) a matter of
//! injecting a fault-injecting `TempWriter` into `AtomicWriter::new`, with
//! nothing to reset between tests.

use crate::error::MergeError;
use async_trait::async_trait;
use std::path::Path;

/// Writes the prepared byte stream for a merge output to `temp_path`.
#[async_trait]
pub trait TempWriter: Send + Sync {
    async fn write_temp(&self, temp_path: &Path, data: &[u8]) -> Result<(), MergeError>;
}

/// The production implementation: a plain `tokio::fs::write`. Lives in the
/// infrastructure crate; this port only defines the contract.
