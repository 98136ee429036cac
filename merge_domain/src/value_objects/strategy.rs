// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Merge Strategy
//!
//! The four execution paths the strategy selector can pick between. The
//! selector itself is a pure function over `(FileAnalysis, MemoryPressure,
//! StreamingConfig, cpu_count)` that lives in the application layer; this
//! type is just the decision it returns.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeStrategy {
    /// A single call to the backend's merge operation.
    Direct,
    /// Parallel sub-merges bounded by `max_concurrent_chunks`.
    Concurrent,
    /// Serialized chunk pipeline with intermediate merges.
    ChunkedStreaming,
    /// Small-chunk serial batches with aggressive memory reclamation.
    MemoryOptimized,
}

impl std::fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Direct => "direct",
            Self::Concurrent => "concurrent",
            Self::ChunkedStreaming => "chunked_streaming",
            Self::MemoryOptimized => "memory_optimized",
        };
        write!(f, "{label}")
    }
}
