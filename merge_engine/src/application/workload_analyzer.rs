// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Workload Analyzer
//!
//! Stats the candidate input files and reduces them to a [`FileAnalysis`].
//! Reads only file metadata (size), never content. A missing file
//! contributes a zero-byte entry and is logged at `warn`, but never makes
//! `analyze` fail — the engine decides what to do with a missing input
//! during validation (Phase A), not here.

use merge_domain::entities::FileAnalysis;
use std::path::Path;

/// Analyze `paths`, returning aggregate statistics for the strategy
/// selector and sizer.
#[tracing::instrument(skip(paths), fields(count = paths.len()))]
pub async fn analyze(paths: &[impl AsRef<Path>], large_file_threshold: u64) -> FileAnalysis {
    let mut sizes = Vec::with_capacity(paths.len());
    for path in paths {
        let path = path.as_ref();
        match tokio::fs::metadata(path).await {
            Ok(meta) => sizes.push(meta.len()),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "input file missing or unreadable during analysis");
                sizes.push(0);
            }
        }
    }
    let analysis = FileAnalysis::from_sizes(&sizes, large_file_threshold);
    tracing::info!(
        count = analysis.count,
        total_bytes = analysis.total_bytes,
        avg_bytes = analysis.avg_bytes,
        has_large_files = analysis.has_large_files,
        large_file_count = analysis.large_file_count,
        "workload analysis complete"
    );
    analysis
}
