// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # File Analysis
//!
//! The value produced by the workload analyzer: a short-lived summary
//! of an input set's sizes, consumed by the strategy selector and sizer.
//! Carries no paths and no file handles, only the aggregate numbers those
//! pure functions need.

/// Aggregate statistics over a set of candidate input files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileAnalysis {
    pub count: usize,
    pub total_bytes: u64,
    pub avg_bytes: u64,
    pub min_bytes: u64,
    pub max_bytes: u64,
    pub has_large_files: bool,
    /// Number of inputs whose size exceeds the large-file threshold passed
    /// to [`Self::from_sizes`]. Distinct from `has_large_files`: the
    /// concurrency cap in the strategy selector needs the exact count, not
    /// just whether any large file is present.
    pub large_file_count: usize,
}

impl FileAnalysis {
    /// Build an analysis from raw per-file sizes and a large-file threshold.
    /// Missing files should be passed as `0` by the caller (the analyzer
    /// logs them separately; this constructor has no I/O and cannot fail).
    pub fn from_sizes(sizes: &[u64], large_file_threshold: u64) -> Self {
        let count = sizes.len();
        if count == 0 {
            return Self::default();
        }
        let total_bytes: u64 = sizes.iter().sum();
        let min_bytes = *sizes.iter().min().unwrap();
        let max_bytes = *sizes.iter().max().unwrap();
        let avg_bytes = total_bytes / count as u64;
        let large_file_count = sizes.iter().filter(|&&s| s > large_file_threshold).count();
        let has_large_files = large_file_count > 0;

        Self { count, total_bytes, avg_bytes, min_bytes, max_bytes, has_large_files, large_file_count }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_zeroed_analysis() {
        let analysis = FileAnalysis::from_sizes(&[], 20 * 1024 * 1024);
        assert_eq!(analysis.count, 0);
        assert_eq!(analysis.avg_bytes, 0);
        assert!(!analysis.has_large_files);
    }

    #[test]
    fn average_divides_total_by_count() {
        let analysis = FileAnalysis::from_sizes(&[100, 200, 300], 20 * 1024 * 1024);
        assert_eq!(analysis.total_bytes, 600);
        assert_eq!(analysis.avg_bytes, 200);
    }

    #[test]
    fn has_large_files_true_when_any_exceeds_threshold() {
        let analysis = FileAnalysis::from_sizes(&[1, 2, 30 * 1024 * 1024], 20 * 1024 * 1024);
        assert!(analysis.has_large_files);
    }

    #[test]
    fn min_and_max_track_extremes() {
        let analysis = FileAnalysis::from_sizes(&[50, 10, 999], 20 * 1024 * 1024);
        assert_eq!(analysis.min_bytes, 10);
        assert_eq!(analysis.max_bytes, 999);
    }
}
