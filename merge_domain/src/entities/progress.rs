// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Progress Tracking
//!
//! `ProgressObserver` is an async trait with default no-op methods so
//! callers only implement the notifications they care about.
//! `ProgressSnapshot` is a point-in-time view the tracker hands out on
//! `get_progress()`.

use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionState {
    pub fn is_complete(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn is_active(self) -> bool {
        matches!(self, Self::Running)
    }
}

/// A point-in-time view of a job's progress, returned by
/// `StreamingMergeEngine::get_progress()`.
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    pub state: ExecutionState,
    /// Weighted global progress in `[0, 100]`.
    pub global_progress: f64,
    pub current_step: String,
    pub message: String,
    pub cancelled: bool,
}

impl ProgressSnapshot {
    pub fn pending() -> Self {
        Self {
            state: ExecutionState::Pending,
            global_progress: 0.0,
            current_step: String::new(),
            message: String::new(),
            cancelled: false,
        }
    }
}

/// Subscriber notified as a merge job's progress advances. Every method has
/// a no-op default so implementors only override what they use.
#[async_trait]
pub trait ProgressObserver: Send + Sync {
    /// Called after every progress update with the aggregated global
    /// percentage and the latest human-readable message. Calls to a single
    /// subscriber are delivered in non-decreasing `global_progress` order.
    async fn on_progress(&self, _global_progress: f64, _message: &str) {}

    /// Called once a named step begins (e.g. "validate", "merge", "finalize").
    async fn on_step_started(&self, _step: &str) {}

    /// Called once a named step completes.
    async fn on_step_completed(&self, _step: &str) {}

    /// Called when the job observes cancellation.
    async fn on_cancelled(&self) {}
}

/// A `ProgressObserver` that drops every notification. Useful for callers
/// that want `merge_streaming` without a progress sink.
pub struct NoopProgressObserver;

#[async_trait]
impl ProgressObserver for NoopProgressObserver {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_snapshot_starts_at_zero_progress() {
        let snapshot = ProgressSnapshot::pending();
        assert_eq!(snapshot.state, ExecutionState::Pending);
        assert_eq!(snapshot.global_progress, 0.0);
        assert!(!snapshot.cancelled);
    }

    #[test]
    fn execution_state_classification() {
        assert!(ExecutionState::Running.is_active());
        assert!(!ExecutionState::Running.is_complete());
        assert!(ExecutionState::Completed.is_complete());
        assert!(ExecutionState::Cancelled.is_complete());
    }

    #[tokio::test]
    async fn noop_observer_accepts_every_notification() {
        let observer = NoopProgressObserver;
        observer.on_progress(50.0, "merging").await;
        observer.on_step_started("merge").await;
        observer.on_step_completed("merge").await;
        observer.on_cancelled().await;
    }
}
