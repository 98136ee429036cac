// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Progress Tracker
//!
//! Aggregates weighted multi-step progress into a single `[0, 100]` global
//! figure and forwards `(global_progress, message)` pairs to an
//! `Arc<dyn ProgressObserver>` after every update. Cancellation is the
//! ambient `CancellationToken`, not a tracker-local flag.

use std::sync::Arc;

use merge_domain::cancellation::CancellationToken;
use merge_domain::entities::{ExecutionState, ProgressObserver, ProgressSnapshot};
use parking_lot::Mutex;

/// A named phase of work with a relative weight in the overall job.
///
/// Weights need not sum to 100; they are normalized against their total.
#[derive(Debug, Clone)]
pub struct Step {
    pub name: String,
    pub weight: f64,
}

impl Step {
    pub fn new(name: impl Into<String>, weight: f64) -> Self {
        Self { name: name.into(), weight }
    }
}

struct TrackerState {
    current_step: usize,
    intra_step_progress: f64,
    last_message: String,
    state: ExecutionState,
}

/// Tracks progress across a fixed sequence of weighted steps and notifies
/// an observer on every change.
pub struct ProgressTracker {
    steps: Vec<Step>,
    total_weight: f64,
    observer: Arc<dyn ProgressObserver>,
    cancellation: CancellationToken,
    state: Mutex<TrackerState>,
}

impl ProgressTracker {
    pub fn new(steps: Vec<Step>, observer: Arc<dyn ProgressObserver>, cancellation: CancellationToken) -> Self {
        let total_weight = steps.iter().map(|s| s.weight).sum::<f64>().max(f64::EPSILON);
        Self {
            steps,
            total_weight,
            observer,
            cancellation,
            state: Mutex::new(TrackerState {
                current_step: 0,
                intra_step_progress: 0.0,
                last_message: String::new(),
                state: ExecutionState::Pending,
            }),
        }
    }

    /// Mark `index` as the active step and notify the observer.
    pub async fn start_step(&self, index: usize) {
        let name = self.steps.get(index).map(|s| s.name.clone()).unwrap_or_default();
        {
            let mut state = self.state.lock();
            state.current_step = index;
            state.intra_step_progress = 0.0;
            state.state = ExecutionState::Running;
        }
        self.observer.on_step_started(&name).await;
        self.emit(&format!("starting {name}")).await;
    }

    /// Update intra-step progress (0.0..=100.0) for the currently active step.
    pub async fn update(&self, intra_step_progress: f64, message: &str) {
        {
            let mut state = self.state.lock();
            state.intra_step_progress = intra_step_progress.clamp(0.0, 100.0);
            state.last_message = message.to_string();
        }
        self.emit(message).await;
    }

    /// Mark `index` fully complete and notify the observer.
    pub async fn complete_step(&self, index: usize) {
        let name = self.steps.get(index).map(|s| s.name.clone()).unwrap_or_default();
        {
            let mut state = self.state.lock();
            state.current_step = index;
            state.intra_step_progress = 100.0;
        }
        self.observer.on_step_completed(&name).await;
        self.emit(&format!("completed {name}")).await;
    }

    /// Mark the whole job complete.
    pub async fn finish(&self) {
        {
            let mut state = self.state.lock();
            state.state = ExecutionState::Completed;
            state.current_step = self.steps.len().saturating_sub(1);
            state.intra_step_progress = 100.0;
        }
        self.emit("done").await;
    }

    /// Mark the job failed; the observer still receives a final snapshot.
    pub async fn fail(&self, message: &str) {
        {
            let mut state = self.state.lock();
            state.state = ExecutionState::Failed;
            state.last_message = message.to_string();
        }
        self.emit(message).await;
    }

    /// Cancel the job's cancellation token and notify the observer.
    pub async fn cancel(&self) {
        self.cancellation.cancel();
        {
            let mut state = self.state.lock();
            state.state = ExecutionState::Cancelled;
        }
        self.observer.on_cancelled().await;
        self.emit("cancelled").await;
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// A point-in-time snapshot suitable for `get_progress()` callers.
    pub fn snapshot(&self) -> ProgressSnapshot {
        let state = self.state.lock();
        ProgressSnapshot {
            state: state.state,
            global_progress: self.global_progress_locked(&state),
            current_step: self.steps.get(state.current_step).map(|s| s.name.clone()).unwrap_or_default(),
            message: state.last_message.clone(),
            cancelled: self.cancellation.is_cancelled(),
        }
    }

    async fn emit(&self, message: &str) {
        let global_progress = {
            let state = self.state.lock();
            self.global_progress_locked(&state)
        };
        self.observer.on_progress(global_progress, message).await;
    }

    fn global_progress_locked(&self, state: &TrackerState) -> f64 {
        let completed_weight: f64 = self.steps.iter().take(state.current_step).map(|s| s.weight).sum();
        let current_weight = self.steps.get(state.current_step).map(|s| s.weight).unwrap_or(0.0);
        let partial = current_weight * (state.intra_step_progress / 100.0);
        ((completed_weight + partial) / self.total_weight * 100.0).clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct RecordingObserver {
        progress_calls: StdMutex<Vec<(f64, String)>>,
        cancelled: AtomicU32,
    }

    #[async_trait::async_trait]
    impl ProgressObserver for RecordingObserver {
        async fn on_progress(&self, global_progress: f64, message: &str) {
            self.progress_calls.lock().unwrap().push((global_progress, message.to_string()));
        }

        async fn on_cancelled(&self) {
            self.cancelled.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn steps() -> Vec<Step> {
        vec![Step::new("validate", 20.0), Step::new("merge", 70.0), Step::new("finalize", 10.0)]
    }

    #[tokio::test]
    async fn global_progress_weights_steps_correctly() {
        let observer = Arc::new(RecordingObserver::default());
        let tracker = ProgressTracker::new(steps(), observer.clone(), CancellationToken::new());

        tracker.start_step(0).await;
        tracker.complete_step(0).await;
        tracker.start_step(1).await;
        tracker.update(50.0, "halfway through merge").await;

        let snapshot = tracker.snapshot();
        assert!((snapshot.global_progress - 55.0).abs() < 0.01);
    }

    #[tokio::test]
    async fn finish_reports_full_progress() {
        let observer = Arc::new(RecordingObserver::default());
        let tracker = ProgressTracker::new(steps(), observer, CancellationToken::new());

        tracker.start_step(0).await;
        tracker.complete_step(0).await;
        tracker.start_step(1).await;
        tracker.complete_step(1).await;
        tracker.start_step(2).await;
        tracker.finish().await;

        let snapshot = tracker.snapshot();
        assert!((snapshot.global_progress - 100.0).abs() < 0.01);
        assert_eq!(snapshot.state, ExecutionState::Completed);
    }

    #[tokio::test]
    async fn progress_is_non_decreasing_across_updates() {
        let observer = Arc::new(RecordingObserver::default());
        let tracker = ProgressTracker::new(steps(), observer.clone(), CancellationToken::new());

        tracker.start_step(0).await;
        tracker.update(25.0, "a").await;
        tracker.update(75.0, "b").await;
        tracker.complete_step(0).await;
        tracker.start_step(1).await;
        tracker.update(10.0, "c").await;

        let calls = observer.progress_calls.lock().unwrap();
        let progresses: Vec<f64> = calls.iter().map(|(p, _)| *p).collect();
        for window in progresses.windows(2) {
            assert!(window[1] >= window[0] - 1e-9);
        }
    }

    #[tokio::test]
    async fn cancel_sets_token_and_notifies_observer() {
        let observer = Arc::new(RecordingObserver::default());
        let token = CancellationToken::new();
        let tracker = ProgressTracker::new(steps(), observer.clone(), token.clone());

        tracker.cancel().await;

        assert!(token.is_cancelled());
        assert_eq!(observer.cancelled.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.snapshot().state, ExecutionState::Cancelled);
    }
}
