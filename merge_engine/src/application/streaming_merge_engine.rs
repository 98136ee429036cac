// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Streaming Merge Engine
//!
//! The orchestrator. `merge_streaming` runs one [`MergeJob`] end to end:
//! validate inputs, back up a pre-existing output, pick a strategy, execute
//! it, finalize, and report a [`MergeResult`]. Every other component in this
//! crate exists to be called from here.
//!
//! Only one job runs per engine instance at a time (`job_lock`), a
//! single-flight processing pattern; `cancel()` and `get_progress()` act on
//! whichever job currently holds that lock.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::try_join_all;
use merge_domain::cancellation::CancellationToken;
use merge_domain::entities::{estimate_pages, FileAnalysis, MergeJob, MergeResult, ProgressSnapshot, SkippedFile, StreamingConfig};
use merge_domain::error::MergeError;
use merge_domain::services::{Backend, BackendOptions, ValidateOutcome};
use merge_domain::value_objects::{ConcurrencyLevel, MemoryPressure, MergeStrategy};
use parking_lot::Mutex;

use crate::application::{sizer, strategy_selector, workload_analyzer};
use crate::infrastructure::atomic_writer::{self, AtomicWriter};
use crate::infrastructure::memory_monitor::MemoryMonitor;
use crate::infrastructure::platform::Platform;
use crate::infrastructure::progress_tracker::{ProgressTracker, Step};
use crate::infrastructure::rollback_manager::RollbackManager;
use crate::infrastructure::runtime::ResourcePool;

/// `max(10, max_concurrent_chunks * 2)` so larger worker pools don't thrash
/// the memory-optimized path on an arbitrary constant.
fn intermediate_merge_threshold(max_concurrent_chunks: usize) -> usize {
    (max_concurrent_chunks * 2).max(10)
}

const VERY_LARGE_BATCH_MEMBER_BYTES: u64 = 10 * 1024 * 1024;
const CRITICAL_BACKOFF: Duration = Duration::from_millis(500);
const CRITICAL_ALLOCATION_RATIO: f64 = 0.80;

struct JobHandle {
    cancellation: CancellationToken,
    tracker: Arc<ProgressTracker>,
}

/// Holds the concrete adapters a merge job needs and sequences every phase against
/// one [`MergeJob`] at a time.
pub struct StreamingMergeEngine {
    backend: Arc<dyn Backend>,
    memory_monitor: MemoryMonitor,
    streaming_config: StreamingConfig,
    job_lock: tokio::sync::Mutex<()>,
    current_job: Mutex<Option<JobHandle>>,
}

impl StreamingMergeEngine {
    pub fn new(backend: Arc<dyn Backend>, platform: Arc<dyn Platform>, streaming_config: StreamingConfig) -> Self {
        Self {
            backend,
            memory_monitor: MemoryMonitor::new(platform),
            streaming_config,
            job_lock: tokio::sync::Mutex::new(()),
            current_job: Mutex::new(None),
        }
    }

    /// Signal cancellation on whichever job currently holds `job_lock`, if
    /// any. A no-op when no job is in flight.
    pub fn cancel(&self) {
        if let Some(handle) = self.current_job.lock().as_ref() {
            handle.cancellation.cancel();
        }
    }

    /// Point-in-time progress for the in-flight job, or a pending snapshot
    /// when no job is running.
    pub fn get_progress(&self) -> ProgressSnapshot {
        match self.current_job.lock().as_ref() {
            Some(handle) => handle.tracker.snapshot(),
            None => ProgressSnapshot::pending(),
        }
    }

    /// Cancels any in-flight job and releases the backend.
    pub async fn close(&self) -> Result<(), MergeError> {
        self.cancel();
        self.backend.close().await
    }

    #[tracing::instrument(skip(self, job), fields(inputs = job.inputs.len(), output = %job.output_path.display()))]
    pub async fn merge_streaming(&self, job: MergeJob) -> Result<MergeResult, MergeError> {
        let _job_slot = self.job_lock.lock().await;
        let started_at = Instant::now();

        if job.inputs.is_empty() {
            return Err(MergeError::invalid_input("no input files supplied"));
        }

        let out_dir = job.output_path.parent().unwrap_or_else(|| Path::new("."));
        atomic_writer::ensure_writable_dir(out_dir).await?;

        let observer = job.progress.clone().unwrap_or_else(|| Arc::new(merge_domain::entities::NoopProgressObserver));
        let tracker = Arc::new(ProgressTracker::new(
            vec![Step::new("validate", 20.0), Step::new("merge", 70.0), Step::new("finalize", 10.0)],
            observer,
            job.cancellation.clone(),
        ));
        *self.current_job.lock() = Some(JobHandle { cancellation: job.cancellation.clone(), tracker: tracker.clone() });

        let result = self.run_job(&job, &tracker, started_at).await;

        match &result {
            Ok(_) => tracker.finish().await,
            Err(MergeError::Cancelled) => tracker.cancel().await,
            Err(err) => tracker.fail(&err.to_string()).await,
        }
        *self.current_job.lock() = None;

        result
    }

    async fn run_job(
        &self,
        job: &MergeJob,
        tracker: &ProgressTracker,
        started_at: Instant,
    ) -> Result<MergeResult, MergeError> {
        let cancellation = &job.cancellation;
        let max_memory = job.options.max_memory;
        let temp_dir = job.options.temp_dir.clone();
        tokio::fs::create_dir_all(&temp_dir).await?;

        let peak_memory = Arc::new(AtomicU64::new(0));
        let artifacts: Arc<Mutex<Vec<PathBuf>>> = Arc::new(Mutex::new(Vec::new()));

        // Phase A: validate.
        tracker.start_step(0).await;
        let (valid_inputs, skipped_files) = match self
            .validate_inputs(&job.inputs, cancellation, max_memory, &peak_memory, tracker)
            .await
        {
            Ok(pair) => pair,
            Err(err) => {
                cleanup_artifacts(&artifacts).await;
                return Err(err);
            }
        };
        tracker.complete_step(0).await;

        if valid_inputs.is_empty() {
            cleanup_artifacts(&artifacts).await;
            return Err(MergeError::invalid_input("no input passed validation"));
        }

        // Backup a pre-existing output.
        let backup_dir = temp_dir.join("backups");
        let rollback = RollbackManager::new(&backup_dir);
        let backup_path = match rollback.backup(&job.output_path).await {
            Ok(path) => path,
            Err(err) => {
                cleanup_artifacts(&artifacts).await;
                return Err(err);
            }
        };

        let outcome = self
            .execute_strategy(job, &valid_inputs, &temp_dir, cancellation, &peak_memory, &artifacts, tracker)
            .await;

        match outcome {
            Ok((strategy, retry_count)) => {
                // Phase C: finalize.
                tracker.start_step(2).await;
                if let ValidateOutcome::FatalEnvironment { reason } | ValidateOutcome::Skip { reason } =
                    self.backend.validate(&job.output_path).await
                {
                    if let Some(backup_path) = &backup_path {
                        let _ = rollback.restore(backup_path, &job.output_path).await;
                    }
                    cleanup_artifacts(&artifacts).await;
                    return Err(reason);
                }

                if let Some(backup_path) = &backup_path {
                    let _ = rollback.discard(backup_path).await;
                }
                cleanup_artifacts(&artifacts).await;
                tracker.complete_step(2).await;

                let total_bytes: u64 = future_metadata_sum(&valid_inputs).await;
                Ok(MergeResult {
                    output_path: job.output_path.clone(),
                    total_pages_estimate: estimate_pages(total_bytes),
                    processed_files: valid_inputs.len(),
                    skipped_files,
                    processing_time: started_at.elapsed(),
                    peak_memory: peak_memory.load(Ordering::SeqCst),
                    strategy,
                    retry_count,
                })
            }
            Err(err) => {
                if let Some(backup_path) = &backup_path {
                    let _ = rollback.restore(backup_path, &job.output_path).await;
                }
                cleanup_artifacts(&artifacts).await;
                Err(err)
            }
        }
    }

    async fn validate_inputs(
        &self,
        inputs: &[PathBuf],
        cancellation: &CancellationToken,
        max_memory: u64,
        peak_memory: &AtomicU64,
        tracker: &ProgressTracker,
    ) -> Result<(Vec<PathBuf>, Vec<SkippedFile>), MergeError> {
        let mut valid = Vec::with_capacity(inputs.len());
        let mut skipped = Vec::new();

        for (index, path) in inputs.iter().enumerate() {
            if cancellation.is_cancelled() {
                return Err(MergeError::Cancelled);
            }

            let pressure = self.sample_pressure(max_memory, peak_memory);
            self.handle_pressure(pressure, max_memory, peak_memory).await;

            tracker
                .update(
                    (index as f64 / inputs.len().max(1) as f64) * 100.0,
                    &format!("validating {}", path.display()),
                )
                .await;

            match self.backend.validate(path).await {
                ValidateOutcome::Ok => valid.push(path.clone()),
                ValidateOutcome::Skip { reason } => skipped.push(SkippedFile { path: path.clone(), reason }),
                ValidateOutcome::FatalEnvironment { reason } => return Err(reason),
            }
        }

        Ok((valid, skipped))
    }

    async fn execute_strategy(
        &self,
        job: &MergeJob,
        valid_inputs: &[PathBuf],
        temp_dir: &Path,
        cancellation: &CancellationToken,
        peak_memory: &Arc<AtomicU64>,
        artifacts: &Arc<Mutex<Vec<PathBuf>>>,
        tracker: &ProgressTracker,
    ) -> Result<(MergeStrategy, u32), MergeError> {
        tracker.start_step(1).await;

        let analysis = workload_analyzer::analyze(valid_inputs, self.streaming_config.large_file_threshold).await;
        let mut config = if analysis.has_large_files { self.streaming_config.large_file_mode() } else { self.streaming_config.clone() };

        if let Some(chunk_size) = job.options.chunk_size {
            config.min_chunk_size = chunk_size;
            config.max_chunk_size = chunk_size;
        }
        if let Some(workers) = job.options.concurrent_workers {
            config.max_concurrent_chunks = ConcurrencyLevel::new(workers).get();
        }

        if analysis.has_large_files {
            self.backend
                .reconfigure(BackendOptions {
                    minimal_memory: true,
                    enable_object_stream_compaction: true,
                    enable_xref_stream_compaction: true,
                    relaxed_validation: true,
                })
                .await?;
        }

        let max_memory = job.options.max_memory;
        let allocated = self.memory_monitor.allocated_bytes();
        let pressure = self.sample_pressure(max_memory, peak_memory);

        let strategy = if !job.options.use_streaming {
            MergeStrategy::Direct
        } else if job.options.optimize_memory {
            MergeStrategy::MemoryOptimized
        } else {
            strategy_selector::select(&analysis, pressure, &config, num_cpus(), allocated, max_memory)
        };

        let writer = AtomicWriter::new(Arc::new(crate::infrastructure::temp_writer::FsTempWriter::new()));
        let retries = Arc::new(AtomicU64::new(0));

        match strategy {
            MergeStrategy::Direct => {
                let n = writer.commit_merge(valid_inputs, &job.output_path, temp_dir, self.backend.as_ref(), cancellation).await?;
                retries.fetch_add(n as u64, Ordering::SeqCst);
            }
            MergeStrategy::Concurrent => {
                let chunk = sizer::chunk_size(&analysis, available_memory(max_memory, allocated), max_memory, &config);
                let group_artifacts = self
                    .merge_partitioned(
                        valid_inputs,
                        chunk.get(),
                        config.max_concurrent_chunks,
                        config.chunk_process_timeout,
                        temp_dir,
                        cancellation,
                        artifacts,
                        &retries,
                        false,
                        max_memory,
                        peak_memory.clone(),
                    )
                    .await?;
                let n = writer.commit_merge(&group_artifacts, &job.output_path, temp_dir, self.backend.as_ref(), cancellation).await?;
                retries.fetch_add(n as u64, Ordering::SeqCst);
            }
            MergeStrategy::ChunkedStreaming => {
                let chunk = sizer::chunk_size(&analysis, available_memory(max_memory, allocated), max_memory, &config);
                if valid_inputs.len() <= chunk.get() {
                    let n = writer.commit_merge(valid_inputs, &job.output_path, temp_dir, self.backend.as_ref(), cancellation).await?;
                    retries.fetch_add(n as u64, Ordering::SeqCst);
                } else {
                    let group_artifacts = self
                        .merge_partitioned(
                            valid_inputs,
                            chunk.get(),
                            config.max_concurrent_chunks,
                            config.chunk_process_timeout,
                            temp_dir,
                            cancellation,
                            artifacts,
                            &retries,
                            true,
                            max_memory,
                            peak_memory.clone(),
                        )
                        .await?;
                    let n = writer.commit_merge(&group_artifacts, &job.output_path, temp_dir, self.backend.as_ref(), cancellation).await?;
                    retries.fetch_add(n as u64, Ordering::SeqCst);
                }
            }
            MergeStrategy::MemoryOptimized => {
                self.merge_memory_optimized(
                    job,
                    valid_inputs,
                    &analysis,
                    &config,
                    max_memory,
                    temp_dir,
                    cancellation,
                    peak_memory,
                    artifacts,
                    &writer,
                    &retries,
                )
                .await?;
            }
        }

        tracker.complete_step(1).await;
        Ok((strategy, retries.load(Ordering::SeqCst) as u32))
    }

    /// Shared by the Concurrent and Chunked-streaming paths: partition
    /// `inputs` into groups of `chunk_size`, merge each group (bounded by
    /// `max_concurrent`, deadlined at `timeout`) into its own temp artifact,
    /// and return the artifact paths in original group order.
    ///
    /// When `periodic_gc` is set, every third completed chunk samples
    /// pressure and runs it through the same handler `merge_memory_optimized`
    /// uses between batches (§4.9.3's "every third completed chunk triggers
    /// OptimizeMemory()").
    #[allow(clippy::too_many_arguments)]
    async fn merge_partitioned(
        &self,
        inputs: &[PathBuf],
        chunk_size: usize,
        max_concurrent: usize,
        timeout: Duration,
        temp_dir: &Path,
        cancellation: &CancellationToken,
        artifacts: &Arc<Mutex<Vec<PathBuf>>>,
        retries: &Arc<AtomicU64>,
        periodic_gc: bool,
        max_memory: u64,
        peak_memory: Arc<AtomicU64>,
    ) -> Result<Vec<PathBuf>, MergeError> {
        let pool = ResourcePool::new(max_concurrent);
        let groups: Vec<Vec<PathBuf>> = inputs.chunks(chunk_size.max(1)).map(|g| g.to_vec()).collect();
        let completed = Arc::new(AtomicU64::new(0));
        let memory_monitor = self.memory_monitor.clone();
        let warning_threshold = self.streaming_config.memory_warning_threshold;
        let critical_threshold = self.streaming_config.memory_critical_threshold;

        let handles = groups.into_iter().enumerate().map(|(index, group)| {
            let pool = pool.clone();
            let backend = self.backend.clone();
            let temp_dir = temp_dir.to_path_buf();
            let cancellation = cancellation.clone();
            let artifacts = artifacts.clone();
            let retries = retries.clone();
            let completed = completed.clone();
            let memory_monitor = memory_monitor.clone();
            let peak_memory = peak_memory.clone();

            tokio::spawn(async move {
                if cancellation.is_cancelled() {
                    return Err(MergeError::Cancelled);
                }

                let _permit = pool.acquire().await;
                if cancellation.is_cancelled() {
                    return Err(MergeError::Cancelled);
                }

                let target = temp_dir.join(format!("group_{index}.pdf"));
                let writer = AtomicWriter::new(Arc::new(crate::infrastructure::temp_writer::FsTempWriter::new()));

                let merge_future = writer.commit_merge(&group, &target, &temp_dir, backend.as_ref(), &cancellation);
                let n = tokio::time::timeout(timeout, merge_future)
                    .await
                    .map_err(|_| MergeError::Timeout(timeout))??;

                retries.fetch_add(n as u64, Ordering::SeqCst);
                artifacts.lock().push(target.clone());

                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                if periodic_gc && done % 3 == 0 {
                    let pressure = sample_pressure_for(&memory_monitor, warning_threshold, critical_threshold, max_memory, &peak_memory);
                    tracing::info!(completed = done, ?pressure, "periodic memory optimization after every third chunk");
                    handle_pressure_for(&memory_monitor, pressure, max_memory, &peak_memory).await;
                }

                Ok::<(usize, PathBuf), MergeError>((index, target))
            })
        });

        let joined = try_join_all(handles).await.map_err(|e| MergeError::internal(format!("chunk worker panicked: {e}")))?;
        let mut results = joined.into_iter().collect::<Result<Vec<_>, MergeError>>()?;
        results.sort_by_key(|(index, _)| *index);
        Ok(results.into_iter().map(|(_, path)| path).collect())
    }

    #[allow(clippy::too_many_arguments)]
    async fn merge_memory_optimized(
        &self,
        job: &MergeJob,
        valid_inputs: &[PathBuf],
        analysis: &FileAnalysis,
        config: &StreamingConfig,
        max_memory: u64,
        temp_dir: &Path,
        cancellation: &CancellationToken,
        peak_memory: &AtomicU64,
        artifacts: &Arc<Mutex<Vec<PathBuf>>>,
        writer: &AtomicWriter,
        retries: &Arc<AtomicU64>,
    ) -> Result<(), MergeError> {
        let allocated = self.memory_monitor.allocated_bytes();
        let batch = sizer::batch_size(analysis, available_memory(max_memory, allocated), max_memory);
        let threshold = intermediate_merge_threshold(config.max_concurrent_chunks);

        let mut pending: Vec<PathBuf> = Vec::new();
        let mut group_index = 0usize;

        for batch_members in valid_inputs.chunks(batch.get().max(1)) {
            if cancellation.is_cancelled() {
                return Err(MergeError::Cancelled);
            }

            let pressure = self.sample_pressure(max_memory, peak_memory);
            let any_very_large = future_any_exceeds(batch_members, VERY_LARGE_BATCH_MEMBER_BYTES).await;
            if pressure.at_least_warning() || any_very_large {
                self.handle_pressure(MemoryPressure::Critical, max_memory, peak_memory).await;
            }

            let target = temp_dir.join(format!("batch_{group_index}.pdf"));
            group_index += 1;
            let n = writer.commit_merge(batch_members, &target, temp_dir, self.backend.as_ref(), cancellation).await?;
            retries.fetch_add(n as u64, Ordering::SeqCst);
            artifacts.lock().push(target.clone());
            pending.push(target);

            if pending.len() >= threshold {
                let collapsed = temp_dir.join(format!("collapsed_{group_index}.pdf"));
                let n = writer.commit_merge(&pending, &collapsed, temp_dir, self.backend.as_ref(), cancellation).await?;
                retries.fetch_add(n as u64, Ordering::SeqCst);
                artifacts.lock().push(collapsed.clone());
                pending = vec![collapsed];
            }
        }

        let n = writer.commit_merge(&pending, &job.output_path, temp_dir, self.backend.as_ref(), cancellation).await?;
        retries.fetch_add(n as u64, Ordering::SeqCst);
        Ok(())
    }

    fn sample_pressure(&self, max_memory: u64, peak_memory: &AtomicU64) -> MemoryPressure {
        sample_pressure_for(
            &self.memory_monitor,
            self.streaming_config.memory_warning_threshold,
            self.streaming_config.memory_critical_threshold,
            max_memory,
            peak_memory,
        )
    }

    async fn handle_pressure(&self, pressure: MemoryPressure, max_memory: u64, peak_memory: &AtomicU64) {
        handle_pressure_for(&self.memory_monitor, pressure, max_memory, peak_memory).await
    }
}

/// Sample current allocation through `monitor`, fold it into `peak_memory`,
/// and classify it against `max_memory`. Free function (rather than a
/// `StreamingMergeEngine` method) so spawned chunk workers in
/// `merge_partitioned` can call it without borrowing `self` across a
/// `tokio::spawn` boundary.
fn sample_pressure_for(monitor: &MemoryMonitor, warning_threshold: f64, critical_threshold: f64, max_memory: u64, peak_memory: &AtomicU64) -> MemoryPressure {
    let allocated = monitor.allocated_bytes();
    peak_memory.fetch_max(allocated, Ordering::SeqCst);
    monitor.check_pressure(max_memory, warning_threshold, critical_threshold)
}

/// The pressure handler from the concurrency model: Warning gets a
/// collection hint (logged, advisory only — see the design notes on
/// progressive GC); Critical runs `optimize_memory()` and, if allocation
/// still exceeds 80% of `max_memory` afterward, backs off for 500 ms.
async fn handle_pressure_for(monitor: &MemoryMonitor, pressure: MemoryPressure, max_memory: u64, peak_memory: &AtomicU64) {
    match pressure {
        MemoryPressure::Normal => {}
        MemoryPressure::Warning => {
            tracing::info!("memory pressure warning: collection hint");
        }
        MemoryPressure::Critical => {
            tracing::warn!("memory pressure critical: running optimize_memory");
            for iteration in 0..3 {
                tracing::debug!(iteration, "collection hint");
            }
            let allocated = monitor.allocated_bytes();
            peak_memory.fetch_max(allocated, Ordering::SeqCst);
            if max_memory > 0 && (allocated as f64 / max_memory as f64) > CRITICAL_ALLOCATION_RATIO {
                tokio::time::sleep(CRITICAL_BACKOFF).await;
            }
        }
    }
}

fn available_memory(max_memory: u64, allocated: u64) -> i64 {
    max_memory as i64 - allocated as i64
}

fn num_cpus() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

async fn cleanup_artifacts(artifacts: &Arc<Mutex<Vec<PathBuf>>>) {
    let paths = std::mem::take(&mut *artifacts.lock());
    for path in paths {
        let _ = tokio::fs::remove_file(path).await;
    }
}

async fn future_metadata_sum(paths: &[PathBuf]) -> u64 {
    let mut total = 0u64;
    for path in paths {
        if let Ok(meta) = tokio::fs::metadata(path).await {
            total += meta.len();
        }
    }
    total
}

async fn future_any_exceeds(paths: &[PathBuf], bytes: u64) -> bool {
    for path in paths {
        if let Ok(meta) = tokio::fs::metadata(path).await {
            if meta.len() > bytes {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::backend::ConcatenatingBackend;
    use crate::infrastructure::platform::create_platform;
    use merge_domain::entities::ExecutionState;
    use tempfile::tempdir;

    fn fixture_pdf(body: &str) -> Vec<u8> {
        format!("%PDF-1.7\n{body}\n%%EOF\n").into_bytes()
    }

    async fn write_fixture(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        tokio::fs::write(&path, fixture_pdf(body)).await.unwrap();
        path
    }

    fn engine() -> StreamingMergeEngine {
        StreamingMergeEngine::new(Arc::new(ConcatenatingBackend::new()), create_platform(), StreamingConfig::default())
    }

    #[tokio::test]
    async fn small_batch_merges_directly() {
        let dir = tempdir().unwrap();
        let a = write_fixture(dir.path(), "a.pdf", "PAGE_A").await;
        let b = write_fixture(dir.path(), "b.pdf", "PAGE_B").await;
        let out = dir.path().join("out.pdf");

        let job = MergeJob::new(vec![a, b], out.clone())
            .with_options(merge_domain::entities::MergeJobOptions::default().with_temp_dir(dir.path().join("tmp")));

        let engine = engine();
        let result = engine.merge_streaming(job).await.unwrap();

        assert_eq!(result.processed_files, 2);
        assert_eq!(result.strategy, MergeStrategy::Direct);
        assert!(out.exists());
    }

    #[tokio::test]
    async fn rejects_empty_input_list() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out.pdf");
        let job = MergeJob::new(vec![], out);

        let engine = engine();
        let result = engine.merge_streaming(job).await;
        assert!(matches!(result, Err(MergeError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn skips_invalid_inputs_but_still_succeeds() {
        let dir = tempdir().unwrap();
        let a = write_fixture(dir.path(), "a.pdf", "PAGE_A").await;
        let bad = dir.path().join("bad.pdf");
        tokio::fs::write(&bad, b"not a pdf").await.unwrap();
        let c = write_fixture(dir.path(), "c.pdf", "PAGE_C").await;
        let out = dir.path().join("out.pdf");

        let job = MergeJob::new(vec![a, bad, c], out.clone())
            .with_options(merge_domain::entities::MergeJobOptions::default().with_temp_dir(dir.path().join("tmp")));

        let engine = engine();
        let result = engine.merge_streaming(job).await.unwrap();

        assert_eq!(result.processed_files, 2);
        assert_eq!(result.skipped_files.len(), 1);
    }

    #[tokio::test]
    async fn cancelling_before_start_returns_cancelled() {
        let dir = tempdir().unwrap();
        let a = write_fixture(dir.path(), "a.pdf", "PAGE_A").await;
        let out = dir.path().join("out.pdf");
        let cancellation = CancellationToken::new();
        cancellation.cancel();

        let job = MergeJob::new(vec![a], out)
            .with_options(merge_domain::entities::MergeJobOptions::default().with_temp_dir(dir.path().join("tmp")))
            .with_cancellation(cancellation);

        let engine = engine();
        let result = engine.merge_streaming(job).await;
        assert!(matches!(result, Err(MergeError::Cancelled)));
    }

    #[tokio::test]
    async fn concurrent_path_preserves_input_order() {
        let dir = tempdir().unwrap();
        let mut inputs = Vec::new();
        for i in 0..12 {
            inputs.push(write_fixture(dir.path(), &format!("{i}.pdf"), &format!("PAGE_{i}")).await);
        }
        let out = dir.path().join("out.pdf");

        let mut options = merge_domain::entities::MergeJobOptions::default().with_temp_dir(dir.path().join("tmp"));
        options.chunk_size = Some(4);
        let job = MergeJob::new(inputs, out.clone()).with_options(options);

        let engine = engine();
        let result = engine.merge_streaming(job).await.unwrap();
        assert_eq!(result.processed_files, 12);

        let merged = tokio::fs::read_to_string(&out).await.unwrap();
        let mut last_pos = 0usize;
        for i in 0..12 {
            let marker = format!("PAGE_{i}");
            let pos = merged.find(&marker).unwrap();
            assert!(pos >= last_pos);
            last_pos = pos;
        }
    }

    #[tokio::test]
    async fn get_progress_reports_pending_when_no_job_running() {
        let engine = engine();
        let snapshot = engine.get_progress();
        assert_eq!(snapshot.state, ExecutionState::Pending);
    }
}
