// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Atomic Writer
//!
//! Produces the target file atomically or leaves the prior state intact:
//! prepare a temp path, write, verify (`%PDF-` magic plus an optional
//! backend validate pass), commit via rename, clean up on any failure.
//!
//! Two entry points cover the two ways this engine materializes a merge
//! result: [`AtomicWriter::write_atomic`] takes an in-memory byte buffer
//! (the Direct strategy, which is small enough to hold in memory) and
//! drives it through the constructor-injected [`TempWriter`]; the
//! injection is what lets a fault-injecting writer exercise the retry
//! loop in tests without any process-global test hook.
//! [`AtomicWriter::commit_merge`]
//! takes a backend and a set of input paths (every other strategy, which
//! streams through the backend rather than materializing a buffer) and
//! retries the backend call itself on a transient failure.

use std::path::{Path, PathBuf};
use std::time::Duration;

use merge_domain::cancellation::CancellationToken;
use merge_domain::error::MergeError;
use merge_domain::services::Backend;
use rand::Rng;

use super::temp_writer::TempWriter;
use std::sync::Arc;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Retry behavior for transient failures during atomic writes.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_retry_delay: Duration,
    pub backoff_factor: f64,
    pub max_retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_retry_delay: Duration::from_millis(100),
            backoff_factor: 2.0,
            max_retry_delay: Duration::from_secs(5),
        }
    }
}

/// Prepare -> Write -> Verify -> Commit -> Cleanup, with retry on
/// transient IO/Processing failures.
pub struct AtomicWriter {
    temp_writer: Arc<dyn TempWriter>,
    retry_policy: RetryPolicy,
}

impl AtomicWriter {
    pub fn new(temp_writer: Arc<dyn TempWriter>) -> Self {
        Self::with_retry_policy(temp_writer, RetryPolicy::default())
    }

    pub fn with_retry_policy(temp_writer: Arc<dyn TempWriter>, retry_policy: RetryPolicy) -> Self {
        Self { temp_writer, retry_policy }
    }

    /// Write `bytes` to `target` atomically, retrying transient failures.
    /// Returns the number of retries performed (0 on first-attempt success).
    #[tracing::instrument(skip(self, bytes, cancellation), fields(target = %target.display()))]
    pub async fn write_atomic(
        &self,
        target: &Path,
        bytes: &[u8],
        temp_dir: &Path,
        backend: Option<&dyn Backend>,
        cancellation: &CancellationToken,
    ) -> Result<u32, MergeError> {
        let mut attempt: u32 = 0;
        let mut delay = self.retry_policy.initial_retry_delay;

        loop {
            match self.attempt_write_bytes(target, bytes, temp_dir, backend, cancellation).await {
                Ok(()) => return Ok(attempt),
                Err(err) => {
                    if cancellation.is_cancelled() {
                        return Err(MergeError::Cancelled);
                    }
                    if !err.is_recoverable() || attempt + 1 >= self.retry_policy.max_retries {
                        return Err(err);
                    }

                    attempt += 1;
                    tracing::warn!(attempt, error = %err, "atomic write failed, retrying");

                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = cancellation.cancelled() => return Err(MergeError::Cancelled),
                    }

                    delay = next_delay(delay, self.retry_policy.backoff_factor, self.retry_policy.max_retry_delay);
                }
            }
        }
    }

    /// Merge `inputs` via `backend` into `target` atomically, retrying a
    /// transient backend failure by re-running the merge into a fresh temp
    /// artifact.
    #[tracing::instrument(skip(self, inputs, backend, cancellation), fields(target = %target.display(), inputs = inputs.len()))]
    pub async fn commit_merge(
        &self,
        inputs: &[PathBuf],
        target: &Path,
        temp_dir: &Path,
        backend: &dyn Backend,
        cancellation: &CancellationToken,
    ) -> Result<u32, MergeError> {
        let mut attempt: u32 = 0;
        let mut delay = self.retry_policy.initial_retry_delay;

        loop {
            match self.attempt_merge(inputs, target, temp_dir, backend, cancellation).await {
                Ok(()) => return Ok(attempt),
                Err(err) => {
                    if cancellation.is_cancelled() {
                        return Err(MergeError::Cancelled);
                    }
                    if !err.is_recoverable() || attempt + 1 >= self.retry_policy.max_retries {
                        return Err(err);
                    }

                    attempt += 1;
                    tracing::warn!(attempt, error = %err, "merge commit failed, retrying");

                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = cancellation.cancelled() => return Err(MergeError::Cancelled),
                    }

                    delay = next_delay(delay, self.retry_policy.backoff_factor, self.retry_policy.max_retry_delay);
                }
            }
        }
    }

    async fn attempt_write_bytes(
        &self,
        target: &Path,
        bytes: &[u8],
        temp_dir: &Path,
        backend: Option<&dyn Backend>,
        cancellation: &CancellationToken,
    ) -> Result<(), MergeError> {
        if cancellation.is_cancelled() {
            return Err(MergeError::Cancelled);
        }

        ensure_writable_dir(target.parent().unwrap_or_else(|| Path::new("."))).await?;
        let temp_path = temp_path_for(temp_dir, target);

        let write_result = self.temp_writer.write_temp(&temp_path, bytes).await;
        if let Err(err) = write_result {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(err);
        }

        self.verify_and_commit(&temp_path, target, backend).await
    }

    async fn attempt_merge(
        &self,
        inputs: &[PathBuf],
        target: &Path,
        temp_dir: &Path,
        backend: &dyn Backend,
        cancellation: &CancellationToken,
    ) -> Result<(), MergeError> {
        if cancellation.is_cancelled() {
            return Err(MergeError::Cancelled);
        }

        ensure_writable_dir(target.parent().unwrap_or_else(|| Path::new("."))).await?;
        let temp_path = temp_path_for(temp_dir, target);

        if let Err(err) = backend.merge(inputs, &temp_path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(err);
        }

        self.verify_and_commit(&temp_path, target, Some(backend)).await
    }

    async fn verify_and_commit(&self, temp_path: &Path, target: &Path, backend: Option<&dyn Backend>) -> Result<(), MergeError> {
        if let Err(err) = verify_temp_file(temp_path, backend).await {
            let _ = tokio::fs::remove_file(temp_path).await;
            return Err(err);
        }

        if let Err(err) = commit(temp_path, target).await {
            let _ = tokio::fs::remove_file(temp_path).await;
            return Err(err);
        }

        Ok(())
    }
}

fn next_delay(current: Duration, backoff_factor: f64, cap: Duration) -> Duration {
    let scaled = current.as_secs_f64() * backoff_factor;
    Duration::from_secs_f64(scaled.min(cap.as_secs_f64()))
}

/// Verify the temp file exists, is non-empty, starts with the `%PDF-`
/// magic, and (when a backend is supplied) passes backend validation.
async fn verify_temp_file(temp_path: &Path, backend: Option<&dyn Backend>) -> Result<(), MergeError> {
    let metadata = tokio::fs::metadata(temp_path).await?;
    if metadata.len() == 0 {
        return Err(MergeError::processing("temp artifact is empty"));
    }

    let mut header = vec![0u8; PDF_MAGIC.len()];
    use tokio::io::AsyncReadExt;
    let mut file = tokio::fs::File::open(temp_path).await?;
    file.read_exact(&mut header).await.map_err(|_| MergeError::processing("temp artifact is shorter than the PDF magic"))?;

    if header != PDF_MAGIC {
        return Err(MergeError::processing("temp artifact does not start with %PDF- magic"));
    }

    if let Some(backend) = backend {
        if let merge_domain::services::ValidateOutcome::FatalEnvironment { reason } = backend.validate(temp_path).await {
            return Err(reason);
        }
    }

    Ok(())
}

/// Rename temp -> target (same filesystem), falling back to
/// copy+fsync+remove-temp across filesystem boundaries.
async fn commit(temp_path: &Path, target: &Path) -> Result<(), MergeError> {
    if tokio::fs::try_exists(target).await.unwrap_or(false) {
        tokio::fs::remove_file(target).await?;
    }

    match tokio::fs::rename(temp_path, target).await {
        Ok(()) => Ok(()),
        Err(_) => {
            tokio::fs::copy(temp_path, target).await?;
            let file = tokio::fs::File::open(target).await?;
            file.sync_all().await?;
            let _ = tokio::fs::remove_file(temp_path).await;
            Ok(())
        }
    }
}

/// Probe that the target's parent directory exists and accepts writes, by
/// creating and removing a zero-byte sentinel.
pub(crate) async fn ensure_writable_dir(dir: &Path) -> Result<(), MergeError> {
    tokio::fs::create_dir_all(dir).await?;

    let probe = dir.join(format!(".merge_write_probe_{}", rand::thread_rng().gen::<u32>()));
    match tokio::fs::write(&probe, []).await {
        Ok(()) => {
            let _ = tokio::fs::remove_file(&probe).await;
            Ok(())
        }
        Err(err) => Err(MergeError::permission(format!("output directory {} is not writable: {err}", dir.display()))),
    }
}

/// Build a temp artifact path: `{temp_dir}/{outBase}_temp_{timestamp}_{nonce}.pdf`.
pub fn temp_path_for(temp_dir: &Path, target: &Path) -> PathBuf {
    let base = target.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| "output".to_string());
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let nanos = chrono::Utc::now().timestamp_subsec_nanos() % 1000;
    temp_dir.join(format!("{base}_temp_{timestamp}_{nanos}.pdf"))
}
