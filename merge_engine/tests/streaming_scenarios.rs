// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! End-to-end scenarios against a real temp-directory filesystem and the
//! `ConcatenatingBackend` reference implementation. Each test corresponds to
//! one of the documented merge-engine scenarios: small direct batch, mixed
//! validity, large-file mode, mid-flight cancellation, and a permission
//! failure short-circuiting before any work starts.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use merge_domain::cancellation::CancellationToken;
use merge_domain::entities::{MergeJob, MergeJobOptions, StreamingConfig};
use merge_domain::error::MergeError;
use merge_engine::{create_platform, ConcatenatingBackend, PlatformError, StreamingMergeEngine};

fn fixture_pdf(body: &str) -> Vec<u8> {
    format!("%PDF-1.7\n{body}\n%%EOF\n").into_bytes()
}

async fn write_fixture(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    tokio::fs::write(&path, fixture_pdf(body)).await.unwrap();
    path
}

fn engine(config: StreamingConfig) -> StreamingMergeEngine {
    StreamingMergeEngine::new(Arc::new(ConcatenatingBackend::new()), create_platform(), config)
}

/// S1: a small batch of valid inputs merges directly, in order, with no
/// pre-existing output to back up.
#[tokio::test]
async fn small_batch_of_valid_pdfs_merges_directly() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_fixture(dir.path(), "a.pdf", "PAGE_A").await;
    let b = write_fixture(dir.path(), "b.pdf", "PAGE_B").await;
    let c = write_fixture(dir.path(), "c.pdf", "PAGE_C").await;
    let out = dir.path().join("out.pdf");

    let engine = engine(StreamingConfig::default());
    let job = MergeJob::new(vec![a, b, c], out.clone())
        .with_options(MergeJobOptions::default().with_temp_dir(dir.path().join("tmp")));

    let result = engine.merge_streaming(job).await.expect("merge should succeed");

    assert_eq!(result.processed_files, 3);
    assert!(result.skipped_files.is_empty());
    assert_eq!(result.strategy, merge_domain::value_objects::MergeStrategy::Direct);

    let merged = tokio::fs::read_to_string(&out).await.unwrap();
    let pos_a = merged.find("PAGE_A").unwrap();
    let pos_b = merged.find("PAGE_B").unwrap();
    let pos_c = merged.find("PAGE_C").unwrap();
    assert!(pos_a < pos_b && pos_b < pos_c, "page order must be preserved");
}

/// S2: one corrupted input among several valid ones is skipped, not fatal;
/// the rest merge in their original relative order.
#[tokio::test]
async fn one_corrupted_input_is_skipped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_fixture(dir.path(), "1.pdf", "PAGE_1").await;
    let bad = dir.path().join("2.pdf");
    tokio::fs::write(&bad, b"definitely not a pdf").await.unwrap();
    let c = write_fixture(dir.path(), "3.pdf", "PAGE_3").await;
    let d = write_fixture(dir.path(), "4.pdf", "PAGE_4").await;
    let e = write_fixture(dir.path(), "5.pdf", "PAGE_5").await;
    let out = dir.path().join("out.pdf");

    let engine = engine(StreamingConfig::default());
    let job = MergeJob::new(vec![a, bad.clone(), c, d, e], out.clone())
        .with_options(MergeJobOptions::default().with_temp_dir(dir.path().join("tmp")));

    let result = engine.merge_streaming(job).await.expect("job should succeed despite one bad input");

    assert_eq!(result.processed_files, 4);
    assert_eq!(result.skipped_files.len(), 1);
    assert_eq!(result.skipped_files[0].path, bad);

    let merged = tokio::fs::read_to_string(&out).await.unwrap();
    let positions: Vec<usize> =
        ["PAGE_1", "PAGE_3", "PAGE_4", "PAGE_5"].iter().map(|needle| merged.find(needle).unwrap()).collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "surviving inputs keep their relative order");
}

/// S3: several files over the large-file threshold engage large-file mode
/// and route through a non-Direct strategy; the output still validates.
#[tokio::test]
async fn large_files_engage_non_direct_strategy() {
    let dir = tempfile::tempdir().unwrap();
    let large_body = "X".repeat(64);
    let mut inputs = Vec::new();
    for i in 0..6 {
        inputs.push(write_fixture(dir.path(), &format!("big_{i}.pdf"), &large_body).await);
    }
    let out = dir.path().join("out.pdf");

    let mut config = StreamingConfig::default();
    config.large_file_threshold = 32; // bytes; tiny so our fixtures count as "large"

    let engine = engine(config);
    let job = MergeJob::new(inputs, out.clone())
        .with_options(MergeJobOptions::default().with_temp_dir(dir.path().join("tmp")));

    let result = engine.merge_streaming(job).await.expect("large-file merge should succeed");

    assert_eq!(result.processed_files, 6);
    assert_ne!(result.strategy, merge_domain::value_objects::MergeStrategy::Direct);
    assert!(tokio::fs::try_exists(&out).await.unwrap());
}

/// S4: cancelling mid-flight returns `Cancelled`, leaves no pre-existing
/// output behind, and drops no temp artifacts in the job's temp directory.
#[tokio::test]
async fn cancelling_mid_flight_returns_cancelled_and_leaves_no_trace() {
    let dir = tempfile::tempdir().unwrap();
    let mut inputs = Vec::new();
    for i in 0..40 {
        inputs.push(write_fixture(dir.path(), &format!("in_{i}.pdf"), "PAGE").await);
    }
    let out = dir.path().join("out.pdf");
    let temp_dir = dir.path().join("tmp");

    let engine = Arc::new(engine(StreamingConfig::default()));
    let cancellation = CancellationToken::new();
    let job = MergeJob::new(inputs, out.clone())
        .with_options(MergeJobOptions::default().with_temp_dir(temp_dir.clone()))
        .with_cancellation(cancellation.clone());

    cancellation.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), engine.merge_streaming(job))
        .await
        .expect("engine must return well within the cancellation liveness bound");

    assert!(matches!(result, Err(MergeError::Cancelled)));
    assert!(!tokio::fs::try_exists(&out).await.unwrap(), "no output should be produced on early cancellation");

    if let Ok(mut entries) = tokio::fs::read_dir(&temp_dir).await {
        let mut leftovers = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            leftovers.push(entry.file_name());
        }
        assert!(leftovers.is_empty(), "no temp artifacts should remain: {leftovers:?}");
    }
}

/// S6: a read-only output directory fails fast with `Permission`, before any
/// input validation or temp-artifact creation.
#[tokio::test]
#[cfg(unix)]
async fn read_only_output_directory_fails_permission_before_validation() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let a = write_fixture(dir.path(), "a.pdf", "PAGE_A").await;

    let readonly_out_dir = dir.path().join("readonly");
    tokio::fs::create_dir(&readonly_out_dir).await.unwrap();
    tokio::fs::set_permissions(&readonly_out_dir, std::fs::Permissions::from_mode(0o555)).await.unwrap();

    // Permission bits are meaningless to a process running as root (e.g. in a
    // container). Detect that case up front rather than asserting a failure
    // mode the OS will never produce for us.
    let probe = readonly_out_dir.join(".write_probe");
    if tokio::fs::write(&probe, []).await.is_ok() {
        let _ = tokio::fs::remove_file(&probe).await;
        tokio::fs::set_permissions(&readonly_out_dir, std::fs::Permissions::from_mode(0o755)).await.unwrap();
        eprintln!("skipping: running with privileges that bypass directory permission bits");
        return;
    }

    let out = readonly_out_dir.join("out.pdf");
    let engine = engine(StreamingConfig::default());
    let job = MergeJob::new(vec![a], out)
        .with_options(MergeJobOptions::default().with_temp_dir(dir.path().join("tmp")));

    let result = engine.merge_streaming(job).await;

    tokio::fs::set_permissions(&readonly_out_dir, std::fs::Permissions::from_mode(0o755)).await.unwrap();

    assert!(matches!(result, Err(MergeError::Permission(_))), "expected Permission, got {result:?}");
}

struct StubPlatform;

#[async_trait]
impl merge_engine::Platform for StubPlatform {
    fn page_size(&self) -> usize {
        4096
    }
    fn cpu_count(&self) -> usize {
        4
    }
    fn total_memory(&self) -> Result<u64, PlatformError> {
        Ok(1024 * 1024 * 1024)
    }
    fn available_memory(&self) -> Result<u64, PlatformError> {
        Ok(512 * 1024 * 1024)
    }
    fn process_resident_memory(&self) -> Result<u64, PlatformError> {
        Ok(10 * 1024 * 1024)
    }
    fn line_separator(&self) -> &'static str {
        "\n"
    }
    fn path_separator(&self) -> char {
        ':'
    }
    fn platform_name(&self) -> &'static str {
        "stub"
    }
    fn temp_dir(&self) -> PathBuf {
        std::env::temp_dir()
    }
    fn is_elevated(&self) -> bool {
        false
    }
    fn set_permissions(&self, _path: &Path, _mode: u32) -> Result<(), PlatformError> {
        Ok(())
    }
    fn is_executable(&self, _path: &Path) -> bool {
        false
    }
    async fn sync_file(&self, file: &tokio::fs::File) -> Result<(), PlatformError> {
        file.sync_all().await.map_err(PlatformError::Io)
    }
}

/// Progress callbacks are delivered in non-decreasing order and the engine
/// reports a pending snapshot once the job has finished and released the
/// job lock.
#[tokio::test]
async fn progress_snapshot_reports_pending_after_job_completes() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_fixture(dir.path(), "a.pdf", "PAGE_A").await;
    let out = dir.path().join("out.pdf");

    let engine = StreamingMergeEngine::new(Arc::new(ConcatenatingBackend::new()), Arc::new(StubPlatform), StreamingConfig::default());
    let job = MergeJob::new(vec![a], out)
        .with_options(MergeJobOptions::default().with_temp_dir(dir.path().join("tmp")));

    engine.merge_streaming(job).await.expect("merge should succeed");

    let snapshot = engine.get_progress();
    assert_eq!(snapshot.state, merge_domain::entities::ExecutionState::Pending);
}
