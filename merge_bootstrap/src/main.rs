// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Merge CLI
//!
//! Composition root: wires `bootstrap_cli()`'s validated command onto a
//! [`StreamingMergeEngine`], using [`ConcatenatingBackend`] as the backend
//! adapter and [`ShutdownCoordinator`]/signal handling for SIGTERM/SIGINT/SIGHUP.
//! This binary is a thin, demonstrative façade over the engine - the
//! interesting behavior lives in `merge_engine` and `merge_domain`.

use std::sync::Arc;
use std::time::Duration;

use merge_bootstrap::shutdown::ShutdownCoordinator;
use merge_bootstrap::signals::create_signal_handler;
use merge_bootstrap::{bootstrap_cli, result_to_exit_code, ExitCode, ValidatedCommand};
use merge_domain::cancellation::CancellationToken;
use merge_domain::entities::{MergeJob, MergeJobOptions};
use merge_domain::error::MergeError;
use merge_engine::{create_platform, ConcatenatingBackend, ConfigService, StreamingMergeEngine};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = match bootstrap_cli() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("argument error: {e}");
            return std::process::ExitCode::from(ExitCode::UsageError.as_i32() as u8);
        }
    };

    init_tracing(cli.verbose);

    let result = run(cli).await;
    result_to_exit_code(result)
}

fn init_tracing(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let _ = tracing_subscriber::fmt().with_max_level(level).try_init();
}

async fn run(cli: merge_bootstrap::ValidatedCli) -> Result<(), MergeError> {
    match cli.command {
        ValidatedCommand::Validate { config } => validate(&config).await,
        ValidatedCommand::Merge {
            inputs,
            output,
            temp_dir,
            max_memory_mb,
            chunk_size,
            concurrent_workers,
            use_streaming,
            optimize_memory,
        } => {
            merge(
                inputs,
                output,
                temp_dir,
                max_memory_mb,
                chunk_size,
                concurrent_workers,
                use_streaming,
                optimize_memory,
            )
            .await
        }
    }
}

async fn validate(config_path: &std::path::Path) -> Result<(), MergeError> {
    let config = ConfigService::load_from_path(config_path).await?;
    tracing::info!(
        concurrent_workers = config.limits.concurrent_workers,
        max_memory_usage = config.limits.max_memory_usage,
        "configuration is valid"
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn merge(
    inputs: Vec<std::path::PathBuf>,
    output: std::path::PathBuf,
    temp_dir: Option<std::path::PathBuf>,
    max_memory_mb: Option<u64>,
    chunk_size: Option<usize>,
    concurrent_workers: Option<usize>,
    use_streaming: bool,
    optimize_memory: bool,
) -> Result<(), MergeError> {
    let start_dir = std::env::current_dir().map_err(|e| MergeError::io(e.to_string()))?;
    let loaded = ConfigService::load_or_default(&start_dir).await?;

    let mut options = MergeJobOptions::default()
        .with_max_memory(max_memory_mb.map(|mb| mb * 1024 * 1024).unwrap_or(loaded.limits.max_memory_usage));
    if let Some(dir) = temp_dir {
        options = options.with_temp_dir(dir);
    }
    if let Some(chunk_size) = chunk_size {
        options = options.with_chunk_size(chunk_size);
    }
    if let Some(workers) = concurrent_workers {
        options = options.with_concurrent_workers(workers);
    }
    options.use_streaming = use_streaming;
    options.optimize_memory = optimize_memory;

    let cancellation = CancellationToken::new();
    let job = MergeJob::new(inputs, output).with_options(options).with_cancellation(cancellation.clone());

    let backend = Arc::new(ConcatenatingBackend::new());
    let platform = create_platform();
    let engine = StreamingMergeEngine::new(backend, platform, loaded.streaming);

    let shutdown = ShutdownCoordinator::new(Duration::from_secs(10));
    let signals = create_signal_handler();
    let shutdown_for_signal = shutdown.clone();
    let signal_task = tokio::spawn(async move {
        signals
            .wait_for_signal(Box::new(move || {
                shutdown_for_signal.initiate_shutdown();
            }))
            .await;
    });

    let bootstrap_token = shutdown.token();
    let cancel_forwarder = tokio::spawn(async move {
        bootstrap_token.cancelled().await;
        cancellation.cancel();
    });

    let result = engine.merge_streaming(job).await;

    cancel_forwarder.abort();
    signal_task.abort();

    match &result {
        Ok(summary) => {
            tracing::info!(
                output = %summary.output_path.display(),
                processed = summary.processed_files,
                skipped = summary.skipped_files.len(),
                strategy = ?summary.strategy,
                "merge completed"
            );
        }
        Err(err) => {
            tracing::debug!(error = %err, "merge did not complete");
        }
    }

    result.map(|_| ())
}
