// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Rollback Manager
//!
//! Content-preserving backup/restore around a single output path, used by
//! the atomic writer and the top-level merge orchestration. All operations
//! serialize on an internal `tokio::sync::Mutex` so a backup taken by one
//! caller can never interleave with a restore issued by another.

use std::future::Future;
use std::path::{Path, PathBuf};

use chrono::Utc;
use merge_domain::error::MergeError;
use tokio::sync::Mutex;

/// Backs up, restores, and cleans up a single output file's prior state.
pub struct RollbackManager {
    backup_dir: PathBuf,
    lock: Mutex<()>,
}

impl RollbackManager {
    pub fn new(backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            backup_dir: backup_dir.into(),
            lock: Mutex::new(()),
        }
    }

    /// Copy `path`'s current content into the backup directory. Returns
    /// `None` if `path` does not exist (nothing to protect).
    pub async fn backup(&self, path: &Path) -> Result<Option<PathBuf>, MergeError> {
        let _guard = self.lock.lock().await;

        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Ok(None);
        }

        tokio::fs::create_dir_all(&self.backup_dir).await?;
        let backup_path = self.backup_path_for(path);
        tokio::fs::copy(path, &backup_path).await?;
        Ok(Some(backup_path))
    }

    /// Overwrite `target` with the content at `backup_path`, byte-for-byte.
    pub async fn restore(&self, backup_path: &Path, target: &Path) -> Result<(), MergeError> {
        let _guard = self.lock.lock().await;
        tokio::fs::copy(backup_path, target).await?;
        Ok(())
    }

    /// Delete a backup that is no longer needed (the operation it guarded
    /// succeeded). Missing files are not an error.
    pub async fn discard(&self, backup_path: &Path) -> Result<(), MergeError> {
        let _guard = self.lock.lock().await;
        match tokio::fs::remove_file(backup_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Backup `target`, run `op`, and on failure restore the backup before
    /// propagating the error. On success, discard the backup.
    pub async fn run_with_rollback<F, Fut, T>(&self, target: &Path, op: F) -> Result<T, MergeError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, MergeError>>,
    {
        let backup = self.backup(target).await?;

        match op().await {
            Ok(value) => {
                if let Some(backup_path) = backup {
                    self.discard(&backup_path).await?;
                }
                Ok(value)
            }
            Err(err) => {
                if let Some(backup_path) = backup {
                    tracing::warn!(error = %err, path = %target.display(), "restoring backup after failed operation");
                    self.restore(&backup_path, target).await?;
                }
                Err(err)
            }
        }
    }

    fn backup_path_for(&self, path: &Path) -> PathBuf {
        let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| "output".to_string());
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        self.backup_dir.join(format!("{stem}_backup_{timestamp}.pdf"))
    }
}
