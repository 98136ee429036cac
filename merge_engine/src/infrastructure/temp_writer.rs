// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Production [`TempWriter`] implementation: a plain `tokio::fs::write`.
//! Test doubles that inject transient failures live alongside the
//! atomic writer's own tests rather than here.

use std::path::Path;

use async_trait::async_trait;
pub use merge_domain::services::TempWriter;
use merge_domain::error::MergeError;

/// Writes bytes straight to disk via `tokio::fs::write`.
pub struct FsTempWriter;

impl FsTempWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FsTempWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TempWriter for FsTempWriter {
    async fn write_temp(&self, path: &Path, bytes: &[u8]) -> Result<(), MergeError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn writes_bytes_to_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("artifact.pdf");
        let writer = FsTempWriter::new();

        writer.write_temp(&path, b"%PDF-1.7 hello").await.unwrap();

        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"%PDF-1.7 hello");
    }
}
