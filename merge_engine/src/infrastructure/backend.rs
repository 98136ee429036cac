// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Reference Backend
//!
//! The real PDF codec is explicitly out of scope; this is the fake the
//! engine's own tests and the bootstrap binary wire up in its place. It
//! validates the `%PDF-` magic and a non-truncated trailer, and "merges" by
//! concatenating each input's page-object bytes into one well-formed-enough
//! output — good enough to exercise every strategy path without a real PDF
//! library in the dependency graph.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use merge_domain::error::MergeError;
use merge_domain::services::{Backend, BackendOptions, PdfInfo, ValidateOutcome};
use parking_lot::Mutex;

const PDF_MAGIC: &[u8] = b"%PDF-";
const PDF_TRAILER: &[u8] = b"%%EOF";

/// Concatenation-style reference [`Backend`]. Not a real PDF codec: it
/// trusts well-formed fixtures and exists to exercise the engine's control
/// flow (validation branches, merge, reconfiguration, close) end to end.
pub struct ConcatenatingBackend {
    options: Mutex<BackendOptions>,
    closed: AtomicBool,
}

impl ConcatenatingBackend {
    pub fn new() -> Self {
        Self { options: Mutex::new(BackendOptions::default()), closed: AtomicBool::new(false) }
    }

    fn current_options(&self) -> BackendOptions {
        self.options.lock().clone()
    }
}

impl Default for ConcatenatingBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for ConcatenatingBackend {
    async fn validate(&self, path: &Path) -> ValidateOutcome {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => return ValidateOutcome::FatalEnvironment { reason: MergeError::from(e) },
        };

        if bytes.len() < PDF_MAGIC.len() + PDF_TRAILER.len() {
            return ValidateOutcome::Skip {
                reason: MergeError::corrupted(path.display().to_string(), "file is too short to be a valid PDF"),
            };
        }

        if !bytes.starts_with(PDF_MAGIC) {
            return ValidateOutcome::Skip {
                reason: MergeError::invalid_file(path.display().to_string(), "missing %PDF- header"),
            };
        }

        let tail = &bytes[bytes.len().saturating_sub(PDF_TRAILER.len() + 8)..];
        if !tail.windows(PDF_TRAILER.len()).any(|w| w == PDF_TRAILER) {
            return ValidateOutcome::Skip {
                reason: MergeError::corrupted(path.display().to_string(), "missing trailing %%EOF marker"),
            };
        }

        if contains_encryption_dict(&bytes) {
            return ValidateOutcome::Skip {
                reason: MergeError::Encrypted { path: path.display().to_string() },
            };
        }

        ValidateOutcome::Ok
    }

    async fn merge(&self, inputs: &[PathBuf], out_path: &Path) -> Result<(), MergeError> {
        let mut merged = Vec::new();
        merged.extend_from_slice(PDF_MAGIC);
        merged.extend_from_slice(b"1.7\n");

        for input in inputs {
            let bytes = tokio::fs::read(input).await?;
            let body_start = bytes.iter().position(|&b| b == b'\n').map(|i| i + 1).unwrap_or(0);
            let body_end = bytes.len().saturating_sub(PDF_TRAILER.len());
            merged.extend_from_slice(&bytes[body_start..body_end.max(body_start)]);
        }

        merged.extend_from_slice(PDF_TRAILER);
        merged.push(b'\n');

        if let Some(parent) = out_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(out_path, merged).await?;
        Ok(())
    }

    async fn info(&self, path: &Path) -> Result<PdfInfo, MergeError> {
        let bytes = tokio::fs::read(path).await?;
        let page_count = bytes.windows(7).filter(|w| *w == b"/Type /").count() as u64;
        Ok(PdfInfo { page_count: Some(page_count), is_encrypted: contains_encryption_dict(&bytes) })
    }

    async fn close(&self) -> Result<(), MergeError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn reconfigure(&self, options: BackendOptions) -> Result<(), MergeError> {
        *self.options.lock() = options;
        Ok(())
    }
}

fn contains_encryption_dict(bytes: &[u8]) -> bool {
    bytes.windows(9).any(|w| w == b"/Encrypt ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn fixture_pdf(body: &str) -> Vec<u8> {
        format!("%PDF-1.7\n{body}\n%%EOF\n").into_bytes()
    }

    #[tokio::test]
    async fn validates_well_formed_pdf() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.pdf");
        tokio::fs::write(&path, fixture_pdf("1 0 obj /Type /Page endobj")).await.unwrap();

        let backend = ConcatenatingBackend::new();
        assert_eq!(backend.validate(&path).await, ValidateOutcome::Ok);
    }

    #[tokio::test]
    async fn rejects_missing_magic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.pdf");
        tokio::fs::write(&path, b"not a pdf at all plus padding%%EOF").await.unwrap();

        let backend = ConcatenatingBackend::new();
        assert!(matches!(backend.validate(&path).await, ValidateOutcome::Skip { .. }));
    }

    #[tokio::test]
    async fn flags_encrypted_documents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.pdf");
        tokio::fs::write(&path, fixture_pdf("/Encrypt 5 0 R")).await.unwrap();

        let backend = ConcatenatingBackend::new();
        let outcome = backend.validate(&path).await;
        assert!(matches!(outcome, ValidateOutcome::Skip { reason: MergeError::Encrypted { .. } }));
    }

    #[tokio::test]
    async fn merges_inputs_in_order_into_single_output() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.pdf");
        let b = dir.path().join("b.pdf");
        let out = dir.path().join("out.pdf");
        tokio::fs::write(&a, fixture_pdf("PAGE_A")).await.unwrap();
        tokio::fs::write(&b, fixture_pdf("PAGE_B")).await.unwrap();

        let backend = ConcatenatingBackend::new();
        backend.merge(&[a, b], &out).await.unwrap();

        let merged = tokio::fs::read_to_string(&out).await.unwrap();
        assert!(merged.starts_with("%PDF-"));
        assert!(merged.ends_with("%%EOF\n"));
        let pos_a = merged.find("PAGE_A").unwrap();
        let pos_b = merged.find("PAGE_B").unwrap();
        assert!(pos_a < pos_b);
    }

    #[tokio::test]
    async fn reconfigure_is_visible_to_later_calls() {
        let backend = ConcatenatingBackend::new();
        backend.reconfigure(BackendOptions { minimal_memory: true, ..Default::default() }).await.unwrap();
        assert!(backend.current_options().minimal_memory);
    }
}
