// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # PDF Backend Port
//!
//! The engine treats the PDF codec as an opaque collaborator: it knows
//! nothing about PDF internals, only this contract. Any implementation —
//! an embedded native codec, a process it shells out to, or (for tests) an
//! in-memory fake — satisfies `Backend` and can be injected as
//! `Arc<dyn Backend>`.
//!
//! The blanket `impl Backend for Arc<dyn Backend>` below is a delegation
//! idiom for trait objects behind `Arc`: it lets any owner of a shared
//! backend handle treat it as a `Backend` itself, without an extra wrapper
//! type.

use crate::error::MergeError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// The three buckets the engine ever branches on for a single input's
/// validation outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidateOutcome {
    /// The input is structurally sound and may be merged.
    Ok,
    /// The input should be skipped but the job continues
    /// (`InvalidFile`/`Corrupted`/`Encrypted`).
    Skip { reason: MergeError },
    /// An environment-level failure (`Io`) that is not specific to this
    /// input's content.
    FatalEnvironment { reason: MergeError },
}

/// Reporting-only metadata about a PDF, not on the critical merge path.
#[derive(Debug, Clone, Default)]
pub struct PdfInfo {
    pub page_count: Option<u64>,
    pub is_encrypted: bool,
}

/// Large-file-mode reconfiguration hints. Backends that do not support
/// dynamic reconfiguration may ignore every field; the default
/// implementation below is a no-op.
#[derive(Debug, Clone, Default)]
pub struct BackendOptions {
    pub minimal_memory: bool,
    pub enable_object_stream_compaction: bool,
    pub enable_xref_stream_compaction: bool,
    pub relaxed_validation: bool,
}

/// The opaque PDF codec contract. `Send + Sync` so it can be shared
/// across chunk workers as `Arc<dyn Backend>`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Structural validation of a single input.
    async fn validate(&self, path: &Path) -> ValidateOutcome;

    /// Concatenate `inputs` (in order) into `out_path`. Identity error
    /// mapping: whatever the backend returns surfaces unchanged.
    async fn merge(&self, inputs: &[PathBuf], out_path: &Path) -> Result<(), MergeError>;

    /// Reporting-only metadata, never on the critical path.
    async fn info(&self, path: &Path) -> Result<PdfInfo, MergeError>;

    /// Release any backend-held resources (process handles, caches, ...).
    async fn close(&self) -> Result<(), MergeError> {
        Ok(())
    }

    /// Optional large-file-mode tuning. Backends that can't reconfigure
    /// dynamically simply accept the default no-op.
    async fn reconfigure(&self, _options: BackendOptions) -> Result<(), MergeError> {
        Ok(())
    }
}

#[async_trait]
impl Backend for std::sync::Arc<dyn Backend> {
    async fn validate(&self, path: &Path) -> ValidateOutcome {
        (**self).validate(path).await
    }

    async fn merge(&self, inputs: &[PathBuf], out_path: &Path) -> Result<(), MergeError> {
        (**self).merge(inputs, out_path).await
    }

    async fn info(&self, path: &Path) -> Result<PdfInfo, MergeError> {
        (**self).info(path).await
    }

    async fn close(&self) -> Result<(), MergeError> {
        (**self).close().await
    }

    async fn reconfigure(&self, options: BackendOptions) -> Result<(), MergeError> {
        (**self).reconfigure(options).await
    }
}
