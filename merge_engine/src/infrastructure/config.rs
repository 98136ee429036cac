// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Configuration
//!
//! `MergeEngineConfig` is the on-disk/environment-facing envelope a caller
//! assembles before constructing `StreamingConfig`/`MergeJob` options.
//! `ConfigService` looks for `merge_engine.toml` starting at the current
//! working directory and climbing up to 4 parent levels, falling back to
//! `Default::default()` with a logged warning when nothing is found.

use std::path::{Path, PathBuf};

use merge_domain::entities::StreamingConfig;
use merge_domain::error::MergeError;
use serde::{Deserialize, Serialize};

const DISCOVERY_FILENAME: &str = "merge_engine.toml";
const MAX_PARENT_LEVELS: usize = 4;

/// Output format for the tracing-subscriber initializer bootstrap builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Default for LogFormat {
    fn default() -> Self {
        Self::Pretty
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitSettings {
    pub max_memory_usage: u64,
    pub temp_directory: PathBuf,
    pub enable_gc: bool,
    pub concurrent_workers: usize,
    pub use_streaming: bool,
    pub optimize_memory: bool,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            max_memory_usage: 512 * 1024 * 1024,
            temp_directory: std::env::temp_dir(),
            enable_gc: false,
            concurrent_workers: 4,
            use_streaming: true,
            optimize_memory: false,
        }
    }
}

/// The full on-disk configuration envelope: `{logging, limits, streaming}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeEngineConfig {
    pub logging: LoggingSettings,
    pub limits: LimitSettings,
    pub streaming: StreamingConfig,
}

/// Loads `MergeEngineConfig` from an explicit path or by directory-upward
/// discovery, falling back to defaults.
pub struct ConfigService;

impl ConfigService {
    /// Load from an explicit path. A missing or malformed file is an error
    /// here — the caller asked for this specific file.
    pub async fn load_from_path(path: &Path) -> Result<MergeEngineConfig, MergeError> {
        let contents = tokio::fs::read_to_string(path).await?;
        toml::from_str(&contents).map_err(|e| MergeError::invalid_config(format!("{}: {e}", path.display())))
    }

    /// Load via directory-upward discovery from `start_dir`, falling back to
    /// `Default::default()` with a `tracing::warn!` when no file is found.
    /// Malformed files that *are* found are still a hard error.
    pub async fn load_or_default(start_dir: &Path) -> Result<MergeEngineConfig, MergeError> {
        match Self::discover(start_dir).await {
            Some(path) => Self::load_from_path(&path).await,
            None => {
                tracing::warn!(
                    start_dir = %start_dir.display(),
                    filename = DISCOVERY_FILENAME,
                    "no configuration file found within {} parent levels, using defaults",
                    MAX_PARENT_LEVELS
                );
                Ok(MergeEngineConfig::default())
            }
        }
    }

    async fn discover(start_dir: &Path) -> Option<PathBuf> {
        let mut dir = Some(start_dir.to_path_buf());

        for _ in 0..=MAX_PARENT_LEVELS {
            let candidate = dir.as_ref()?.join(DISCOVERY_FILENAME);
            if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                return Some(candidate);
            }
            dir = dir.and_then(|d| d.parent().map(Path::to_path_buf));
        }

        None
    }
}
