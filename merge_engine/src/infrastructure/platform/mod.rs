// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Platform Abstraction Module
//!
//! OS-specific operations behind a single trait, selected at compile time.
//!
//! ## Architecture Pattern
//!
//! - **Interface**: `Platform` trait defines the contract
//! - **Implementations**:
//!   - `UnixPlatform`: POSIX implementation (Linux + macOS)
//!   - `WindowsPlatform`: Windows API implementation
//! - **Selection**: Compile-time platform selection via `#[cfg]`
//!
//! This lives in the engine crate (not the CLI-facing bootstrap crate)
//! because the memory monitor (`infrastructure::memory_monitor`) needs it
//! to sample process memory, and the engine must not depend on the crate
//! that depends on it.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[cfg(unix)]
mod unix;

#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use unix::UnixPlatform;

#[cfg(windows)]
pub use windows::WindowsPlatform;

/// Platform-specific errors.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not supported on this platform: {0}")]
    NotSupported(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Platform error: {0}")]
    Other(String),
}

/// Platform abstraction trait for OS-specific operations.
///
/// All methods are stateless and thread-safe; implementations favor
/// native platform APIs with conservative fallbacks when unavailable.
#[async_trait]
pub trait Platform: Send + Sync {
    /// System page size in bytes, used for buffer alignment.
    fn page_size(&self) -> usize;

    /// Number of logical CPU cores available to the process.
    fn cpu_count(&self) -> usize;

    /// Total physical system memory in bytes.
    fn total_memory(&self) -> Result<u64, PlatformError>;

    /// Available (free) system memory in bytes.
    fn available_memory(&self) -> Result<u64, PlatformError>;

    /// Resident set size of the current process, in bytes.
    ///
    /// This is the sample the memory monitor uses for pressure
    /// classification: it reflects what *this* process is holding, not
    /// system-wide usage.
    fn process_resident_memory(&self) -> Result<u64, PlatformError>;

    fn line_separator(&self) -> &'static str;
    fn path_separator(&self) -> char;
    fn platform_name(&self) -> &'static str;
    fn temp_dir(&self) -> PathBuf;

    /// True if running with elevated privileges (root / Administrator).
    fn is_elevated(&self) -> bool;

    /// Set file permissions. No-op on Windows.
    fn set_permissions(&self, path: &Path, mode: u32) -> Result<(), PlatformError>;

    /// True if the path points to an executable file.
    fn is_executable(&self, path: &Path) -> bool;

    /// Flush file buffers to stable storage.
    async fn sync_file(&self, file: &tokio::fs::File) -> Result<(), PlatformError>;
}

#[cfg(unix)]
type PlatformImpl = UnixPlatform;

#[cfg(windows)]
type PlatformImpl = WindowsPlatform;

/// Create the platform-specific implementation for the current OS.
pub fn create_platform() -> std::sync::Arc<dyn Platform> {
    std::sync::Arc::new(PlatformImpl::new())
}
