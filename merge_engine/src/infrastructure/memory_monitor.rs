// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Memory Monitor
//!
//! Samples process memory through the [`Platform`] abstraction and
//! classifies the result into a [`MemoryPressure`] level the strategy
//! selector and sizer read off of.
//!
//! Sampling `/proc/self/status`-equivalent values on every call would add
//! a syscall to every chunk-sizing decision in the hot path, so samples
//! are throttled to `sample_interval` (default 100ms) and cached in an
//! atomic between refreshes - readers never block on a lock to get a
//! recent-enough value.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use merge_domain::value_objects::MemoryPressure;
use parking_lot::Mutex;

use super::platform::Platform;

/// Default interval between fresh process memory samples.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Samples process memory and classifies pressure against a configured
/// budget.
///
/// Cheap to clone: the sample cache is shared via `Arc`.
#[derive(Clone)]
pub struct MemoryMonitor {
    platform: Arc<dyn Platform>,
    sample_interval: Duration,
    last_sample_bytes: Arc<AtomicU64>,
    last_sample_at: Arc<Mutex<Instant>>,
}

impl MemoryMonitor {
    /// Build a monitor with the default sample interval.
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self::with_sample_interval(platform, DEFAULT_SAMPLE_INTERVAL)
    }

    pub fn with_sample_interval(platform: Arc<dyn Platform>, sample_interval: Duration) -> Self {
        let initial = platform.process_resident_memory().unwrap_or(0);
        Self {
            platform,
            sample_interval,
            last_sample_bytes: Arc::new(AtomicU64::new(initial)),
            last_sample_at: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Most recently observed process memory allocation, refreshing the
    /// sample if `sample_interval` has elapsed.
    pub fn allocated_bytes(&self) -> u64 {
        let should_refresh = {
            let last_at = self.last_sample_at.lock();
            last_at.elapsed() >= self.sample_interval
        };

        if should_refresh {
            let mut last_at = self.last_sample_at.lock();
            // Re-check under the lock: another thread may have refreshed
            // between the optimistic read above and acquiring the lock.
            if last_at.elapsed() >= self.sample_interval {
                if let Ok(bytes) = self.platform.process_resident_memory() {
                    self.last_sample_bytes.store(bytes, Ordering::Relaxed);
                }
                *last_at = Instant::now();
            }
        }

        self.last_sample_bytes.load(Ordering::Relaxed)
    }

    /// Classify current memory pressure against the configured budget.
    #[tracing::instrument(skip(self), fields(max_memory, warning_threshold, critical_threshold))]
    pub fn check_pressure(&self, max_memory: u64, warning_threshold: f64, critical_threshold: f64) -> MemoryPressure {
        let allocated = self.allocated_bytes();
        MemoryPressure::classify(allocated, max_memory, warning_threshold, critical_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::platform::PlatformError;
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::AtomicU64 as StdAtomicU64;

    struct FakePlatform {
        rss: StdAtomicU64,
    }

    #[async_trait]
    impl Platform for FakePlatform {
        fn page_size(&self) -> usize {
            4096
        }
        fn cpu_count(&self) -> usize {
            4
        }
        fn total_memory(&self) -> Result<u64, PlatformError> {
            Ok(16 * 1024 * 1024 * 1024)
        }
        fn available_memory(&self) -> Result<u64, PlatformError> {
            Ok(8 * 1024 * 1024 * 1024)
        }
        fn process_resident_memory(&self) -> Result<u64, PlatformError> {
            Ok(self.rss.load(Ordering::Relaxed))
        }
        fn line_separator(&self) -> &'static str {
            "\n"
        }
        fn path_separator(&self) -> char {
            ':'
        }
        fn platform_name(&self) -> &'static str {
            "fake"
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
        async fn sync_file(&self, _file: &tokio::fs::File) -> Result<(), PlatformError> {
            Ok(())
        }
    }

    fn fake(rss: u64) -> Arc<FakePlatform> {
        Arc::new(FakePlatform { rss: StdAtomicU64::new(rss) })
    }

    #[test]
    fn reports_initial_sample_immediately() {
        let monitor = MemoryMonitor::new(fake(100));
        assert_eq!(monitor.allocated_bytes(), 100);
    }

    #[test]
    fn does_not_refresh_before_interval_elapses() {
        let platform = fake(100);
        let monitor = MemoryMonitor::with_sample_interval(platform.clone(), Duration::from_secs(60));

        platform.rss.store(999, Ordering::Relaxed);

        assert_eq!(monitor.allocated_bytes(), 100);
    }

    #[test]
    fn refreshes_after_interval_elapses() {
        let platform = fake(100);
        let monitor = MemoryMonitor::with_sample_interval(platform.clone(), Duration::from_millis(1));

        platform.rss.store(999, Ordering::Relaxed);
        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(monitor.allocated_bytes(), 999);
    }

    #[test]
    fn classifies_pressure_from_sampled_allocation() {
        let monitor = MemoryMonitor::new(fake(850));
        let pressure = monitor.check_pressure(1000, 0.70, 0.85);
        assert_eq!(pressure, MemoryPressure::Critical);
    }
}
