// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Resource Pool
//!
//! Bounds chunk/batch worker concurrency with a `tokio::sync::Semaphore`,
//! a single resource-pool token dimension for the one thing this engine
//! needs to bound: `max_concurrent_chunks`.

use std::sync::Arc;

use tokio::sync::{Semaphore, SemaphorePermit};

/// Bounded worker pool for chunk/batch merge tasks.
#[derive(Clone)]
pub struct ResourcePool {
    semaphore: Arc<Semaphore>,
}

impl ResourcePool {
    pub fn new(max_concurrent: usize) -> Self {
        Self { semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))) }
    }

    /// Acquire a permit, waiting if the pool is at capacity.
    pub async fn acquire(&self) -> SemaphorePermit<'_> {
        // The semaphore is never closed, so `acquire` cannot fail.
        self.semaphore.acquire().await.expect("resource pool semaphore is never closed")
    }

    /// Number of permits currently available (for diagnostics/tests).
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}
