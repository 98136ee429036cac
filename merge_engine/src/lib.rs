// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Merge Engine
//!
//! Infrastructure adapters and application logic for the streaming PDF
//! merge engine: adaptive strategy selection, chunked/concurrent/
//! memory-optimized merge paths, atomic output replacement with rollback,
//! and the ambient stack (configuration, platform abstraction, resource
//! governance) that supports them.
//!
//! `application` holds pure decision logic (`strategy_selector`, `sizer`,
//! `workload_analyzer`) and the [`application::StreamingMergeEngine`]
//! orchestrator; `infrastructure` holds every concrete adapter satisfying a
//! `merge_domain` service port.

pub mod application;
pub mod infrastructure;

pub use application::StreamingMergeEngine;
pub use infrastructure::{
    create_platform, AtomicWriter, ConcatenatingBackend, ConfigService, FsTempWriter, MemoryMonitor,
    MergeEngineConfig, Platform, PlatformError, ProgressTracker, ResourcePool, RetryPolicy, RollbackManager, Step,
};
