// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Merge Domain
//!
//! Pure business logic for the streaming PDF merge engine: value objects,
//! entities, the error taxonomy, and the service ports (`Backend`,
//! `TempWriter`, `ProgressObserver`) that infrastructure adapters satisfy.
//!
//! ## Layering
//!
//! This crate has no `tokio` runtime dependency beyond the `sync` feature
//! needed for the cancellation token's async notification, no file I/O, and
//! no `tracing`. Everything here is deterministic given its inputs — the
//! strategy selector and chunk/batch sizer in `merge_engine` are pure
//! functions over these types and can be tested without a filesystem or an
//! async runtime.

pub mod cancellation;
pub mod entities;
pub mod error;
pub mod services;
pub mod value_objects;

pub use cancellation::CancellationToken;
pub use error::MergeError;
