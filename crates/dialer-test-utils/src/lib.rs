// SPDX-FileCopyrightText: 2026 Dialer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for dialer integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockCallProvider`] - Call provider with scripted per-lead failures and call capture
//! - [`InstrumentedStorage`] - Storage decorator counting every operation
//! - [`TestHarness`] - Temp SQLite database with seeding helpers

pub mod harness;
pub mod instrumented;
pub mod mock_provider;

pub use harness::TestHarness;
pub use instrumented::InstrumentedStorage;
pub use mock_provider::MockCallProvider;
