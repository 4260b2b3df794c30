// SPDX-FileCopyrightText: 2026 Dialer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the dialer call-queue dispatcher.
//!
//! This crate provides the error type, the domain types (queue items, leads,
//! agents, call records, dispatch summaries), and the adapter traits that the
//! storage, call provider, and dispatch crates are written against.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::DialerError;
pub use types::{AdapterType, HealthStatus};

pub use traits::{
    AgentStore, CallProvider, CallRecordStore, LeadStore, PluginAdapter, QueueStore,
    StorageAdapter,
};
