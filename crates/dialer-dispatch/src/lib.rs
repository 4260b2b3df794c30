// SPDX-FileCopyrightText: 2026 Dialer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capacity-gated dispatcher for the outbound call queue.
//!
//! One invocation reads the number of active calls, admits at most the
//! remaining capacity of pending items in priority order, and drives each
//! admitted item through claim, call record, provider call, reconciliation,
//! and lead update. Per-item failures are recorded on the item and never
//! abort the batch.
//!
//! - [`CapacityGate`] computes the free slots.
//! - [`Selector`] picks the pending items to admit.
//! - [`Dispatcher`] runs the per-item state machine.
//! - [`LeadStateUpdater`] advances the lead after a placed call.
//! - [`QueueProcessor`] is the invocation entrypoint.
//! - [`RequeuePolicy`] optionally retries failed items.
//! - [`QueuePoller`] triggers the processor on an interval.

pub mod capacity;
pub mod dispatcher;
pub mod lead;
pub mod poller;
pub mod processor;
pub mod retry;
pub mod selector;

pub use capacity::{Capacity, CapacityGate, QueueStats, queue_stats};
pub use dispatcher::Dispatcher;
pub use lead::LeadStateUpdater;
pub use poller::QueuePoller;
pub use processor::QueueProcessor;
pub use retry::RequeuePolicy;
pub use selector::Selector;
