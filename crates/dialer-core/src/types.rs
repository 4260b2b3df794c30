// SPDX-FileCopyrightText: 2026 Dialer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across adapter traits and the dispatcher.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Timestamp layout used for every persisted time value.
///
/// Fixed-width UTC so that lexical order equals chronological order in SQL.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Current UTC time formatted with [`TIMESTAMP_FORMAT`].
pub fn now_timestamp() -> String {
    format_timestamp(chrono::Utc::now())
}

/// Format a UTC instant with [`TIMESTAMP_FORMAT`].
pub fn format_timestamp(at: chrono::DateTime<chrono::Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    CallProvider,
    Observability,
}

// --- Queue ---

/// Lifecycle status of a [`QueueItem`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

/// One requested outbound call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub id: String,
    pub client_id: String,
    pub lead_id: String,
    pub agent_id: String,
    /// Set once a [`CallRecord`] exists for this item.
    pub call_id: Option<String>,
    pub status: QueueStatus,
    /// Higher is more urgent.
    pub priority: i64,
    /// Number of successful claims. Only consulted by the requeue policy.
    pub attempts: i64,
    pub queued_at: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub error_message: Option<String>,
}

impl QueueItem {
    /// Build a new pending item queued now.
    pub fn pending(
        client_id: impl Into<String>,
        lead_id: impl Into<String>,
        agent_id: impl Into<String>,
        priority: i64,
    ) -> Self {
        Self {
            id: uuid_v4(),
            client_id: client_id.into(),
            lead_id: lead_id.into(),
            agent_id: agent_id.into(),
            call_id: None,
            status: QueueStatus::Pending,
            priority,
            attempts: 0,
            queued_at: now_timestamp(),
            started_at: None,
            completed_at: None,
            error_message: None,
        }
    }
}

/// Result of an attempt to move a queue item from `pending` to `in_progress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The item is now `in_progress` and owned by the caller.
    Claimed,
    /// The item was no longer `pending` (another dispatcher got there first).
    AlreadyClaimed,
    /// Claiming would push the `in_progress` count past the configured cap.
    AtCapacity,
}

/// Number of queue items per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatusCounts {
    pub pending: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub failed: i64,
}

// --- Leads and agents ---

/// Well-known lead pipeline stages touched by the dispatcher.
///
/// Stages are free-form strings owned by the console; only these two matter here.
pub mod lead_stage {
    pub const NEW: &str = "new";
    pub const CONTACTED: &str = "contacted";
}

/// The subset of a lead the dispatcher reads and writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub client_id: String,
    pub phone_number: String,
    pub name: String,
    pub stage: String,
    pub last_call_at: Option<String>,
}

/// The subset of a voice agent the dispatcher needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: String,
    /// Identifier understood by the call provider.
    pub external_agent_id: String,
    pub name: String,
}

// --- Call records ---

/// Status of a [`CallRecord`].
///
/// The dispatcher only writes `Initiating` and `Queued`; the remaining states
/// are written by the call-lifecycle subsystem.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Initiating,
    Queued,
    Ringing,
    InProgress,
    Completed,
    Failed,
    NoAnswer,
    Busy,
    Canceled,
}

/// Provenance tag written into call metadata by the queue dispatcher.
pub const CALL_SOURCE_BULK_QUEUE: &str = "bulk_queue";

/// A local record of one outbound call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    pub id: String,
    pub agent_id: String,
    pub client_id: String,
    pub lead_id: String,
    pub status: CallStatus,
    /// Provider execution handle, unknown until the provider answers.
    pub external_call_id: Option<String>,
    pub started_at: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: String,
}

impl CallRecord {
    /// Build the `initiating` record for an admitted queue item.
    pub fn initiating(item: &QueueItem) -> Self {
        Self {
            id: uuid_v4(),
            agent_id: item.agent_id.clone(),
            client_id: item.client_id.clone(),
            lead_id: item.lead_id.clone(),
            status: CallStatus::Initiating,
            external_call_id: None,
            started_at: None,
            metadata: serde_json::json!({
                "source": CALL_SOURCE_BULK_QUEUE,
                "queueItemId": item.id,
            }),
            created_at: now_timestamp(),
        }
    }
}

// --- Provider ---

/// Correlation data echoed back by the provider in call webhooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallUserData {
    pub lead_id: String,
    pub lead_name: String,
    pub call_id: String,
    pub queue_item_id: String,
}

/// An outbound call request for the call provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub external_agent_id: String,
    pub recipient_phone_number: String,
    pub user_data: CallUserData,
}

/// What the provider returned for an accepted call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallHandle {
    /// Execution identifier, if the response carried one.
    pub execution_id: Option<String>,
}

// --- Dispatch results ---

/// Outcome of driving one queue item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    pub queue_item_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DispatchResult {
    pub fn succeeded(
        queue_item_id: impl Into<String>,
        call_id: impl Into<String>,
        execution_id: Option<String>,
    ) -> Self {
        Self {
            queue_item_id: queue_item_id.into(),
            call_id: Some(call_id.into()),
            execution_id,
            success: true,
            error: None,
        }
    }

    pub fn failed(
        queue_item_id: impl Into<String>,
        call_id: Option<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            queue_item_id: queue_item_id.into(),
            call_id,
            execution_id: None,
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Response of one dispatcher invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchSummary {
    pub success: bool,
    pub processed: usize,
    pub results: Vec<DispatchResult>,
    pub active_calls: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DispatchSummary {
    pub const AT_CAPACITY: &'static str = "at capacity";
    pub const NO_PENDING: &'static str = "no pending calls";
    pub const ALREADY_RUNNING: &'static str = "dispatch already running";

    fn idle(active_calls: i64, message: &str) -> Self {
        Self {
            success: true,
            processed: 0,
            results: Vec::new(),
            active_calls,
            message: Some(message.to_string()),
        }
    }

    pub fn at_capacity(active_calls: i64) -> Self {
        Self::idle(active_calls, Self::AT_CAPACITY)
    }

    pub fn no_pending(active_calls: i64) -> Self {
        Self::idle(active_calls, Self::NO_PENDING)
    }

    pub fn already_running(active_calls: i64) -> Self {
        Self::idle(active_calls, Self::ALREADY_RUNNING)
    }

    /// Summary of a dispatch cycle; `activeCalls` is prior load plus successes.
    pub fn dispatched(prior_active: i64, results: Vec<DispatchResult>) -> Self {
        let successes = results.iter().filter(|r| r.success).count() as i64;
        Self {
            success: true,
            processed: results.len(),
            active_calls: prior_active + successes,
            results,
            message: None,
        }
    }

    pub fn successes(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failures(&self) -> usize {
        self.results.iter().filter(|r| !r.success).count()
    }
}

fn uuid_v4() -> String {
    uuid::Uuid::new_v4().to_string()
}
