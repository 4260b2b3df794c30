// SPDX-FileCopyrightText: 2026 Dialer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call provider trait for the external voice-calling service.

use async_trait::async_trait;

use crate::error::DialerError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{CallHandle, CallRequest};

/// Adapter for the service that actually places outbound calls.
///
/// A single attempt per call: implementations must not retry. Any non-2xx
/// answer is an error whose message carries the response body.
#[async_trait]
pub trait CallProvider: PluginAdapter {
    /// Ask the provider to place a call.
    async fn make_call(&self, request: &CallRequest) -> Result<CallHandle, DialerError>;
}
