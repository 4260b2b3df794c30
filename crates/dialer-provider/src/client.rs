// SPDX-FileCopyrightText: 2026 Dialer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the voice-calling provider.
//!
//! One attempt per call. Retrying is the requeue policy's job, not the client's.

use std::time::Duration;

use dialer_core::DialerError;
use dialer_core::types::{CallHandle, CallRequest};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::types::{MakeCallRequest, MakeCallResponse};

/// Authenticated client bound to one provider base URL.
#[derive(Debug, Clone)]
pub struct ProviderClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ProviderClient {
    /// Creates a client sending `Authorization: Bearer <api_key>` on every request.
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, DialerError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| DialerError::Config(format!("invalid API key header value: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| DialerError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                status: None,
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn make_call_url(&self, external_agent_id: &str) -> String {
        format!("{}/agent/{external_agent_id}/make_call", self.base_url)
    }

    /// Place one outbound call.
    ///
    /// Any non-2xx status is an error whose message carries the status and the
    /// response body verbatim. A 2xx without a usable identifier is accepted
    /// with an empty handle.
    pub async fn make_call(&self, request: &CallRequest) -> Result<CallHandle, DialerError> {
        let body = MakeCallRequest {
            recipient_phone_number: &request.recipient_phone_number,
            user_data: &request.user_data,
        };

        let response = self
            .client
            .post(self.make_call_url(&request.external_agent_id))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DialerError::Timeout {
                        duration: self.timeout,
                    }
                } else {
                    DialerError::Provider {
                        message: format!("HTTP request failed: {e}"),
                        status: None,
                        source: Some(Box::new(e)),
                    }
                }
            })?;

        let status = response.status();
        debug!(status = %status, agent = %request.external_agent_id, "make_call response received");

        let text = response.text().await.map_err(|e| DialerError::Provider {
            message: format!("failed to read response body: {e}"),
            status: Some(status.as_u16()),
            source: Some(Box::new(e)),
        })?;

        if !status.is_success() {
            return Err(DialerError::provider(
                format!("call provider returned {status}: {text}"),
                Some(status.as_u16()),
            ));
        }

        let parsed = match serde_json::from_str::<MakeCallResponse>(&text) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "make_call response is not the expected JSON");
                MakeCallResponse::default()
            }
        };
        Ok(CallHandle {
            execution_id: parsed.execution_id(),
        })
    }
}
