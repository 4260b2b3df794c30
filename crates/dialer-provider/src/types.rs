// SPDX-FileCopyrightText: 2026 Dialer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the provider's `make_call` endpoint.

use dialer_core::types::CallUserData;
use serde::{Deserialize, Serialize};

/// Body of `POST /agent/{externalAgentId}/make_call`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MakeCallRequest<'a> {
    pub recipient_phone_number: &'a str,
    pub user_data: &'a CallUserData,
}

/// Successful `make_call` response.
///
/// Only the identifier matters. Providers have been seen returning it as
/// `execution_id`, `executionId`, or plain `id`, as a string or a number.
/// Some bodies carry more than one spelling, so each is its own field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MakeCallResponse {
    #[serde(default)]
    pub execution_id: Option<serde_json::Value>,
    #[serde(default, rename = "executionId")]
    pub execution_id_camel: Option<serde_json::Value>,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
}

impl MakeCallResponse {
    /// The first present identifier: `execution_id`, then `executionId`,
    /// then `id`.
    pub fn execution_id(&self) -> Option<String> {
        [&self.execution_id, &self.execution_id_camel, &self.id]
            .into_iter()
            .find_map(|value| value.as_ref().and_then(identifier))
    }
}

fn identifier(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> MakeCallResponse {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn execution_id_wins_over_id() {
        let resp = parse(r#"{"execution_id": "exec-1", "id": "other"}"#);
        assert_eq!(resp.execution_id().as_deref(), Some("exec-1"));
    }

    #[test]
    fn camel_case_execution_id_is_accepted() {
        let resp = parse(r#"{"executionId": "exec-2"}"#);
        assert_eq!(resp.execution_id().as_deref(), Some("exec-2"));
    }

    #[test]
    fn both_spellings_in_one_body_still_parse() {
        let resp = parse(r#"{"execution_id": "e1", "executionId": "e1", "id": "x"}"#);
        assert_eq!(resp.execution_id().as_deref(), Some("e1"));

        let resp = parse(r#"{"executionId": "camel", "id": "x"}"#);
        assert_eq!(resp.execution_id().as_deref(), Some("camel"));
    }

    #[test]
    fn falls_back_to_id() {
        let resp = parse(r#"{"id": 42, "status": "queued"}"#);
        assert_eq!(resp.execution_id().as_deref(), Some("42"));
    }

    #[test]
    fn empty_or_null_identifiers_are_absent() {
        assert_eq!(parse(r#"{"execution_id": null, "id": ""}"#).execution_id(), None);
        assert_eq!(parse("{}").execution_id(), None);
    }

    #[test]
    fn request_serializes_camel_case() {
        let user_data = CallUserData {
            lead_id: "l1".into(),
            lead_name: "Ada".into(),
            call_id: "c1".into(),
            queue_item_id: "q1".into(),
        };
        let body = MakeCallRequest {
            recipient_phone_number: "+15550100",
            user_data: &user_data,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["recipientPhoneNumber"], "+15550100");
        assert_eq!(json["userData"]["queueItemId"], "q1");
        assert_eq!(json["userData"]["leadName"], "Ada");
    }
}
