// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Wire envelope for bridge messages.
//
//   { "type": "TAKE_PHOTO", "data": { ... }, "id": "1718000000000_7" }
//
// `id` is present on request/response pairs and absent on fire-and-forget
// notifications. Responses carry the type `<REQUEST_TYPE>_RESPONSE` and the
// request's `id`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use webshell_core::error::{Result, WebshellError};
use webshell_core::types::MessageType;

/// Suffix appended to a request type to form its response type.
pub const RESPONSE_SUFFIX: &str = "_RESPONSE";

/// One bridge message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Envelope {
    /// A correlated request.
    pub fn request(message_type: impl Into<String>, data: Value, id: impl Into<String>) -> Self {
        Self {
            message_type: message_type.into(),
            data,
            id: Some(id.into()),
        }
    }

    /// A fire-and-forget notification (no `id`).
    pub fn notification(message_type: MessageType, data: Value) -> Self {
        Self {
            message_type: message_type.as_str().to_string(),
            data,
            id: None,
        }
    }

    /// Parse and validate a raw message from the page.
    ///
    /// Rejects non-JSON input, non-object JSON, and a missing or empty `type`.
    pub fn parse(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| WebshellError::MalformedEnvelope(e.to_string()))?;
        if !value.is_object() {
            return Err(WebshellError::MalformedEnvelope("expected a JSON object".into()));
        }
        let envelope: Envelope = serde_json::from_value(value)
            .map_err(|e| WebshellError::MalformedEnvelope(e.to_string()))?;

        if envelope.message_type.trim().is_empty() {
            return Err(WebshellError::MalformedEnvelope("empty message type".into()));
        }
        if envelope.id.as_deref().is_some_and(str::is_empty) {
            return Err(WebshellError::MalformedEnvelope("empty correlation id".into()));
        }
        Ok(envelope)
    }

    /// Build the response to this envelope. Returns `None` for notifications,
    /// which never get a response.
    pub fn respond(&self, data: Value) -> Option<Envelope> {
        let id = self.id.clone()?;
        Some(Envelope {
            message_type: format!("{}{RESPONSE_SUFFIX}", self.message_type),
            data,
            id: Some(id),
        })
    }

    /// The catalog entry for this envelope, if it is one.
    pub fn known_type(&self) -> Option<MessageType> {
        MessageType::parse(&self.message_type)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Successful result body: the serialized value with `success: true` merged in.
///
/// Non-object values are wrapped as `{ success: true, value }`.
pub fn success_body<T: Serialize>(value: &T) -> Result<Value> {
    let body = match serde_json::to_value(value)? {
        Value::Object(mut fields) => {
            fields.insert("success".into(), Value::Bool(true));
            Value::Object(fields)
        }
        Value::Null => success_only(),
        other => {
            let mut fields = Map::new();
            fields.insert("success".into(), Value::Bool(true));
            fields.insert("value".into(), other);
            Value::Object(fields)
        }
    };
    Ok(body)
}

/// `{ success: true }`.
pub fn success_only() -> Value {
    serde_json::json!({ "success": true })
}

/// Failure result body: `{ success: false, error }`.
///
/// Unknown message types also echo the offending `type` so the page can tell
/// an unsupported call apart from a failed one.
pub fn failure_body(err: &WebshellError) -> Value {
    match err {
        WebshellError::UnknownMessageType(message_type) => serde_json::json!({
            "success": false,
            "error": err.to_string(),
            "type": message_type,
        }),
        _ => serde_json::json!({
            "success": false,
            "error": err.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_request_without_data() {
        let env = Envelope::parse(r#"{"type":"GET_LOCATION","id":"1_1"}"#).expect("parse");
        assert_eq!(env.message_type, "GET_LOCATION");
        assert_eq!(env.data, Value::Null);
        assert_eq!(env.id.as_deref(), Some("1_1"));
        assert_eq!(env.known_type(), Some(MessageType::GetLocation));
    }

    #[test]
    fn parse_rejects_non_json() {
        assert!(matches!(
            Envelope::parse("hello from the page"),
            Err(WebshellError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn parse_rejects_missing_or_empty_type() {
        assert!(Envelope::parse(r#"{"data":{},"id":"1"}"#).is_err());
        assert!(Envelope::parse(r#"{"type":"  ","id":"1"}"#).is_err());
        assert!(Envelope::parse(r#"["TAKE_PHOTO"]"#).is_err());
    }

    #[test]
    fn parse_rejects_empty_id() {
        assert!(Envelope::parse(r#"{"type":"VIBRATE","id":""}"#).is_err());
    }

    #[test]
    fn notifications_have_no_response() {
        let env = Envelope::parse(r#"{"type":"USER_AUTH","data":{"userId":"7"}}"#).expect("parse");
        assert!(env.respond(success_only()).is_none());
    }

    #[test]
    fn response_echoes_id_and_suffixes_type() {
        let env = Envelope::request("VIBRATE", Value::Null, "abc");
        let resp = env.respond(success_only()).expect("response");
        assert_eq!(resp.message_type, "VIBRATE_RESPONSE");
        assert_eq!(resp.id.as_deref(), Some("abc"));
    }

    #[test]
    fn notification_serializes_without_id() {
        let env = Envelope::notification(MessageType::BridgeReady, serde_json::json!({}));
        let json = env.to_json().expect("json");
        assert_eq!(json, r#"{"type":"BRIDGE_READY","data":{}}"#);
    }

    #[test]
    fn success_body_merges_flag() {
        #[derive(Serialize)]
        struct Saved {
            uri: &'static str,
        }
        let body = success_body(&Saved { uri: "ph://1" }).expect("body");
        assert_eq!(body, serde_json::json!({ "success": true, "uri": "ph://1" }));
    }

    #[test]
    fn unknown_type_failure_echoes_type() {
        let body = failure_body(&WebshellError::UnknownMessageType("TELEPORT".into()));
        assert_eq!(body["success"], false);
        assert_eq!(body["type"], "TELEPORT");
        assert!(body["error"].as_str().is_some_and(|e| e.contains("TELEPORT")));
    }
}
