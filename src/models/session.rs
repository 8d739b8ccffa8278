//! Live session state for the remote reactive component.
//!
//! The origin keeps its grid state in an opaque "serverMemo" document
//! correlated by a fingerprint. We never model that document fully: it is
//! held as an ordered JSON mapping and only the handful of fields the
//! scraper needs (`events`, `checksum`, `htmlHash`, viewport size) are
//! projected out, so unknown fields added by the origin survive merges.

use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Cookie the origin uses for its session token.
pub const SESSION_COOKIE_NAME: &str = "raspisanie_universitet_sirius_session";

/// Opaque state blob maintained by the remote component across calls.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerMemo {
    /// Component data: the only part we ever read fields out of
    #[serde(default)]
    pub data: Map<String, Value>,

    /// Everything else the origin tracks (checksum, htmlHash, ...)
    #[serde(flatten)]
    pub meta: Map<String, Value>,
}

impl ServerMemo {
    /// Merge an update response into this memo: last write wins per
    /// top-level key, both in `data` and in the metadata.
    pub fn merge_update(&mut self, update: ServerMemo) {
        for (key, value) in update.data {
            self.data.insert(key, value);
        }
        for (key, value) in update.meta {
            self.meta.insert(key, value);
        }
    }

    /// Current integrity checksum, if the origin reported one.
    pub fn checksum(&self) -> Option<&str> {
        self.meta.get("checksum").and_then(Value::as_str)
    }

    /// Hash of the last rendered HTML, if the origin reported one.
    pub fn html_hash(&self) -> Option<&str> {
        self.meta.get("htmlHash").and_then(Value::as_str)
    }
}

/// Initial page payload: fingerprint plus memo, exactly as embedded in
/// the `wire:initial-data` attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitialData {
    pub fingerprint: Value,
    #[serde(rename = "serverMemo")]
    pub server_memo: ServerMemo,
}

/// State owned by one protocol client. Never shared across callers.
#[derive(Debug, Clone)]
pub struct Session {
    /// Page the session was bootstrapped from (also the Referer)
    pub page_url: String,

    /// Livewire message endpoint for this component
    pub endpoint_url: String,

    /// Origin (scheme + host) derived from the page URL
    pub origin: String,

    /// XSRF cookie value
    pub xsrf_token: String,

    /// Session cookie value
    pub session_cookie: String,

    /// CSRF token embedded in the page body
    pub csrf_token: String,

    /// Opaque instance correlation blob
    pub fingerprint: Value,

    /// Evolving component state; mutated only by successful calls
    pub memo: ServerMemo,
}

/// One remote method invocation, ephemeral per call.
#[derive(Debug, Clone, Serialize)]
pub struct RemoteCall {
    /// Opaque correlation token
    pub id: String,

    /// Server-side handler name
    pub method: String,

    /// Ordered parameter list
    pub params: Vec<Value>,
}

impl RemoteCall {
    /// Build a call with a fresh correlation token.
    pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
        let id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(5)
            .map(char::from)
            .collect();
        Self {
            id: id.to_lowercase(),
            method: method.into(),
            params,
        }
    }

    /// Wire representation: `{"type":"callMethod","payload":{...}}`.
    pub fn to_update(&self) -> Value {
        serde_json::json!({
            "type": "callMethod",
            "payload": self,
        })
    }
}

/// Body of an update response from the message endpoint. Extra keys
/// (`effects` and friends) are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateResponse {
    #[serde(rename = "serverMemo", default)]
    pub server_memo: ServerMemo,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memo(data: Value, meta: &[(&str, &str)]) -> ServerMemo {
        let mut m = ServerMemo {
            data: data.as_object().cloned().unwrap_or_default(),
            meta: Map::new(),
        };
        for (k, v) in meta {
            m.meta.insert((*k).to_string(), Value::String((*v).to_string()));
        }
        m
    }

    #[test]
    fn merge_is_last_write_wins_per_key() {
        let mut base = memo(
            serde_json::json!({"week": 0, "events": {"mon": []}}),
            &[("checksum", "c0"), ("htmlHash", "h0")],
        );
        let update = memo(
            serde_json::json!({"week": 1}),
            &[("checksum", "c1"), ("htmlHash", "h1")],
        );

        base.merge_update(update);

        assert_eq!(base.data["week"], 1);
        // untouched keys survive
        assert!(base.data["events"].is_object());
        assert_eq!(base.checksum(), Some("c1"));
        assert_eq!(base.html_hash(), Some("h1"));
    }

    #[test]
    fn memo_round_trips_unknown_meta() {
        let raw = serde_json::json!({
            "data": {"events": {}},
            "checksum": "abc",
            "htmlHash": "def",
            "children": {"x": 1}
        });
        let memo: ServerMemo = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&memo).unwrap(), raw);
    }

    #[test]
    fn remote_call_wire_shape() {
        let call = RemoteCall::new("set", vec![Value::String("К0709-23/1".into())]);
        let update = call.to_update();
        assert_eq!(update["type"], "callMethod");
        assert_eq!(update["payload"]["method"], "set");
        assert_eq!(update["payload"]["params"][0], "К0709-23/1");
        assert!(!update["payload"]["id"].as_str().unwrap().is_empty());
    }
}
