// src/services/testing.rs

//! Shared test doubles and wire fixtures for the service layer.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, SET_COOKIE};

use crate::error::{AppError, Result};
use crate::services::transport::{HttpExecutor, HttpResponse, RequestSpec};

/// One recorded executor call.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub url: String,
    pub method: String,
    pub body: Option<String>,
    pub timeout: Duration,
    pub attempt: u32,
}

/// Executor that replays a scripted sequence of results and records every
/// attempt it sees. Running past the script is a hard failure.
pub struct ScriptedExecutor {
    script: Mutex<VecDeque<Result<HttpResponse>>>,
    log: Arc<Mutex<Vec<AttemptRecord>>>,
}

impl ScriptedExecutor {
    pub fn new(script: Vec<Result<HttpResponse>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle to the attempt log, usable after the executor is boxed.
    pub fn log(&self) -> Arc<Mutex<Vec<AttemptRecord>>> {
        Arc::clone(&self.log)
    }
}

#[async_trait]
impl HttpExecutor for ScriptedExecutor {
    async fn send(
        &self,
        spec: &RequestSpec,
        timeout: Duration,
        attempt: u32,
    ) -> Result<HttpResponse> {
        self.log.lock().unwrap().push(AttemptRecord {
            url: spec.url.clone(),
            method: spec.method.to_string(),
            body: spec.body.clone(),
            timeout,
            attempt,
        });
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::network("scripted executor ran out of responses")))
    }
}

/// 200 response with a body and no headers.
pub fn body_response(body: impl Into<String>) -> HttpResponse {
    HttpResponse {
        status: reqwest::StatusCode::OK,
        headers: HeaderMap::new(),
        body: body.into(),
    }
}

/// Bootstrap page response carrying both cookies and a valid body.
pub fn bootstrap_response() -> HttpResponse {
    let mut headers = HeaderMap::new();
    headers.append(
        SET_COOKIE,
        HeaderValue::from_static("XSRF-TOKEN=xsrf-value; path=/; secure"),
    );
    headers.append(
        SET_COOKIE,
        HeaderValue::from_static(
            "raspisanie_universitet_sirius_session=session-value; path=/; httponly",
        ),
    );
    HttpResponse {
        status: reqwest::StatusCode::OK,
        headers,
        body: bootstrap_html(),
    }
}

/// Minimal page body with the CSRF literal and the initial-data attribute.
pub fn bootstrap_html() -> String {
    bootstrap_html_with_memo(r#"{&quot;data&quot;:{},&quot;checksum&quot;:&quot;c0&quot;}"#)
}

/// Page body with a caller-supplied (entity-escaped) serverMemo JSON.
pub fn bootstrap_html_with_memo(escaped_memo: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><script>window.livewire_token = 'CsrfToken123';</script></head>
<body>
<div wire:id="abc" wire:initial-data="{{&quot;fingerprint&quot;:{{&quot;id&quot;:&quot;abc&quot;,&quot;name&quot;:&quot;main-grid&quot;}},&quot;serverMemo&quot;:{escaped_memo}}}"></div>
</body>
</html>"#
    )
}

/// Update-endpoint JSON for a response that changes `data` keys.
pub fn update_json(data: serde_json::Value, checksum: &str) -> String {
    serde_json::json!({
        "serverMemo": {
            "data": data,
            "checksum": checksum,
            "htmlHash": format!("hash-{checksum}"),
        },
        "effects": {"dirty": []},
    })
    .to_string()
}

/// Raw event dictionary in the origin's wire shape.
pub fn wire_event(date: &str, start: &str, discipline: &str) -> serde_json::Value {
    serde_json::json!({
        "date": date,
        "startTime": start,
        "endTime": "10:30",
        "discipline": discipline,
        "classroom": "А_305",
        "groupType": "Лекционные занятия",
        "color": "sky",
    })
}
