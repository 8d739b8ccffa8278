// src/services/protocol.rs

//! Stateful client for the remote reactive grid component.
//!
//! One client owns one [`Session`] and is never shared across callers:
//! week navigation mutates server-side state keyed by the fingerprint, so
//! interleaving two callers on one session would corrupt both.

use serde_json::{Value, json};

use crate::error::{AppError, Result};
use crate::models::{Event, PageTarget, RemoteCall, SESSION_COOKIE_NAME, Session, UpdateResponse};
use crate::services::bootstrap::{SessionBootstrapper, browser_headers};
use crate::services::extract;
use crate::services::transport::{RequestSpec, Transport};

/// Viewport the synthetic resize call reports. The component's initial
/// render assumes a viewport and returns degenerate layout data without
/// one.
const VIEWPORT: (u32, u32) = (1920, 1080);

/// Client for one bootstrapped session against one grid component.
pub struct ProtocolClient<'a> {
    transport: &'a Transport,
    session: Session,
}

impl<'a> ProtocolClient<'a> {
    /// Bootstrap a session and bring it into a usable state.
    ///
    /// Issues the synthetic viewport resize right away, so no caller ever
    /// observes an un-sized session.
    pub async fn connect(transport: &'a Transport, target: &PageTarget) -> Result<Self> {
        let session = SessionBootstrapper::new(transport).bootstrap(target).await?;
        let mut client = Self { transport, session };
        client.emulate_resize(VIEWPORT.0, VIEWPORT.1).await?;
        Ok(client)
    }

    /// The session state as of the last successful call.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Send a batch of remote method calls and commit the response.
    ///
    /// On success the returned serverMemo is merged into the session
    /// (last write wins per top-level key, checksum/htmlHash overwritten).
    /// On any failure the session is left exactly as it was: callers must
    /// not assume partial progress.
    pub async fn invoke(&mut self, calls: &[RemoteCall]) -> Result<()> {
        let body = json!({
            "fingerprint": &self.session.fingerprint,
            "serverMemo": &self.session.memo,
            "updates": calls.iter().map(RemoteCall::to_update).collect::<Vec<_>>(),
        });

        let spec = browser_headers(
            RequestSpec::post(&self.session.endpoint_url, body.to_string()),
            &self.session.page_url,
        )
        .header("Origin", self.session.origin.clone())
        .header(
            "Cookie",
            format!(
                "XSRF-TOKEN={};{}={}",
                self.session.xsrf_token, SESSION_COOKIE_NAME, self.session.session_cookie
            ),
        )
        .header("X-Livewire", "true")
        .header("X-Csrf-Token", self.session.csrf_token.clone())
        .header("Content-Type", "application/json");

        let response = self.transport.execute(&spec).await?;

        let update: UpdateResponse = serde_json::from_str(&response.body)
            .map_err(|e| AppError::protocol(format!("update response is not valid JSON: {e}")))?;

        self.session.memo.merge_update(update.server_memo);
        Ok(())
    }

    /// Navigate the component by a relative number of weeks.
    ///
    /// `step == 0` is a pure no-op. Otherwise the single-step method is
    /// invoked `|step|` times sequentially; each call depends on the memo
    /// produced by the previous one. Navigation is not atomic across
    /// steps: a failure midway keeps the weeks already applied.
    pub async fn change_week(&mut self, step: i64) -> Result<()> {
        if step == 0 {
            return Ok(());
        }

        let method = if step > 0 { "addWeek" } else { "minusWeek" };
        for _ in 0..step.unsigned_abs() {
            self.invoke(&[RemoteCall::new(method, Vec::new())]).await?;
        }
        Ok(())
    }

    /// Switch the component to the given entity and extract its events
    /// for the currently selected week.
    pub async fn fetch_entity_schedule(&mut self, entity: &str) -> Result<Vec<Event>> {
        self.invoke(&[RemoteCall::new("set", vec![Value::String(entity.to_string())])])
            .await?;
        Ok(extract::events(&self.session.memo))
    }

    /// Report a client viewport to the component.
    async fn emulate_resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.invoke(&[
            RemoteCall::new("render", Vec::new()),
            RemoteCall::new("$set", vec![json!("width"), json!(width)]),
            RemoteCall::new("$set", vec![json!("height"), json!(height)]),
        ])
        .await
    }
}
