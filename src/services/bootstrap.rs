// src/services/bootstrap.rs

//! Session bootstrap: initial page load and artifact extraction.
//!
//! The origin serves a different payload to non-browser clients, so the
//! page is requested with a realistic browser header set. Four artifacts
//! must come out of that single response: the XSRF cookie, the session
//! cookie, the CSRF token embedded in the page body, and the initial
//! fingerprint + serverMemo blob. The page shape is assumed stable; a
//! missing artifact is a hard protocol error, never silently tolerated.

use std::sync::OnceLock;

use regex::Regex;
use reqwest::header::{HeaderMap, SET_COOKIE};
use scraper::{Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{InitialData, PageTarget, SESSION_COOKIE_NAME, Session};
use crate::services::transport::{RequestSpec, Transport};

/// Attribute carrying the HTML-entity-escaped initial JSON payload.
const INITIAL_DATA_ATTR: &str = "wire:initial-data";

/// Performs the initial page load and produces a fresh [`Session`].
pub struct SessionBootstrapper<'a> {
    transport: &'a Transport,
}

impl<'a> SessionBootstrapper<'a> {
    pub fn new(transport: &'a Transport) -> Self {
        Self { transport }
    }

    /// Load the bootstrap page and extract all session artifacts.
    pub async fn bootstrap(&self, target: &PageTarget) -> Result<Session> {
        let spec = browser_headers(RequestSpec::get(&target.page_url), &target.page_url);
        let response = self.transport.execute(&spec).await?;

        let xsrf_token = cookie_value(&response.headers, "XSRF-TOKEN")?;
        let session_cookie = cookie_value(&response.headers, SESSION_COOKIE_NAME)?;
        let csrf_token = csrf_token(&response.body)?;
        let initial = initial_data(&response.body)?;

        Ok(Session {
            page_url: target.page_url.clone(),
            endpoint_url: target.endpoint_url.clone(),
            origin: origin_of(&target.page_url),
            xsrf_token,
            session_cookie,
            csrf_token,
            fingerprint: initial.fingerprint,
            memo: initial.server_memo,
        })
    }
}

/// Attach the fixed browser header set every request carries.
pub fn browser_headers(spec: RequestSpec, referer: &str) -> RequestSpec {
    spec.header("Accept", "*/*")
        .header("Accept-Language", "ru,en;q=0.9")
        .header("Connection", "keep-alive")
        .header("Referer", referer)
}

/// Scheme + host of a page URL, used for the Origin header.
fn origin_of(page_url: &str) -> String {
    Url::parse(page_url)
        .map(|u| u.origin().ascii_serialization())
        .unwrap_or_else(|_| page_url.to_string())
}

/// Extract a cookie value from `Set-Cookie` headers.
///
/// Tolerant of both multiple headers and a single folded header: all
/// values are joined before matching.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Result<String> {
    let joined = headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join("\n");

    let pattern = Regex::new(&format!(r"{}=([^;\s]+)", regex::escape(name)))
        .expect("cookie pattern is valid");
    pattern
        .captures(&joined)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| AppError::protocol(format!("missing token: {name} not in Set-Cookie")))
}

/// Extract the CSRF "wire" token assigned as a string literal in the body.
pub fn csrf_token(body: &str) -> Result<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r#"window\.livewire_token\s*=\s*['"]([0-9A-Za-z]+)['"]"#)
            .expect("csrf pattern is valid")
    });
    pattern
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| AppError::protocol("missing token: csrf literal not in page body"))
}

/// Extract the initial fingerprint + serverMemo blob.
///
/// The blob sits in an HTML attribute as entity-escaped JSON; the HTML
/// parser decodes the entities, leaving plain JSON to parse.
pub fn initial_data(body: &str) -> Result<InitialData> {
    let document = Html::parse_document(body);
    let any = Selector::parse("*").expect("universal selector is valid");

    let raw = document
        .select(&any)
        .find_map(|element| element.value().attr(INITIAL_DATA_ATTR))
        .ok_or_else(|| AppError::protocol("missing token: initial data attribute not found"))?;

    serde_json::from_str(raw)
        .map_err(|e| AppError::protocol(format!("initial data is not valid JSON: {e}")))
}
