// src/services/transport.rs

//! HTTP transport with retry, timeout escalation, and a degraded-TLS
//! fallback path.
//!
//! The origin is sometimes reachable only through a relaxed path: its
//! certificate chain can carry a self-signed intermediate and some IPv6
//! routes to it are black-holed. The first attempt therefore goes out on
//! a strict client and later attempts switch to a relaxed-verification,
//! IPv4-forced client.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::HeaderMap;

use crate::config::FetchConfig;
use crate::error::{AppError, Result};

/// Explicit transport settings, passed into the constructor rather than
/// read ambiently so the layers above stay testable with a fake executor.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Maximum attempts per request
    pub attempts: u32,

    /// Timeout of the first attempt; each following attempt gets 1.5x
    pub base_timeout: Duration,

    /// Skip the strict client entirely
    pub insecure_tls: bool,

    /// Outbound proxy URL
    pub proxy: Option<String>,

    /// Log per-attempt diagnostics
    pub debug: bool,

    /// User-Agent for both clients
    pub user_agent: String,
}

impl From<&FetchConfig> for TransportConfig {
    fn from(fetch: &FetchConfig) -> Self {
        Self {
            attempts: fetch.retry_attempts,
            base_timeout: fetch.base_timeout,
            insecure_tls: fetch.insecure_tls,
            proxy: fetch.proxy.clone(),
            debug: fetch.debug_fetch,
            user_agent: fetch.user_agent.clone(),
        }
    }
}

/// A single request to execute.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// JSON body for POST requests
    pub body: Option<String>,
}

impl RequestSpec {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: String) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            headers: Vec::new(),
            body: Some(body),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// What the layers above need back: status, headers (Set-Cookie), body.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: reqwest::StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

/// Seam between the retry loop and the actual HTTP stack.
#[async_trait]
pub trait HttpExecutor: Send + Sync {
    /// Perform one attempt. `attempt` is 1-based.
    async fn send(
        &self,
        spec: &RequestSpec,
        timeout: Duration,
        attempt: u32,
    ) -> Result<HttpResponse>;
}

/// Real executor: a strict primary client and a relaxed fallback client.
pub struct ReqwestExecutor {
    primary: reqwest::Client,
    fallback: reqwest::Client,
    insecure_tls: bool,
}

impl ReqwestExecutor {
    pub fn new(config: &TransportConfig) -> Result<Self> {
        Ok(Self {
            primary: build_client(config, false)?,
            fallback: build_client(config, true)?,
            insecure_tls: config.insecure_tls,
        })
    }

    fn client_for(&self, attempt: u32) -> &reqwest::Client {
        if attempt == 1 && !self.insecure_tls {
            &self.primary
        } else {
            &self.fallback
        }
    }
}

/// Build one of the two clients. Without a proxy, resolution is forced
/// onto IPv4 and the keep-alive pool is bounded; the origin rate-limits
/// or drops some IPv6 paths.
fn build_client(config: &TransportConfig, relaxed: bool) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(10))
        .redirect(reqwest::redirect::Policy::limited(10));

    match &config.proxy {
        Some(proxy) => {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        None => {
            builder = builder.local_address(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        }
    }

    if relaxed {
        builder = builder.danger_accept_invalid_certs(true);
    }

    Ok(builder.build()?)
}

#[async_trait]
impl HttpExecutor for ReqwestExecutor {
    async fn send(
        &self,
        spec: &RequestSpec,
        timeout: Duration,
        attempt: u32,
    ) -> Result<HttpResponse> {
        let mut request = self
            .client_for(attempt)
            .request(spec.method.clone(), &spec.url)
            .timeout(timeout);

        for (name, value) in &spec.headers {
            request = request.header(name, value);
        }
        if let Some(body) = &spec.body {
            request = request.body(body.clone());
        }

        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();

        if !status.is_success() {
            return Err(AppError::network(format!("HTTP {status} from {}", spec.url)));
        }

        let body = response.text().await?;
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Request executor with retry and timeout escalation.
pub struct Transport {
    executor: Box<dyn HttpExecutor>,
    config: TransportConfig,
}

impl Transport {
    /// Build a transport backed by real HTTP clients.
    pub fn new(config: TransportConfig) -> Result<Self> {
        let executor = ReqwestExecutor::new(&config)?;
        Ok(Self {
            executor: Box::new(executor),
            config,
        })
    }

    /// Build a transport over a custom executor (tests).
    pub fn with_executor(config: TransportConfig, executor: Box<dyn HttpExecutor>) -> Self {
        Self { executor, config }
    }

    /// Execute a request with up to `attempts` tries.
    ///
    /// The timeout escalates 1.5x per attempt to tolerate a slow but
    /// alive origin; between attempts sleeps `attempt * 500ms`. A non-2xx
    /// response counts as a failed attempt. After the last attempt the
    /// last error is surfaced unchanged.
    pub async fn execute(&self, spec: &RequestSpec) -> Result<HttpResponse> {
        let attempts = self.config.attempts.max(1);
        let mut timeout = self.config.base_timeout;
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.executor.send(spec, timeout, attempt).await {
                Ok(response) => return Ok(response),
                Err(error) => {
                    if self.config.debug {
                        log::warn!(
                            "fetch attempt {attempt}/{attempts} failed for {} (timeout {:?}): {error}",
                            spec.url,
                            timeout
                        );
                    }
                    last_error = Some(error);
                }
            }

            if attempt < attempts {
                tokio::time::sleep(Duration::from_millis(500 * attempt as u64)).await;
                timeout = timeout.mul_f64(1.5);
            }
        }

        Err(last_error.unwrap_or_else(|| AppError::network("no attempts configured")))
    }
}
