// src/config.rs

//! Application configuration.
//!
//! Every setting comes from the environment and is read exactly once at
//! startup via [`Config::from_env`]. Missing variables fall back to the
//! defaults collected in the `defaults` module.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP transport behavior
    pub fetch: FetchConfig,

    /// Cache and refresh-loop behavior
    pub cache: CacheConfig,

    /// Remote origin URLs
    pub origin: OriginConfig,

    /// Entity roster file locations
    pub roster: RosterConfig,
}

/// HTTP transport settings.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Maximum request attempts before surfacing the last error
    pub retry_attempts: u32,

    /// Timeout for the first attempt; later attempts escalate from this
    pub base_timeout: Duration,

    /// Use the relaxed-verification client for every attempt
    pub insecure_tls: bool,

    /// Log per-attempt fetch diagnostics
    pub debug_fetch: bool,

    /// Outbound proxy URL, if any
    pub proxy: Option<String>,

    /// User-Agent presented to the origin
    pub user_agent: String,
}

/// Cache store and refresh scheduler settings.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Root directory for on-disk snapshots
    pub dir: PathBuf,

    /// Base interval between refresh runs
    pub update_interval: Duration,

    /// Extra cool-down added after a failed refresh run
    pub failure_backoff: Duration,

    /// Delay between per-entity fetches inside a batch
    pub batch_delay: Duration,
}

/// Remote origin URLs for both entity classes.
#[derive(Debug, Clone)]
pub struct OriginConfig {
    /// Page that bootstraps a group session
    pub group_page: String,

    /// Livewire message endpoint of the group grid component
    pub group_endpoint: String,

    /// Page that bootstraps a teacher session
    pub teacher_page: String,

    /// Livewire message endpoint of the teacher grid component
    pub teacher_endpoint: String,
}

/// Locations of the entity roster files.
#[derive(Debug, Clone)]
pub struct RosterConfig {
    pub groups_file: PathBuf,
    pub teachers_file: PathBuf,
}

impl Config {
    /// Read the configuration from the environment.
    pub fn from_env() -> Self {
        Self {
            fetch: FetchConfig {
                retry_attempts: env_u64("FETCH_RETRY_ATTEMPTS", defaults::RETRY_ATTEMPTS) as u32,
                base_timeout: Duration::from_millis(env_u64(
                    "FETCH_TIMEOUT_MS",
                    defaults::TIMEOUT_MS,
                )),
                insecure_tls: env_flag("FETCH_INSECURE_TLS"),
                debug_fetch: env_flag("DEBUG_FETCH"),
                proxy: env_proxy(),
                user_agent: defaults::USER_AGENT.to_string(),
            },
            cache: CacheConfig {
                dir: PathBuf::from(env_str("CACHE_DIR", defaults::CACHE_DIR)),
                update_interval: Duration::from_millis(env_u64(
                    "CACHE_UPDATE_INTERVAL_MS",
                    defaults::UPDATE_INTERVAL_MS,
                )),
                failure_backoff: Duration::from_millis(env_u64(
                    "CACHE_FAILURE_BACKOFF_MS",
                    defaults::FAILURE_BACKOFF_MS,
                )),
                batch_delay: Duration::from_millis(env_u64(
                    "BATCH_DELAY_MS",
                    defaults::BATCH_DELAY_MS,
                )),
            },
            origin: OriginConfig {
                group_page: env_str("SCHEDULE_GROUP_PAGE", defaults::GROUP_PAGE),
                group_endpoint: env_str("SCHEDULE_GROUP_ENDPOINT", defaults::GROUP_ENDPOINT),
                teacher_page: env_str("SCHEDULE_TEACHER_PAGE", defaults::TEACHER_PAGE),
                teacher_endpoint: env_str("SCHEDULE_TEACHER_ENDPOINT", defaults::TEACHER_ENDPOINT),
            },
            roster: RosterConfig {
                groups_file: PathBuf::from(env_str("GROUPS_FILE", defaults::GROUPS_FILE)),
                teachers_file: PathBuf::from(env_str("TEACHERS_FILE", defaults::TEACHERS_FILE)),
            },
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.fetch.retry_attempts == 0 {
            return Err(AppError::config("FETCH_RETRY_ATTEMPTS must be > 0"));
        }
        if self.fetch.base_timeout.is_zero() {
            return Err(AppError::config("FETCH_TIMEOUT_MS must be > 0"));
        }
        if self.cache.update_interval.is_zero() {
            return Err(AppError::config("CACHE_UPDATE_INTERVAL_MS must be > 0"));
        }
        for (name, value) in [
            ("SCHEDULE_GROUP_PAGE", &self.origin.group_page),
            ("SCHEDULE_GROUP_ENDPOINT", &self.origin.group_endpoint),
            ("SCHEDULE_TEACHER_PAGE", &self.origin.teacher_page),
            ("SCHEDULE_TEACHER_ENDPOINT", &self.origin.teacher_endpoint),
        ] {
            url::Url::parse(value)
                .map_err(|e| AppError::config(format!("{name} is not a valid URL: {e}")))?;
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetch: FetchConfig {
                retry_attempts: defaults::RETRY_ATTEMPTS as u32,
                base_timeout: Duration::from_millis(defaults::TIMEOUT_MS),
                insecure_tls: false,
                debug_fetch: false,
                proxy: None,
                user_agent: defaults::USER_AGENT.to_string(),
            },
            cache: CacheConfig {
                dir: PathBuf::from(defaults::CACHE_DIR),
                update_interval: Duration::from_millis(defaults::UPDATE_INTERVAL_MS),
                failure_backoff: Duration::from_millis(defaults::FAILURE_BACKOFF_MS),
                batch_delay: Duration::from_millis(defaults::BATCH_DELAY_MS),
            },
            origin: OriginConfig {
                group_page: defaults::GROUP_PAGE.to_string(),
                group_endpoint: defaults::GROUP_ENDPOINT.to_string(),
                teacher_page: defaults::TEACHER_PAGE.to_string(),
                teacher_endpoint: defaults::TEACHER_ENDPOINT.to_string(),
            },
            roster: RosterConfig {
                groups_file: PathBuf::from(defaults::GROUPS_FILE),
                teachers_file: PathBuf::from(defaults::TEACHERS_FILE),
            },
        }
    }
}

fn env_str(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_flag(name: &str) -> bool {
    matches!(
        env::var(name).unwrap_or_default().to_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

/// Outbound proxy URL, honoring the usual variants in priority order.
fn env_proxy() -> Option<String> {
    ["HTTPS_PROXY", "HTTP_PROXY", "https_proxy", "http_proxy"]
        .iter()
        .find_map(|name| env::var(name).ok())
        .filter(|v| !v.trim().is_empty())
}

mod defaults {
    pub const RETRY_ATTEMPTS: u64 = 3;
    pub const TIMEOUT_MS: u64 = 45_000;

    pub const CACHE_DIR: &str = "cache";
    pub const UPDATE_INTERVAL_MS: u64 = 20 * 60 * 1000;
    pub const FAILURE_BACKOFF_MS: u64 = 40 * 60 * 1000;
    pub const BATCH_DELAY_MS: u64 = 120_000;

    pub const GROUP_PAGE: &str = "https://schedule.siriusuniversity.ru";
    pub const GROUP_ENDPOINT: &str =
        "https://schedule.siriusuniversity.ru/livewire/message/schedule.main-grid";
    pub const TEACHER_PAGE: &str = "https://schedule.siriusuniversity.ru/teacher";
    pub const TEACHER_ENDPOINT: &str =
        "https://schedule.siriusuniversity.ru/livewire/message/teachers.teacher-main-grid";

    pub const GROUPS_FILE: &str = "static/groups.json";
    pub const TEACHERS_FILE: &str = "static/teachers.json";

    pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
        AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";
}
