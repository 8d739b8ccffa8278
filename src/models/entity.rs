//! Entity classes (groups, teachers) and roster loading.

use std::path::Path;

use serde_json::Value;

use crate::config::OriginConfig;
use crate::error::{AppError, Result};

/// The two kinds of entity a schedule can be requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityClass {
    Group,
    Teacher,
}

impl EntityClass {
    /// Human/log label, also the per-entity cache subdirectory name.
    pub fn label(self) -> &'static str {
        match self {
            Self::Group => "groups",
            Self::Teacher => "teachers",
        }
    }

    /// Combined snapshot file name under the cache directory.
    pub fn snapshot_file(self) -> &'static str {
        match self {
            Self::Group => "schedule_cache.json",
            Self::Teacher => "teachers_cache.json",
        }
    }

    /// Page and message endpoint this class talks to.
    pub fn target(self, origin: &OriginConfig) -> PageTarget {
        match self {
            Self::Group => PageTarget {
                page_url: origin.group_page.clone(),
                endpoint_url: origin.group_endpoint.clone(),
            },
            Self::Teacher => PageTarget {
                page_url: origin.teacher_page.clone(),
                endpoint_url: origin.teacher_endpoint.clone(),
            },
        }
    }
}

/// Bootstrap page plus Livewire message endpoint for one component.
#[derive(Debug, Clone)]
pub struct PageTarget {
    pub page_url: String,
    pub endpoint_url: String,
}

/// Load an entity roster from a JSON file.
///
/// Accepts either an array of identifiers or an object whose keys are the
/// identifiers (the teachers file maps id to display name).
pub async fn load_roster(path: &Path) -> Result<Vec<String>> {
    let bytes = tokio::fs::read(path).await?;
    let value: Value = serde_json::from_slice(&bytes)?;
    roster_from_value(value)
        .ok_or_else(|| AppError::config(format!("roster file {} is neither a JSON array nor an object", path.display())))
}

fn roster_from_value(value: Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s),
                    other => other.as_i64().map(|n| n.to_string()),
                })
                .collect(),
        ),
        Value::Object(map) => Some(map.into_iter().map(|(k, _)| k).collect()),
        _ => None,
    }
}
