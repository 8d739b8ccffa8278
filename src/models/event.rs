//! Schedule event data structure.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single schedule entry as reported by the origin grid.
///
/// Field names mirror the wire payload (camelCase). Instances are
/// immutable once extracted from a serverMemo snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Calendar date, `day.month.year`
    #[serde(default)]
    pub date: String,

    /// Start of the slot, `HH:MM`
    #[serde(default)]
    pub start_time: String,

    /// End of the slot, `HH:MM`
    #[serde(default)]
    pub end_time: String,

    /// Course title
    #[serde(default)]
    pub discipline: String,

    /// Room identifier (underscores stand in for spaces on the wire)
    #[serde(default)]
    pub classroom: String,

    /// Lesson kind, e.g. "Семинарские занятия"
    #[serde(default)]
    pub group_type: String,

    /// Color tag the origin uses for rendering
    #[serde(default)]
    pub color: String,

    /// Group the entry belongs to (present in teacher schedules)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    /// Teachers keyed by origin-side id
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub teachers: BTreeMap<String, TeacherRef>,

    /// Free-form note attached to the entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Teacher reference embedded in an event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeacherRef {
    /// Full name
    pub fio: String,
}
