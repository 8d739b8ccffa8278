//! Cached schedule records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Event;

/// The two week slots the cache ever holds. Any other requested week is
/// served live and never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeekSlot {
    /// The origin's current week (offset 0)
    Current,
    /// The week after it (offset 1)
    Next,
}

impl WeekSlot {
    /// Map a relative week offset onto a cache slot, if it has one.
    pub fn from_offset(week: i64) -> Option<Self> {
        match week {
            0 => Some(Self::Current),
            1 => Some(Self::Next),
            _ => None,
        }
    }

    /// The relative offset this slot stands for.
    pub fn offset(self) -> i64 {
        match self {
            Self::Current => 0,
            Self::Next => 1,
        }
    }
}

/// Two weeks of events for one entity.
///
/// Replaced wholesale by the refresh scheduler; the request-layer
/// fallback may fill a single week slot in memory.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheRecord {
    #[serde(default)]
    pub week0: Vec<Event>,

    #[serde(default)]
    pub week1: Vec<Event>,

    /// When this record was produced. Memory-only bookkeeping: skipped on
    /// serialization so the on-disk layout stays `{week0, week1}`.
    #[serde(skip, default = "Utc::now")]
    pub written_at: DateTime<Utc>,
}

impl CacheRecord {
    /// Create a record stamped now.
    pub fn new(week0: Vec<Event>, week1: Vec<Event>) -> Self {
        Self {
            week0,
            week1,
            written_at: Utc::now(),
        }
    }

    /// Events for one slot.
    pub fn week(&self, slot: WeekSlot) -> &Vec<Event> {
        match slot {
            WeekSlot::Current => &self.week0,
            WeekSlot::Next => &self.week1,
        }
    }

    /// Mutable events for one slot.
    pub fn week_mut(&mut self, slot: WeekSlot) -> &mut Vec<Event> {
        match slot {
            WeekSlot::Current => &mut self.week0,
            WeekSlot::Next => &mut self.week1,
        }
    }
}

// Equality ignores the write timestamp: two records with the same events
// are the same cache state.
impl PartialEq for CacheRecord {
    fn eq(&self, other: &Self) -> bool {
        self.week0 == other.week0 && self.week1 == other.week1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_mapping() {
        assert_eq!(WeekSlot::from_offset(0), Some(WeekSlot::Current));
        assert_eq!(WeekSlot::from_offset(1), Some(WeekSlot::Next));
        assert_eq!(WeekSlot::from_offset(2), None);
        assert_eq!(WeekSlot::from_offset(-1), None);
    }

    #[test]
    fn written_at_stays_off_disk() {
        let record = CacheRecord::new(Vec::new(), Vec::new());
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"week0": [], "week1": []})
        );
    }

    #[test]
    fn deserializes_partial_record() {
        let record: CacheRecord =
            serde_json::from_value(serde_json::json!({"week0": []})).unwrap();
        assert!(record.week1.is_empty());
    }
}
