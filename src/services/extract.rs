// src/services/extract.rs

//! Event extraction from a serverMemo snapshot.

use serde_json::Value;

use crate::models::{Event, ServerMemo};

/// Flatten the day-grouped `events` mapping into one event sequence,
/// preserving the origin's ordering.
///
/// An absent mapping is how the component legitimately reports "no
/// classes", so it yields an empty sequence rather than an error.
/// Individual entries that no longer deserialize are skipped with a
/// warning; the rest of the snapshot stays usable.
pub fn events(memo: &ServerMemo) -> Vec<Event> {
    let Some(Value::Object(days)) = memo.data.get("events") else {
        return Vec::new();
    };

    let mut events = Vec::new();
    for (day, entries) in days {
        let Value::Array(entries) = entries else {
            log::warn!("events entry for {day} is not an array, skipping");
            continue;
        };
        for entry in entries {
            match serde_json::from_value::<Event>(entry.clone()) {
                Ok(event) => events.push(event),
                Err(error) => {
                    log::warn!("unreadable event on {day}: {error}");
                }
            }
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::wire_event;
    use serde_json::json;

    fn memo_with_data(data: serde_json::Value) -> ServerMemo {
        serde_json::from_value(json!({ "data": data })).unwrap()
    }

    #[test]
    fn missing_events_mapping_yields_empty() {
        let memo = memo_with_data(json!({"week": 0}));
        assert!(events(&memo).is_empty());
    }

    #[test]
    fn non_object_events_value_yields_empty() {
        let memo = memo_with_data(json!({"events": null}));
        assert!(events(&memo).is_empty());
    }

    #[test]
    fn flattens_day_groups_in_order() {
        let memo = memo_with_data(json!({"events": {
            "02.09.2026": [
                wire_event("02.09.2026", "09:00", "Анализ"),
                wire_event("02.09.2026", "11:00", "Алгебра"),
            ],
            "03.09.2026": [wire_event("03.09.2026", "09:00", "Физика")],
        }}));

        let flat = events(&memo);
        assert_eq!(flat.len(), 3);
        // serverMemo is an ordered document, so day order survives
        assert_eq!(flat[0].discipline, "Анализ");
        assert_eq!(flat[1].discipline, "Алгебра");
        assert_eq!(flat[2].discipline, "Физика");
    }

    #[test]
    fn skips_unreadable_entries() {
        let memo = memo_with_data(json!({"events": {
            "02.09.2026": [
                wire_event("02.09.2026", "09:00", "Анализ"),
                "not an event",
            ],
        }}));

        let flat = events(&memo);
        assert_eq!(flat.len(), 1);
    }
}
