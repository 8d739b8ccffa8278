// src/utils/ics.rs

//! iCalendar rendering for cached schedules.
//!
//! Produces one VCALENDAR covering both cached weeks of an entity.
//! Teacher calendars merge entries that describe the same lesson held
//! for several groups at once, so the calendar shows one event listing
//! all groups instead of near-duplicates.

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};

use crate::models::Event;

const DATE_FORMAT: &str = "%d.%m.%Y";
const TIME_FORMAT: &str = "%H:%M";

/// Calendar flavor: decides whether descriptions list teachers or groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarKind {
    Group,
    Teacher,
}

/// An event plus the groups merged into it (teacher calendars only).
#[derive(Debug, Clone)]
struct MergedEvent {
    event: Event,
    groups: Vec<String>,
}

/// Render a full calendar for one entity.
pub fn render_calendar(events: &[Event], name: &str, kind: CalendarKind) -> String {
    let merged = match kind {
        CalendarKind::Teacher => merge_by_time(events),
        CalendarKind::Group => events
            .iter()
            .map(|event| MergedEvent {
                event: event.clone(),
                groups: event.group.iter().cloned().collect(),
            })
            .collect(),
    };

    let body: Vec<String> = merged
        .iter()
        .filter_map(|m| render_event(m, kind))
        .collect();

    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        "PRODID:-//Schedule Calendar//RU".to_string(),
        "CALSCALE:GREGORIAN".to_string(),
        "METHOD:PUBLISH".to_string(),
        format!("X-WR-CALNAME:{name}"),
        "X-WR-TIMEZONE:Europe/Moscow".to_string(),
    ];
    lines.extend(body);
    lines.push("END:VCALENDAR".to_string());
    lines.join("\r\n")
}

/// Collapse simultaneous identical lessons into one entry accumulating
/// the group names.
fn merge_by_time(events: &[Event]) -> Vec<MergedEvent> {
    let mut merged: Vec<MergedEvent> = Vec::new();

    for event in events {
        let existing = merged.iter_mut().find(|m| {
            m.event.date == event.date
                && m.event.start_time == event.start_time
                && m.event.end_time == event.end_time
                && m.event.discipline == event.discipline
                && m.event.classroom == event.classroom
        });

        match existing {
            Some(entry) => {
                if let Some(group) = &event.group {
                    if !entry.groups.contains(group) {
                        entry.groups.push(group.clone());
                    }
                }
            }
            None => merged.push(MergedEvent {
                event: event.clone(),
                groups: event.group.iter().cloned().collect(),
            }),
        }
    }

    merged
}

/// Render one VEVENT. Entries whose date or times no longer parse are
/// dropped rather than producing a broken calendar.
fn render_event(merged: &MergedEvent, kind: CalendarKind) -> Option<String> {
    let event = &merged.event;
    let date = NaiveDate::parse_from_str(&event.date, DATE_FORMAT).ok()?;
    let start = NaiveTime::parse_from_str(&event.start_time, TIME_FORMAT).ok()?;
    let end = NaiveTime::parse_from_str(&event.end_time, TIME_FORMAT).ok()?;

    let summary = escape_text(non_empty(&event.discipline).unwrap_or("Занятие"));
    let location = escape_text(&event.classroom.replace('_', " "));

    let mut description_parts: Vec<String> = Vec::new();
    match kind {
        CalendarKind::Teacher => {
            if !merged.groups.is_empty() {
                description_parts.push(merged.groups.join(", "));
            }
        }
        CalendarKind::Group => {
            let teachers: Vec<&str> = event.teachers.values().map(|t| t.fio.as_str()).collect();
            if !teachers.is_empty() {
                description_parts.push(teachers.join(", "));
            }
        }
    }
    if let Some(comment) = &event.comment {
        description_parts.push(format!("Комментарий: {comment}"));
    }
    let description = escape_text(&description_parts.join("\n"));

    let uid = format!(
        "{}-{}-{}-{}@schedule",
        event.date,
        event.start_time,
        non_empty(&event.classroom).unwrap_or("none"),
        event.group.as_deref().unwrap_or("schedule"),
    );

    let mut lines = vec![
        "BEGIN:VEVENT".to_string(),
        format!("UID:{uid}"),
        format!("DTSTAMP:{}", format_timestamp(Local::now().naive_local())),
        format!("DTSTART:{}", format_timestamp(date.and_time(start))),
        format!("DTEND:{}", format_timestamp(date.and_time(end))),
        format!("SUMMARY:{summary}"),
    ];
    if !location.is_empty() {
        lines.push(format!("LOCATION:{location}"));
    }
    if !description.is_empty() {
        lines.push(format!("DESCRIPTION:{description}"));
    }
    lines.push("STATUS:CONFIRMED".to_string());
    lines.push("END:VEVENT".to_string());
    Some(lines.join("\r\n"))
}

/// `YYYYMMDDTHHMMSS` local timestamp.
fn format_timestamp(when: NaiveDateTime) -> String {
    when.format("%Y%m%dT%H%M%S").to_string()
}

/// Escape text per RFC 5545: backslash, semicolon, comma, newline.
fn escape_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace('\n', "\\n")
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() { None } else { Some(s) }
}
