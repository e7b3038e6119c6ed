use lazy_static::lazy_static;
use regex::Regex;

use crate::attendance::repo::AttendanceStatus;
use crate::calendar::client::{GoogleEvent, PROP_NOTE, PROP_STATUS};

/// Attendance data recovered from a calendar event.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub status: Option<AttendanceStatus>,
    pub note: Option<String>,
}

/// Extraction strategies in priority order: the structured metadata field
/// first, then the legacy free-text description. The first strategy that
/// yields anything wins; events created before structured metadata existed
/// only have the text form.
const STRATEGIES: &[fn(&GoogleEvent) -> Option<Annotation>] = &[from_metadata, from_description];

pub fn annotate(event: &GoogleEvent) -> Annotation {
    STRATEGIES
        .iter()
        .find_map(|strategy| strategy(event))
        .unwrap_or_default()
}

fn parse_status(raw: &str) -> Option<AttendanceStatus> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "present" => Some(AttendanceStatus::Present),
        "absent" => Some(AttendanceStatus::Absent),
        _ => None,
    }
}

fn from_metadata(event: &GoogleEvent) -> Option<Annotation> {
    let private = event.extended_properties.as_ref()?.private.as_ref()?;
    let status = private.get(PROP_STATUS).and_then(|s| parse_status(s));
    let note = private.get(PROP_NOTE).cloned();
    if status.is_none() && note.is_none() {
        return None;
    }
    Some(Annotation { status, note })
}

fn from_description(event: &GoogleEvent) -> Option<Annotation> {
    lazy_static! {
        static ref STATUS_RE: Regex =
            Regex::new(r"(?i)attendance status:\s*(present|absent)").unwrap();
        static ref NOTE_RE: Regex = Regex::new(r"(?is)note:\s*(.+)").unwrap();
    }

    let text = event.description.as_deref()?;
    let status = STATUS_RE
        .captures(text)
        .and_then(|caps| parse_status(&caps[1]));
    let note = NOTE_RE
        .captures(text)
        .map(|caps| caps[1].trim().to_string());
    if status.is_none() && note.is_none() {
        return None;
    }
    Some(Annotation { status, note })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::client::EventExtendedProperties;
    use std::collections::HashMap;

    fn event(description: Option<&str>, private: Option<Vec<(&str, &str)>>) -> GoogleEvent {
        GoogleEvent {
            id: "evt".into(),
            summary: Some("Algorithms".into()),
            description: description.map(Into::into),
            start: None,
            end: None,
            recurrence: None,
            extended_properties: private.map(|pairs| EventExtendedProperties {
                private: Some(
                    pairs
                        .into_iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect::<HashMap<_, _>>(),
                ),
            }),
        }
    }

    #[test]
    fn metadata_wins_over_description() {
        let ev = event(
            Some("Attendance Status: ABSENT\nNote: sick"),
            Some(vec![(PROP_STATUS, "present"), (PROP_NOTE, "guest lecture")]),
        );
        let ann = annotate(&ev);
        assert_eq!(ann.status, Some(AttendanceStatus::Present));
        assert_eq!(ann.note.as_deref(), Some("guest lecture"));
    }

    #[test]
    fn falls_back_to_description_parsing() {
        let ev = event(Some("Attendance Status: ABSENT\nNote: sick"), None);
        let ann = annotate(&ev);
        assert_eq!(ann.status, Some(AttendanceStatus::Absent));
        assert_eq!(ann.note.as_deref(), Some("sick"));
    }

    #[test]
    fn description_matching_is_case_insensitive() {
        let ev = event(Some("ATTENDANCE STATUS: present\nNOTE: brought snacks"), None);
        let ann = annotate(&ev);
        assert_eq!(ann.status, Some(AttendanceStatus::Present));
        assert_eq!(ann.note.as_deref(), Some("brought snacks"));
    }

    #[test]
    fn note_captures_to_end_of_string() {
        let ev = event(Some("Note: two\nlines"), None);
        let ann = annotate(&ev);
        assert_eq!(ann.status, None);
        assert_eq!(ann.note.as_deref(), Some("two\nlines"));
    }

    #[test]
    fn unknown_status_resolves_to_null() {
        let ev = event(Some("Attendance Status: MAYBE"), None);
        let ann = annotate(&ev);
        assert_eq!(ann.status, None);
    }

    #[test]
    fn plain_event_yields_nothing() {
        let ev = event(Some("Class for Attendly attendance tracking."), None);
        assert_eq!(annotate(&ev), Annotation::default());
        let ev = event(None, None);
        assert_eq!(annotate(&ev), Annotation::default());
    }

    #[test]
    fn metadata_with_only_a_note_still_wins() {
        let ev = event(
            Some("Attendance Status: ABSENT"),
            Some(vec![(PROP_NOTE, "left early")]),
        );
        let ann = annotate(&ev);
        // the chain returns the first strategy that yields data, whole
        assert_eq!(ann.status, None);
        assert_eq!(ann.note.as_deref(), Some("left early"));
    }
}
