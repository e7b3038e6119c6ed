use std::collections::HashMap;

use anyhow::Context;
use axum::async_trait;
use serde::{Deserialize, Serialize};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::debug;

const CALENDAR_EVENTS_URL: &str =
    "https://www.googleapis.com/calendar/v3/calendars/primary/events";

/// Metadata keys carried in an event's private extended properties.
pub const PROP_STATUS: &str = "attendanceStatus";
pub const PROP_NOTE: &str = "attendanceNote";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventExtendedProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderOverride {
    pub method: String,
    pub minutes: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventReminders {
    pub use_default: bool,
    pub overrides: Vec<ReminderOverride>,
}

/// Body for inserting a recurring event into the primary calendar.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub summary: String,
    pub description: String,
    pub start: EventDateTime,
    pub end: EventDateTime,
    pub recurrence: Vec<String>,
    pub reminders: EventReminders,
    pub extended_properties: EventExtendedProperties,
}

/// Partial update applied to an existing event instance.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extended_properties: Option<EventExtendedProperties>,
}

/// Event as returned by the provider (recurrences already expanded to
/// instances when listed with `singleEvents=true`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleEvent {
    pub id: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start: Option<EventDateTime>,
    #[serde(default)]
    pub end: Option<EventDateTime>,
    #[serde(default)]
    pub recurrence: Option<Vec<String>>,
    #[serde(default)]
    pub extended_properties: Option<EventExtendedProperties>,
}

#[derive(Debug, Deserialize)]
struct EventListPage {
    #[serde(default)]
    items: Vec<GoogleEvent>,
}

/// Seam to the external calendar provider; swapped for a fake in unit tests.
#[async_trait]
pub trait CalendarApi: Send + Sync {
    async fn insert_event(
        &self,
        access_token: &str,
        event: &EventPayload,
    ) -> anyhow::Result<GoogleEvent>;

    /// List concrete event instances in [time_min, time_max], optionally
    /// filtered by a free-text query.
    async fn list_events(
        &self,
        access_token: &str,
        query: Option<&str>,
        time_min: OffsetDateTime,
        time_max: OffsetDateTime,
    ) -> anyhow::Result<Vec<GoogleEvent>>;

    async fn patch_event(
        &self,
        access_token: &str,
        event_id: &str,
        patch: &EventPatch,
    ) -> anyhow::Result<()>;
}

/// Google Calendar v3 REST client over the user's primary calendar.
pub struct GoogleCalendarClient {
    http: reqwest::Client,
}

impl GoogleCalendarClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    async fn check(resp: reqwest::Response, what: &str) -> anyhow::Result<reqwest::Response> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("google calendar {what} returned {status}: {body}");
        }
        Ok(resp)
    }
}

impl Default for GoogleCalendarClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CalendarApi for GoogleCalendarClient {
    async fn insert_event(
        &self,
        access_token: &str,
        event: &EventPayload,
    ) -> anyhow::Result<GoogleEvent> {
        let resp = self
            .http
            .post(CALENDAR_EVENTS_URL)
            .bearer_auth(access_token)
            .json(event)
            .send()
            .await
            .context("event insert request")?;
        let resp = Self::check(resp, "insert").await?;
        let created = resp.json::<GoogleEvent>().await.context("insert body")?;
        debug!(event_id = %created.id, "calendar event created");
        Ok(created)
    }

    async fn list_events(
        &self,
        access_token: &str,
        query: Option<&str>,
        time_min: OffsetDateTime,
        time_max: OffsetDateTime,
    ) -> anyhow::Result<Vec<GoogleEvent>> {
        let mut params = vec![
            ("timeMin".to_string(), time_min.format(&Rfc3339)?),
            ("timeMax".to_string(), time_max.format(&Rfc3339)?),
            ("singleEvents".to_string(), "true".to_string()),
            ("orderBy".to_string(), "startTime".to_string()),
            ("maxResults".to_string(), "250".to_string()),
        ];
        if let Some(q) = query {
            params.push(("q".to_string(), q.to_string()));
        }

        let resp = self
            .http
            .get(CALENDAR_EVENTS_URL)
            .bearer_auth(access_token)
            .query(&params)
            .send()
            .await
            .context("event list request")?;
        let resp = Self::check(resp, "list").await?;
        let page = resp.json::<EventListPage>().await.context("list body")?;
        debug!(count = page.items.len(), "calendar events listed");
        Ok(page.items)
    }

    async fn patch_event(
        &self,
        access_token: &str,
        event_id: &str,
        patch: &EventPatch,
    ) -> anyhow::Result<()> {
        let url = format!("{CALENDAR_EVENTS_URL}/{event_id}");
        let resp = self
            .http
            .patch(&url)
            .bearer_auth(access_token)
            .json(patch)
            .send()
            .await
            .context("event patch request")?;
        Self::check(resp, "patch").await?;
        debug!(%event_id, "calendar event patched");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_serializes_the_provider_field_names() {
        let payload = EventPayload {
            summary: "Algorithms".into(),
            description: "Class for Attendly attendance tracking.".into(),
            start: EventDateTime {
                date_time: Some("2025-03-10T10:00:00Z".into()),
                time_zone: Some("UTC".into()),
                date: None,
            },
            end: EventDateTime {
                date_time: Some("2025-03-10T11:00:00Z".into()),
                time_zone: Some("UTC".into()),
                date: None,
            },
            recurrence: vec!["RRULE:FREQ=WEEKLY;BYDAY=MO,WE".into()],
            reminders: EventReminders {
                use_default: false,
                overrides: vec![ReminderOverride {
                    method: "popup".into(),
                    minutes: 30,
                }],
            },
            extended_properties: EventExtendedProperties {
                private: Some(HashMap::from([(
                    PROP_STATUS.to_string(),
                    "present".to_string(),
                )])),
            },
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["start"]["dateTime"], "2025-03-10T10:00:00Z");
        assert_eq!(json["reminders"]["useDefault"], false);
        assert_eq!(
            json["extendedProperties"]["private"]["attendanceStatus"],
            "present"
        );
        // date-only variant is omitted entirely
        assert!(json["start"].get("date").is_none());
    }

    #[test]
    fn event_deserializes_from_a_provider_response() {
        let body = serde_json::json!({
            "id": "abc123",
            "summary": "Algorithms",
            "description": "Attendance Status: PRESENT\nNote: guest lecture",
            "start": { "dateTime": "2025-03-10T10:00:00Z" },
            "end": { "dateTime": "2025-03-10T11:00:00Z" },
            "extendedProperties": { "private": { "attendanceStatus": "present" } }
        });
        let event: GoogleEvent = serde_json::from_value(body).unwrap();
        assert_eq!(event.id, "abc123");
        assert_eq!(event.summary.as_deref(), Some("Algorithms"));
        let props = event.extended_properties.unwrap().private.unwrap();
        assert_eq!(props.get(PROP_STATUS).map(String::as_str), Some("present"));
    }

    #[test]
    fn sparse_event_deserializes() {
        let event: GoogleEvent = serde_json::from_value(serde_json::json!({
            "id": "bare"
        }))
        .unwrap();
        assert!(event.summary.is_none());
        assert!(event.extended_properties.is_none());
    }
}
