use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::attendance::repo::AttendanceStatus;
use crate::calendar::client::GoogleEvent;
use crate::calendar::extract;

/// Request body for creating a recurring class schedule.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRequest {
    pub subject_id: Uuid,
    pub days: Vec<String>,
    pub start_time: String,
    pub end_time: String,
}

/// One expanded event instance with the attendance data recovered from it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEventItem {
    pub id: String,
    pub title: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub description: Option<String>,
    pub status: Option<AttendanceStatus>,
    pub note: Option<String>,
}

impl From<GoogleEvent> for CalendarEventItem {
    fn from(event: GoogleEvent) -> Self {
        let annotation = extract::annotate(&event);
        let pick = |dt: &Option<crate::calendar::client::EventDateTime>| {
            dt.as_ref()
                .and_then(|d| d.date_time.clone().or_else(|| d.date.clone()))
        };
        Self {
            start: pick(&event.start),
            end: pick(&event.end),
            id: event.id,
            title: event.summary,
            description: event.description,
            status: annotation.status,
            note: annotation.note,
        }
    }
}
