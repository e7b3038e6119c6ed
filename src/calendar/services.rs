use std::collections::HashMap;

use time::{format_description::well_known::Rfc3339, Date, Duration, OffsetDateTime};
use tracing::{debug, info, warn};

use crate::{
    attendance::repo::AttendanceStatus,
    auth::repo::User,
    calendar::{
        client::{
            EventDateTime, EventExtendedProperties, EventPatch, EventPayload, EventReminders,
            GoogleEvent, ReminderOverride, PROP_NOTE, PROP_STATUS,
        },
        dto::ScheduleRequest,
        recurrence,
    },
    day,
    error::ApiError,
    state::AppState,
};

const EVENT_DESCRIPTION: &str = "Class for Attendly attendance tracking.";

/// Access token for calendar calls, refreshed through the OAuth client when
/// the stored one is expired (60s skew). The new token is persisted.
pub async fn fresh_access_token(state: &AppState, user: &User) -> anyhow::Result<String> {
    let access = user
        .google_access_token
        .clone()
        .ok_or_else(|| anyhow::anyhow!("google account not connected"))?;

    let expired = user
        .google_token_expires_at
        .map(|exp| exp - Duration::seconds(60) <= OffsetDateTime::now_utc())
        .unwrap_or(false);
    if !expired {
        return Ok(access);
    }

    let Some(refresh) = user.google_refresh_token.as_deref() else {
        // nothing to refresh with; let the provider reject the stale token
        warn!(user_id = %user.id, "google token expired and no refresh token stored");
        return Ok(access);
    };

    info!(user_id = %user.id, "refreshing google access token");
    let tokens = state.oauth.refresh(refresh).await?;
    User::update_google_access_token(&state.db, user.id, &tokens.access_token, tokens.expires_at)
        .await?;
    Ok(tokens.access_token)
}

/// Create the weekly recurring event for a subject's class schedule.
pub async fn create_schedule(
    state: &AppState,
    user: &User,
    req: &ScheduleRequest,
) -> Result<GoogleEvent, ApiError> {
    if user.google_access_token.is_none() {
        return Err(ApiError::GoogleNotConnected);
    }

    let subject = crate::subjects::repo::Subject::find_owned(&state.db, req.subject_id, user.id)
        .await?
        .ok_or(ApiError::NotFound("Subject"))?;

    let days = recurrence::parse_days(&req.days)?;
    let start_time = recurrence::parse_clock(&req.start_time)
        .ok_or_else(|| ApiError::Validation("startTime must be HH:MM".into()))?;
    let end_time = recurrence::parse_clock(&req.end_time)
        .ok_or_else(|| ApiError::Validation("endTime must be HH:MM".into()))?;

    // First occurrence: next matching instant for the first selected weekday,
    // ending the same day.
    let now = day::now_local();
    let first_start = recurrence::next_occurrence(now, days[0], start_time);
    let first_end = first_start
        .date()
        .with_time(end_time)
        .assume_offset(first_start.offset());

    let time_zone = state.config.google.calendar_time_zone.clone();
    let payload = EventPayload {
        summary: subject.name.clone(),
        description: EVENT_DESCRIPTION.into(),
        start: EventDateTime {
            date_time: Some(first_start.format(&Rfc3339).map_err(anyhow::Error::from)?),
            time_zone: Some(time_zone.clone()),
            date: None,
        },
        end: EventDateTime {
            date_time: Some(first_end.format(&Rfc3339).map_err(anyhow::Error::from)?),
            time_zone: Some(time_zone),
            date: None,
        },
        recurrence: vec![recurrence::weekly_rrule(&days)],
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
                AttendanceStatus::Present.as_str().to_string(),
            )])),
        },
    };

    let token = fresh_access_token(state, user).await?;
    let created = state
        .calendar
        .insert_event(&token, &payload)
        .await
        .map_err(ApiError::External)?;

    info!(user_id = %user.id, subject = %subject.name, event_id = %created.id, "schedule created");
    Ok(created)
}

/// Reflect today's attendance mark into the matching calendar event.
///
/// Best-effort: callers log failures and never fail the attendance write
/// over them.
pub async fn sync_attendance_note(
    state: &AppState,
    user: &User,
    subject_name: &str,
    status: AttendanceStatus,
    note: &str,
    mark_day: Date,
) -> anyhow::Result<()> {
    let token = fresh_access_token(state, user).await?;
    let (time_min, time_max) = day::day_bounds(mark_day, day::local_offset());

    let events = state
        .calendar
        .list_events(&token, Some(subject_name), time_min, time_max)
        .await?;

    // the search is free-text; pin the instance by exact title
    let Some(event) = events
        .iter()
        .find(|e| e.summary.as_deref() == Some(subject_name))
    else {
        debug!(subject = %subject_name, "no calendar event for today, skipping note sync");
        return Ok(());
    };

    let patch = EventPatch {
        description: Some(format!(
            "Attendance Status: {}\nNote: {}",
            status.as_str().to_uppercase(),
            note
        )),
        extended_properties: Some(EventExtendedProperties {
            private: Some(HashMap::from([
                (PROP_STATUS.to_string(), status.as_str().to_string()),
                (PROP_NOTE.to_string(), note.to_string()),
            ])),
        }),
    };

    state.calendar.patch_event(&token, &event.id, &patch).await?;
    info!(user_id = %user.id, subject = %subject_name, event_id = %event.id, "attendance note synced");
    Ok(())
}

/// Expanded event instances around now (one month either side).
pub async fn list_events(state: &AppState, user: &User) -> Result<Vec<GoogleEvent>, ApiError> {
    if user.google_access_token.is_none() {
        return Err(ApiError::GoogleNotConnected);
    }
    let token = fresh_access_token(state, user).await?;

    let now = day::now_local();
    let events = state
        .calendar
        .list_events(&token, None, now - Duration::days(30), now + Duration::days(30))
        .await
        .map_err(ApiError::External)?;
    Ok(events)
}
