use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    attendance::repo::{AttendanceRecord, AttendanceStatus},
    auth::repo::User,
    calendar,
    day,
    error::ApiError,
    state::AppState,
    subjects::repo::Subject,
};

const SYNC_ADVISORY: &str =
    "Attendance saved, but the calendar event could not be updated.";

/// A mark may only be present or absent; no-lecture days are bookkeeping the
/// client never submits directly.
fn validate_mark_status(status: AttendanceStatus) -> Result<(), ApiError> {
    match status {
        AttendanceStatus::Present | AttendanceStatus::Absent => Ok(()),
        AttendanceStatus::NoLecture => Err(ApiError::Validation(
            "status must be present or absent".into(),
        )),
    }
}

/// Mark today's attendance for a subject the user owns.
///
/// Returns the stored record plus an advisory message when the best-effort
/// calendar sync was attempted and failed.
pub async fn mark_attendance(
    state: &AppState,
    user_id: Uuid,
    subject_id: Uuid,
    status: AttendanceStatus,
    note: Option<&str>,
) -> Result<(AttendanceRecord, Option<String>), ApiError> {
    validate_mark_status(status)?;

    // ownership is re-validated on every write; a foreign subject id is
    // indistinguishable from a missing one
    let subject = Subject::find_owned(&state.db, subject_id, user_id)
        .await?
        .ok_or(ApiError::NotFound("Subject"))?;

    let now = day::now_local();
    let today = now.date();

    if AttendanceRecord::find_on_day(&state.db, user_id, subject_id, today)
        .await?
        .is_some()
    {
        return Err(ApiError::AlreadyMarked);
    }

    let record = AttendanceRecord::insert(&state.db, user_id, subject_id, status, note, now, today)
        .await?
        // a concurrent mark slipped in between the check and the insert
        .ok_or(ApiError::AlreadyMarked)?;

    info!(user_id = %user_id, subject_id = %subject_id, status = status.as_str(), "attendance marked");

    let advisory = match note {
        Some(note) if !note.is_empty() => {
            sync_note_best_effort(state, user_id, &subject.name, status, note, today).await
        }
        _ => None,
    };

    Ok((record, advisory))
}

/// Push the note into the calendar event; failures degrade to an advisory.
async fn sync_note_best_effort(
    state: &AppState,
    user_id: Uuid,
    subject_name: &str,
    status: AttendanceStatus,
    note: &str,
    today: time::Date,
) -> Option<String> {
    let user = match User::find_by_id(&state.db, user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return None,
        Err(e) => {
            warn!(error = %e, "could not load user for calendar sync");
            return Some(SYNC_ADVISORY.to_string());
        }
    };
    if user.google_access_token.is_none() {
        return None;
    }

    match calendar::services::sync_attendance_note(state, &user, subject_name, status, note, today)
        .await
    {
        Ok(()) => None,
        Err(e) => {
            warn!(error = %e, user_id = %user_id, subject = %subject_name, "calendar note sync failed");
            Some(SYNC_ADVISORY.to_string())
        }
    }
}

/// All records for (user, subject).
pub async fn get_attendance(
    state: &AppState,
    user_id: Uuid,
    subject_id: Uuid,
) -> Result<Vec<AttendanceRecord>, ApiError> {
    let records = AttendanceRecord::list(&state.db, user_id, subject_id).await?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn present_and_absent_are_markable() {
        assert!(validate_mark_status(AttendanceStatus::Present).is_ok());
        assert!(validate_mark_status(AttendanceStatus::Absent).is_ok());
    }

    #[test]
    fn no_lecture_is_rejected() {
        assert!(matches!(
            validate_mark_status(AttendanceStatus::NoLecture),
            Err(ApiError::Validation(_))
        ));
    }
}
