use time::{Duration, OffsetDateTime};
use tracing::info;
use uuid::Uuid;

use crate::{
    attendance::repo::{AttendanceRecord, AttendanceStatus, BackfillEntry},
    day,
    error::ApiError,
    state::AppState,
    subjects::{
        dto::{CreateSubjectRequest, SubjectWithStats},
        repo::Subject,
        stats,
    },
};

/// Historical records representing attendance before the subject existed:
/// `attended` present days at offsets 1..=attended before `now`, then the
/// absent days on the offsets after those. Everything lands strictly before
/// today, so today's mark stays available.
pub fn backfill_plan(now: OffsetDateTime, attended: i64, total: i64) -> Vec<BackfillEntry> {
    let mut entries = Vec::with_capacity(total.max(0) as usize);
    for offset in 1..=total.max(0) {
        let status = if offset <= attended {
            AttendanceStatus::Present
        } else {
            AttendanceStatus::Absent
        };
        let marked_at = now - Duration::days(offset);
        entries.push(BackfillEntry {
            status,
            marked_at,
            marked_on: marked_at.date(),
        });
    }
    entries
}

fn validate_backfill(attended: i64, total: i64) -> Result<(), ApiError> {
    if attended < 0 || total < 0 {
        return Err(ApiError::Validation(
            "initialAttended and initialTotal cannot be negative".into(),
        ));
    }
    if attended > total {
        return Err(ApiError::Validation(
            "initialAttended cannot exceed initialTotal".into(),
        ));
    }
    Ok(())
}

/// Create a subject, backfilling history when initial counts are given.
pub async fn create_subject(
    state: &AppState,
    user_id: Uuid,
    req: &CreateSubjectRequest,
) -> Result<SubjectWithStats, ApiError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("name must not be empty".into()));
    }

    let attended = req.initial_attended.unwrap_or(0);
    let total = req.initial_total.unwrap_or(0);
    validate_backfill(attended, total)?;

    let subject = Subject::create(&state.db, user_id, name).await?;

    if total > 0 {
        let entries = backfill_plan(day::now_local(), attended, total);
        AttendanceRecord::insert_backfill(&state.db, user_id, subject.id, &entries).await?;
        info!(
            subject_id = %subject.id,
            attended,
            total,
            "backfilled attendance history"
        );
    }

    info!(user_id = %user_id, subject_id = %subject.id, name = %subject.name, "subject created");
    Ok(SubjectWithStats::fresh(subject, attended, total))
}

/// All subjects of the user, with stats, via the one-pass aggregator.
pub async fn get_all_subjects(
    state: &AppState,
    user_id: Uuid,
) -> Result<Vec<SubjectWithStats>, ApiError> {
    let rows = stats::subjects_with_stats(&state.db, user_id, day::today()).await?;
    Ok(rows.into_iter().map(SubjectWithStats::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn backfill_three_of_five() {
        let now = datetime!(2025 - 03 - 10 15:30 UTC);
        let plan = backfill_plan(now, 3, 5);
        assert_eq!(plan.len(), 5);

        let present: Vec<_> = plan
            .iter()
            .filter(|e| e.status == AttendanceStatus::Present)
            .collect();
        let absent: Vec<_> = plan
            .iter()
            .filter(|e| e.status == AttendanceStatus::Absent)
            .collect();
        assert_eq!(present.len(), 3);
        assert_eq!(absent.len(), 2);

        // everything strictly before today
        for entry in &plan {
            assert!(entry.marked_on < now.date());
        }

        // present on the nearest days, absent on the ones before those
        assert_eq!(present[0].marked_on, now.date() - Duration::days(1));
        assert_eq!(present[2].marked_on, now.date() - Duration::days(3));
        assert_eq!(absent[0].marked_on, now.date() - Duration::days(4));
        assert_eq!(absent[1].marked_on, now.date() - Duration::days(5));
    }

    #[test]
    fn backfill_days_are_distinct() {
        let now = datetime!(2025 - 03 - 10 09:00 UTC);
        let plan = backfill_plan(now, 2, 4);
        let mut days: Vec<_> = plan.iter().map(|e| e.marked_on).collect();
        days.sort();
        days.dedup();
        assert_eq!(days.len(), 4);
    }

    #[test]
    fn backfill_full_attendance_has_no_absences() {
        let now = datetime!(2025 - 03 - 10 09:00 UTC);
        let plan = backfill_plan(now, 4, 4);
        assert!(plan.iter().all(|e| e.status == AttendanceStatus::Present));
    }

    #[test]
    fn backfill_zero_total_is_empty() {
        let now = datetime!(2025 - 03 - 10 09:00 UTC);
        assert!(backfill_plan(now, 0, 0).is_empty());
    }

    #[test]
    fn validation_rejects_attended_above_total() {
        assert!(validate_backfill(5, 3).is_err());
        assert!(validate_backfill(-1, 3).is_err());
        assert!(validate_backfill(0, -2).is_err());
        assert!(validate_backfill(3, 5).is_ok());
        assert!(validate_backfill(0, 0).is_ok());
    }
}
