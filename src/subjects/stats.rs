use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::attendance::repo::AttendanceStatus;

/// A subject joined with its derived attendance counters.
#[derive(Debug, Clone, FromRow)]
pub struct SubjectStatsRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub total_classes: i64,
    pub attended_classes: i64,
    pub todays_status: Option<String>,
}

impl SubjectStatsRow {
    pub fn todays_status(&self) -> Option<AttendanceStatus> {
        self.todays_status.as_deref().and_then(AttendanceStatus::parse)
    }
}

/// All subjects of a user with attended/total counts and today's status,
/// derived in a single grouped query. One round-trip per user regardless of
/// how many subjects exist; the per-subject variant degrades quadratically.
pub async fn subjects_with_stats(
    db: &PgPool,
    user_id: Uuid,
    today: Date,
) -> anyhow::Result<Vec<SubjectStatsRow>> {
    let rows = sqlx::query_as::<_, SubjectStatsRow>(
        r#"
        SELECT s.id, s.user_id, s.name, s.created_at, s.updated_at,
               COUNT(a.id) FILTER (WHERE a.status IN ('present', 'absent')) AS total_classes,
               COUNT(a.id) FILTER (WHERE a.status = 'present') AS attended_classes,
               MAX(a.status::text) FILTER (WHERE a.marked_on = $2) AS todays_status
        FROM subjects s
        LEFT JOIN attendance_records a
               ON a.subject_id = s.id AND a.user_id = s.user_id
        WHERE s.user_id = $1
        GROUP BY s.id
        ORDER BY s.created_at
        "#,
    )
    .bind(user_id)
    .bind(today)
    .fetch_all(db)
    .await?;
    Ok(rows)
}
