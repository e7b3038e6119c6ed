use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// Attendance status of a single class day. `NoLecture` days are kept in the
/// ledger but excluded from totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "attendance_status", rename_all = "kebab-case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    NoLecture,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
            Self::NoLecture => "no-lecture",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "present" => Some(Self::Present),
            "absent" => Some(Self::Absent),
            "no-lecture" => Some(Self::NoLecture),
            _ => None,
        }
    }
}

/// One attendance record per (user, subject, calendar day); the day bucket
/// carries a unique index so the invariant holds under concurrent marks too.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "date", with = "time::serde::rfc3339")]
    pub marked_at: OffsetDateTime,
    #[serde(skip_serializing)]
    pub marked_on: Date,
    pub status: AttendanceStatus,
    pub note: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

const RECORD_COLUMNS: &str =
    "id, subject_id, user_id, marked_at, marked_on, status, note, created_at, updated_at";

/// A backfilled historical record to be inserted alongside a new subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillEntry {
    pub status: AttendanceStatus,
    pub marked_at: OffsetDateTime,
    pub marked_on: Date,
}

impl AttendanceRecord {
    /// Record for (user, subject) on the given calendar day, if any.
    pub async fn find_on_day(
        db: &PgPool,
        user_id: Uuid,
        subject_id: Uuid,
        day: Date,
    ) -> anyhow::Result<Option<AttendanceRecord>> {
        let record = sqlx::query_as::<_, AttendanceRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM attendance_records \
             WHERE user_id = $1 AND subject_id = $2 AND marked_on = $3"
        ))
        .bind(user_id)
        .bind(subject_id)
        .bind(day)
        .fetch_optional(db)
        .await?;
        Ok(record)
    }

    /// Insert today's mark. Returns `None` when another insert for the same
    /// day bucket won the race (the unique index swallows the conflict).
    pub async fn insert(
        db: &PgPool,
        user_id: Uuid,
        subject_id: Uuid,
        status: AttendanceStatus,
        note: Option<&str>,
        marked_at: OffsetDateTime,
        marked_on: Date,
    ) -> anyhow::Result<Option<AttendanceRecord>> {
        let record = sqlx::query_as::<_, AttendanceRecord>(&format!(
            "INSERT INTO attendance_records \
             (subject_id, user_id, marked_at, marked_on, status, note) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (user_id, subject_id, marked_on) DO NOTHING \
             RETURNING {RECORD_COLUMNS}"
        ))
        .bind(subject_id)
        .bind(user_id)
        .bind(marked_at)
        .bind(marked_on)
        .bind(status)
        .bind(note)
        .fetch_optional(db)
        .await?;
        Ok(record)
    }

    /// All records for (user, subject) in insertion order.
    pub async fn list(
        db: &PgPool,
        user_id: Uuid,
        subject_id: Uuid,
    ) -> anyhow::Result<Vec<AttendanceRecord>> {
        let rows = sqlx::query_as::<_, AttendanceRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM attendance_records \
             WHERE user_id = $1 AND subject_id = $2 \
             ORDER BY created_at"
        ))
        .bind(user_id)
        .bind(subject_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Batch-insert backfilled history for a freshly created subject.
    pub async fn insert_backfill(
        db: &PgPool,
        user_id: Uuid,
        subject_id: Uuid,
        entries: &[BackfillEntry],
    ) -> anyhow::Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO attendance_records \
             (subject_id, user_id, marked_at, marked_on, status) ",
        );
        builder.push_values(entries, |mut row, entry| {
            row.push_bind(subject_id)
                .push_bind(user_id)
                .push_bind(entry.marked_at)
                .push_bind(entry.marked_on)
                .push_bind(entry.status);
        });
        builder.build().execute(db).await?;
        Ok(())
    }
}
