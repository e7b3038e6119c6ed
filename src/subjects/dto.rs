use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::attendance::repo::AttendanceStatus;
use crate::subjects::{repo::Subject, stats::SubjectStatsRow};

/// Request body for creating a subject, optionally with backfilled history.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubjectRequest {
    pub name: String,
    #[serde(default)]
    pub initial_attended: Option<i64>,
    #[serde(default)]
    pub initial_total: Option<i64>,
}

/// Subject with its derived attendance counters, as shipped to the client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectWithStats {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub attended_classes: i64,
    pub total_classes: i64,
    /// Always present in the payload; `null` means no mark today.
    pub todays_status: Option<AttendanceStatus>,
}

impl SubjectWithStats {
    /// A brand-new subject: counters from the accepted backfill, no mark for
    /// today by construction.
    pub fn fresh(subject: Subject, attended: i64, total: i64) -> Self {
        Self {
            id: subject.id,
            user_id: subject.user_id,
            name: subject.name,
            created_at: subject.created_at,
            updated_at: subject.updated_at,
            attended_classes: attended,
            total_classes: total,
            todays_status: None,
        }
    }
}

impl From<SubjectStatsRow> for SubjectWithStats {
    fn from(row: SubjectStatsRow) -> Self {
        let todays_status = row.todays_status();
        Self {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            created_at: row.created_at,
            updated_at: row.updated_at,
            attended_classes: row.attended_classes,
            total_classes: row.total_classes,
            todays_status,
        }
    }
}
