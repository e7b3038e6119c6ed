use serde::{Deserialize, Serialize};

use crate::attendance::repo::{AttendanceRecord, AttendanceStatus};

/// Request body for marking today's attendance.
#[derive(Debug, Deserialize)]
pub struct MarkRequest {
    pub status: AttendanceStatus,
    #[serde(default)]
    pub note: Option<String>,
}

/// Response for a successful mark. `message` carries the advisory when the
/// calendar sync was attempted but failed.
#[derive(Debug, Serialize)]
pub struct MarkResponse {
    pub success: bool,
    pub data: AttendanceRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
