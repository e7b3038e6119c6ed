use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    attendance::{
        dto::{MarkRequest, MarkResponse},
        repo::AttendanceRecord,
        services,
    },
    auth::jwt::AuthUser,
    error::ApiError,
    response::DataResponse,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/attendance/:subjectId",
        post(mark_attendance).get(get_attendance),
    )
}

#[instrument(skip(state, payload))]
pub async fn mark_attendance(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(subject_id): Path<Uuid>,
    Json(payload): Json<MarkRequest>,
) -> Result<(StatusCode, Json<MarkResponse>), ApiError> {
    let (record, advisory) = services::mark_attendance(
        &state,
        user_id,
        subject_id,
        payload.status,
        payload.note.as_deref(),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(MarkResponse {
            success: true,
            data: record,
            message: advisory,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn get_attendance(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(subject_id): Path<Uuid>,
) -> Result<Json<DataResponse<Vec<AttendanceRecord>>>, ApiError> {
    let records = services::get_attendance(&state, user_id, subject_id).await?;
    Ok(Json(DataResponse::new(records)))
}
