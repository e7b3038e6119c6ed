use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::jwt::AuthUser,
    error::ApiError,
    response::DataResponse,
    state::AppState,
    subjects::{
        dto::{CreateSubjectRequest, SubjectWithStats},
        services,
    },
};

pub fn router() -> Router<AppState> {
    Router::new().route("/subjects", get(get_all_subjects).post(create_subject))
}

#[instrument(skip(state, payload))]
pub async fn create_subject(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateSubjectRequest>,
) -> Result<(StatusCode, Json<DataResponse<SubjectWithStats>>), ApiError> {
    let subject = services::create_subject(&state, user_id, &payload).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(subject))))
}

#[instrument(skip(state))]
pub async fn get_all_subjects(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<DataResponse<Vec<SubjectWithStats>>>, ApiError> {
    let subjects = services::get_all_subjects(&state, user_id).await?;
    Ok(Json(DataResponse::new(subjects)))
}
