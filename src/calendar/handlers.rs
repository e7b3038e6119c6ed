use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{jwt::AuthUser, repo::User},
    calendar::{dto::{CalendarEventItem, ScheduleRequest}, services},
    error::ApiError,
    response::{DataResponse, MessageResponse},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/calendar/schedule", post(create_schedule))
        .route("/calendar/events", get(list_events))
}

#[instrument(skip(state, payload))]
pub async fn create_schedule(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ScheduleRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or(ApiError::Unauthenticated("User not found"))?;

    services::create_schedule(&state, &user, &payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Schedule created successfully!")),
    ))
}

#[instrument(skip(state))]
pub async fn list_events(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<DataResponse<Vec<CalendarEventItem>>>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or(ApiError::Unauthenticated("User not found"))?;

    let events = services::list_events(&state, &user).await?;
    let items = events.into_iter().map(CalendarEventItem::from).collect();
    Ok(Json(DataResponse::new(items)))
}
