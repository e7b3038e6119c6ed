use crate::state::AppState;
use axum::Router;

pub mod client;
pub mod dto;
pub mod extract;
pub mod handlers;
pub mod recurrence;
pub mod services;

pub fn router() -> Router<AppState> {
    handlers::router()
}
