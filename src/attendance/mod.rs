use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod repo;
pub mod services;

pub use repo::{AttendanceRecord, AttendanceStatus};

pub fn router() -> Router<AppState> {
    handlers::router()
}
