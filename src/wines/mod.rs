use axum::Router;

use crate::state::AppState;

mod dto;
pub mod handlers;
pub mod repo;
mod rules;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
