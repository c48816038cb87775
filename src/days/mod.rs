pub mod dto;
pub mod errors;
pub mod handlers;
pub mod model;
pub mod store;
pub mod week;

use crate::state::AppState;
use axum::Router;

pub use store::DailyRecordStore;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::day_routes())
}
