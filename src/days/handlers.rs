use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use time::Date;
use tracing::{info, instrument, warn};

use super::dto::{
    AppendMealRequest, ClearResponse, ImportResponse, WeekQuery, WeekTotals, WeeklyResponse,
};
use super::errors::StoreError;
use super::model::{DailyRecord, MealEntry};
use super::week::{format_clock, format_day, parse_day};
use crate::state::AppState;

type ApiError = (StatusCode, String);

pub fn day_routes() -> Router<AppState> {
    Router::new()
        .route("/days", delete(clear_days))
        .route("/days/:date", get(get_day).put(put_day))
        .route("/days/:date/meals", post(append_meal))
        .route("/days/:date/meals/:index", delete(remove_meal))
        .route("/today", get(get_today))
        .route("/week", get(get_week))
        .route("/export", get(export_legacy))
        .route("/import", post(import_legacy))
}

#[instrument(skip(state))]
pub async fn get_day(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<DailyRecord>, ApiError> {
    let day = day_param(&date)?;
    match state.store.get_daily(day).await.map_err(store_error)? {
        Some(record) => Ok(Json(record)),
        None => Err((StatusCode::NOT_FOUND, format!("No record for {date}"))),
    }
}

/// Today's record on the local clock, zero-valued when nothing is logged yet.
#[instrument(skip(state))]
pub async fn get_today(State(state): State<AppState>) -> Result<Json<DailyRecord>, ApiError> {
    let today = state.store.today();
    let record = state
        .store
        .get_daily_or_default(today)
        .await
        .map_err(store_error)?;
    Ok(Json(record))
}

#[instrument(skip(state, record))]
pub async fn put_day(
    State(state): State<AppState>,
    Path(date): Path<String>,
    Json(record): Json<DailyRecord>,
) -> Result<Json<DailyRecord>, ApiError> {
    let day = day_param(&date)?;
    state
        .store
        .save_daily(day, &record)
        .await
        .map_err(store_error)?;
    Ok(Json(record))
}

#[instrument(skip(state, body), fields(food = %body.food))]
pub async fn append_meal(
    State(state): State<AppState>,
    Path(date): Path<String>,
    Json(body): Json<AppendMealRequest>,
) -> Result<(StatusCode, Json<DailyRecord>), ApiError> {
    let day = day_param(&date)?;
    let food = body.food.trim();
    if food.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "food is required".into()));
    }
    let time = body
        .time
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| format_clock(state.store.now_local().time()));

    let meal = MealEntry::from_estimate(time, food, body.estimate);
    let record = state
        .store
        .append_meal(day, meal)
        .await
        .map_err(store_error)?;
    info!(%day, meals = record.meals.len(), calories = record.total_calories, "meal logged");
    Ok((StatusCode::CREATED, Json(record)))
}

#[instrument(skip(state))]
pub async fn remove_meal(
    State(state): State<AppState>,
    Path((date, index)): Path<(String, usize)>,
) -> Result<Json<DailyRecord>, ApiError> {
    let day = day_param(&date)?;
    let record = state
        .store
        .remove_meal(day, index)
        .await
        .map_err(store_error)?;
    Ok(Json(record))
}

#[instrument(skip(state))]
pub async fn clear_days(State(state): State<AppState>) -> Result<Json<ClearResponse>, ApiError> {
    let removed = state.store.clear_all().await.map_err(store_error)?;
    Ok(Json(ClearResponse { removed }))
}

#[instrument(skip(state))]
pub async fn get_week(
    State(state): State<AppState>,
    Query(q): Query<WeekQuery>,
) -> Result<Json<WeeklyResponse>, ApiError> {
    let days = match q.today.as_deref() {
        Some(raw) => state.store.get_weekly_at(day_param(raw)?).await,
        None => state.store.get_weekly().await,
    }
    .map_err(store_error)?;

    let totals = WeekTotals::from_days(&days);
    Ok(Json(WeeklyResponse {
        week_start: days.first().map(|d| format_day(d.date)).unwrap_or_default(),
        week_end: days.last().map(|d| format_day(d.date)).unwrap_or_default(),
        days,
        totals,
    }))
}

#[instrument(skip(state))]
pub async fn export_legacy(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<String, String>>, ApiError> {
    let dump = state.store.export_legacy().await.map_err(store_error)?;
    Ok(Json(dump))
}

#[instrument(skip(state, dump))]
pub async fn import_legacy(
    State(state): State<AppState>,
    Json(dump): Json<BTreeMap<String, String>>,
) -> Result<Json<ImportResponse>, ApiError> {
    let imported = state
        .store
        .import_legacy(&dump)
        .await
        .map_err(store_error)?;
    Ok(Json(ImportResponse { imported }))
}

fn day_param(raw: &str) -> Result<Date, ApiError> {
    parse_day(raw).ok_or_else(|| {
        warn!(date = %raw, "invalid date");
        (
            StatusCode::BAD_REQUEST,
            format!("Invalid date {raw:?}, expected YYYY-MM-DD"),
        )
    })
}

fn store_error(e: StoreError) -> ApiError {
    (e.status(), e.to_string())
}
