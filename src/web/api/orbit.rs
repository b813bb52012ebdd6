use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::IntoParams;

use super::{default_satellite, deserialize_datetime, deserialize_optional_datetime};
use crate::orbit::{PassReport, PositionReport, TrackReport};
use crate::web::api::error::{ApiResult, ErrorResponse};
use crate::web::server::AppState;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PositionQuery {
    #[serde(default = "default_satellite")]
    pub satellite: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TrackQuery {
    #[serde(default = "default_satellite")]
    pub satellite: String,
    /// ISO-8601; UTC when no offset is given
    #[serde(deserialize_with = "deserialize_datetime")]
    #[param(value_type = String)]
    pub start_utc: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_datetime")]
    #[param(value_type = String)]
    pub end_utc: DateTime<Utc>,
    #[serde(default = "default_step_seconds")]
    pub step_seconds: u32,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TrackNowQuery {
    #[serde(default = "default_satellite")]
    pub satellite: String,
    #[serde(default = "default_minutes")]
    pub minutes: u32,
    #[serde(default = "default_step_seconds")]
    pub step_seconds: u32,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PassesQuery {
    #[serde(default = "default_satellite")]
    pub satellite: String,
    #[serde(default = "default_hours")]
    pub hours: u32,
    #[serde(default = "default_min_elevation")]
    pub min_elevation_deg: f64,
    /// Defaults to now
    #[serde(default, deserialize_with = "deserialize_optional_datetime")]
    #[param(value_type = Option<String>)]
    pub start_utc: Option<DateTime<Utc>>,
}

fn default_step_seconds() -> u32 {
    10
}

fn default_minutes() -> u32 {
    20
}

fn default_hours() -> u32 {
    24
}

fn default_min_elevation() -> f64 {
    10.0
}

#[utoipa::path(
    get,
    path = "/position",
    tag = "orbit",
    params(PositionQuery),
    responses(
        (status = 200, description = "Current subpoint", body = PositionReport),
        (status = 400, description = "Unknown satellite", body = ErrorResponse),
        (status = 503, description = "No elements available", body = ErrorResponse)
    )
)]
pub async fn position(
    State(state): State<AppState>,
    query: Result<Query<PositionQuery>, QueryRejection>,
) -> ApiResult<Json<PositionReport>> {
    let Query(query) = query?;
    Ok(Json(state.service.current_position(&query.satellite).await?))
}

#[utoipa::path(
    get,
    path = "/track",
    tag = "orbit",
    params(TrackQuery),
    responses(
        (status = 200, description = "Ground track between two instants", body = TrackReport),
        (status = 400, description = "Invalid satellite or time range", body = ErrorResponse),
        (status = 503, description = "No elements available", body = ErrorResponse)
    )
)]
pub async fn track(
    State(state): State<AppState>,
    query: Result<Query<TrackQuery>, QueryRejection>,
) -> ApiResult<Json<TrackReport>> {
    let Query(query) = query?;
    let report = state
        .service
        .ground_track(
            &query.satellite,
            query.start_utc,
            query.end_utc,
            query.step_seconds,
        )
        .await?;
    Ok(Json(report))
}

#[utoipa::path(
    get,
    path = "/track/now",
    tag = "orbit",
    params(TrackNowQuery),
    responses(
        (status = 200, description = "Ground track starting now", body = TrackReport),
        (status = 400, description = "Invalid satellite or range", body = ErrorResponse),
        (status = 503, description = "No elements available", body = ErrorResponse)
    )
)]
pub async fn track_now(
    State(state): State<AppState>,
    query: Result<Query<TrackNowQuery>, QueryRejection>,
) -> ApiResult<Json<TrackReport>> {
    let Query(query) = query?;
    let report = state
        .service
        .ground_track_now(&query.satellite, query.minutes, query.step_seconds)
        .await?;
    Ok(Json(report))
}

#[utoipa::path(
    get,
    path = "/passes",
    tag = "orbit",
    params(PassesQuery),
    responses(
        (status = 200, description = "Complete passes over the observer", body = PassReport),
        (status = 400, description = "Invalid satellite or parameters", body = ErrorResponse),
        (status = 503, description = "No elements available", body = ErrorResponse)
    )
)]
pub async fn passes(
    State(state): State<AppState>,
    query: Result<Query<PassesQuery>, QueryRejection>,
) -> ApiResult<Json<PassReport>> {
    let Query(query) = query?;
    let report = state
        .service
        .visibility_passes(
            &query.satellite,
            query.hours,
            query.min_elevation_deg,
            query.start_utc,
        )
        .await?;
    Ok(Json(report))
}
