use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::default_satellite;
use crate::elements::TleSource;
use crate::orbit::SatelliteRef;
use crate::service::{MetaReport, RefreshResult, SatelliteStatus};
use crate::web::api::error::{ApiResult, ErrorResponse};
use crate::web::server::AppState;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatusQuery {
    /// Omit for every catalog entry
    pub satellite: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SatelliteQuery {
    #[serde(default = "default_satellite")]
    pub satellite: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusListResponse {
    pub satellites: Vec<SatelliteStatus>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RefreshResponse {
    pub satellite: SatelliteRef,
    pub refreshed: bool,
    pub source: TleSource,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RefreshAllResponse {
    pub results: Vec<RefreshResult>,
}

#[utoipa::path(
    get,
    path = "/tle/status",
    tag = "tle",
    params(StatusQuery),
    responses(
        (status = 200, description = "Element status of one satellite, or of all when none is given", body = SatelliteStatus),
        (status = 400, description = "Unknown satellite", body = ErrorResponse)
    )
)]
pub async fn status(
    State(state): State<AppState>,
    query: Result<Query<StatusQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(query) = query?;
    match query.satellite {
        Some(key) => Ok(Json(state.service.element_status(&key)?).into_response()),
        None => Ok(Json(StatusListResponse {
            satellites: state.service.status_all(),
        })
        .into_response()),
    }
}

#[utoipa::path(
    get,
    path = "/tle/meta",
    tag = "tle",
    params(SatelliteQuery),
    responses(
        (status = 200, description = "Stored fetch metadata", body = MetaReport),
        (status = 400, description = "Unknown satellite", body = ErrorResponse)
    )
)]
pub async fn meta(
    State(state): State<AppState>,
    query: Result<Query<SatelliteQuery>, QueryRejection>,
) -> ApiResult<Json<MetaReport>> {
    let Query(query) = query?;
    Ok(Json(state.service.element_meta(&query.satellite)?))
}

#[utoipa::path(
    post,
    path = "/tle/refresh",
    tag = "tle",
    params(SatelliteQuery),
    responses(
        (status = 200, description = "Elements refreshed", body = RefreshResponse),
        (status = 400, description = "Unknown satellite", body = ErrorResponse),
        (status = 503, description = "All sources unavailable", body = ErrorResponse)
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    query: Result<Query<SatelliteQuery>, QueryRejection>,
) -> ApiResult<Json<RefreshResponse>> {
    let Query(query) = query?;
    let entry = state.service.catalog_entry(&query.satellite)?;
    let source = state.service.refresh_or_fail(&entry.key).await?;
    Ok(Json(RefreshResponse {
        satellite: SatelliteRef {
            key: entry.key,
            catnr: entry.catnr,
        },
        refreshed: true,
        source,
    }))
}

#[utoipa::path(
    post,
    path = "/tle/refresh-all",
    tag = "tle",
    responses(
        (status = 200, description = "Best-effort refresh of every catalog entry", body = RefreshAllResponse)
    )
)]
pub async fn refresh_all(State(state): State<AppState>) -> Json<RefreshAllResponse> {
    Json(RefreshAllResponse {
        results: state.service.refresh_all().await,
    })
}
