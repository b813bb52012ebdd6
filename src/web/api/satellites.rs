use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::service::SatelliteStatus;
use crate::web::server::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub utc: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SatellitesResponse {
    pub satellites: Vec<SatelliteStatus>,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "status",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        utc: Utc::now(),
    })
}

#[utoipa::path(
    get,
    path = "/satellites",
    tag = "satellites",
    responses(
        (status = 200, description = "Catalog with local element status", body = SatellitesResponse)
    )
)]
pub async fn list_satellites(State(state): State<AppState>) -> Json<SatellitesResponse> {
    Json(SatellitesResponse {
        satellites: state.service.satellites(),
    })
}
