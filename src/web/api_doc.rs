use utoipa::OpenApi;

use super::api::elements::{RefreshAllResponse, RefreshResponse, StatusListResponse};
use super::api::error::ErrorResponse;
use super::api::satellites::{HealthResponse, SatellitesResponse};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::api::satellites::health,
        super::api::satellites::list_satellites,
        super::api::orbit::position,
        super::api::orbit::track,
        super::api::orbit::track_now,
        super::api::orbit::passes,
        super::api::elements::status,
        super::api::elements::meta,
        super::api::elements::refresh,
        super::api::elements::refresh_all,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            SatellitesResponse,
            StatusListResponse,
            RefreshResponse,
            RefreshAllResponse,
            crate::service::SatelliteStatus,
            crate::service::RefreshResult,
            crate::service::MetaReport,
            crate::elements::ElementStatus,
            crate::elements::TleMetadata,
            crate::elements::TleSource,
            crate::orbit::SatelliteRef,
            crate::orbit::Observer,
            crate::orbit::PositionReport,
            crate::orbit::Subpoint,
            crate::orbit::TrackReport,
            crate::orbit::TrackPoint,
            crate::orbit::LineFeature,
            crate::orbit::LineString,
            crate::orbit::LineProperties,
            crate::orbit::PassReport,
            crate::orbit::PassEvent,
        )
    ),
    info(
        title = "Orbitwatch API",
        description = "Satellite positions, ground tracks and visibility passes from cached orbital elements",
        version = "0.1.0"
    ),
    tags(
        (name = "status", description = "Service health"),
        (name = "satellites", description = "Tracked satellites"),
        (name = "orbit", description = "Position, ground track and pass queries"),
        (name = "tle", description = "Element cache status and refresh")
    )
)]
pub struct ApiDoc;
