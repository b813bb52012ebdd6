use axum::http::HeaderValue;
use axum::{routing::get, routing::post, Router};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::WebConfig;
use crate::service::Service;

use super::api::elements as element_handlers;
use super::api::orbit as orbit_handlers;
use super::api::satellites as satellite_handlers;
use super::api_doc::ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<Service>,
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

pub fn router(service: Arc<Service>, web: &WebConfig) -> Router {
    let state = AppState { service };

    Router::new()
        .route("/health", get(satellite_handlers::health))
        .route("/satellites", get(satellite_handlers::list_satellites))
        // Orbit queries
        .route("/position", get(orbit_handlers::position))
        .route("/track", get(orbit_handlers::track))
        .route("/track/now", get(orbit_handlers::track_now))
        .route("/passes", get(orbit_handlers::passes))
        // Element cache
        .route("/tle/status", get(element_handlers::status))
        .route("/tle/meta", get(element_handlers::meta))
        .route("/tle/refresh", post(element_handlers::refresh))
        .route("/tle/refresh-all", post(element_handlers::refresh_all))
        // OpenAPI / Swagger
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(cors_layer(&web.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(service: Arc<Service>, web: WebConfig) -> std::io::Result<()> {
    let app = router(service, &web);

    log::info!("Starting server on {}", web.bind);

    let listener = tokio::net::TcpListener::bind(&web.bind).await?;
    axum::serve(listener, app).await
}
