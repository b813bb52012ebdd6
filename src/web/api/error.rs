use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::ServiceError;

pub enum ApiError {
    Validation(String),
    Service(ServiceError),
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        ApiError::Service(e)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::with_message("validation_failed", &msg)),
            )
                .into_response(),
            ApiError::Service(e) => {
                let status = match &e {
                    ServiceError::InvalidSatellite { .. } | ServiceError::InvalidTimeRange(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    ServiceError::NoLocalElements { .. }
                    | ServiceError::AcquisitionExhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
                    ServiceError::Propagation(_) | ServiceError::Store(_) => {
                        log::error!("Request failed: {}", e);
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (
                    status,
                    Json(ErrorResponse::with_message(e.code(), &e.to_string())),
                )
                    .into_response()
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorResponse {
    pub fn with_message(error: &str, message: &str) -> Self {
        ErrorResponse {
            error: error.to_string(),
            message: Some(message.to_string()),
        }
    }
}
