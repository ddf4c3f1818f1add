use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use crate::db::CreateRestaurantPizzaError;
use crate::serializer::{ApiErrorResponse, ValidationErrorResponse};

/// Body returned for every rejected write. Individual violations are only logged.
pub const VALIDATION_ERRORS: &str = "validation errors";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("Connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl From<CreateRestaurantPizzaError> for ApiError {
    fn from(error: CreateRestaurantPizzaError) -> Self {
        match error {
            CreateRestaurantPizzaError::Database(e) => ApiError::Database(e),
            rejected => ApiError::Validation(rejected.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(error: tokio::task::JoinError) -> Self {
        ApiError::InternalError(error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                Json(ApiErrorResponse {
                    error: self.to_string(),
                }),
            )
                .into_response(),
            ApiError::Validation(detail) => {
                tracing::warn!(%detail, "rejected request");
                (
                    StatusCode::BAD_REQUEST,
                    Json(ValidationErrorResponse {
                        errors: vec![VALIDATION_ERRORS.to_string()],
                    }),
                )
                    .into_response()
            }
            ApiError::Database(_) | ApiError::Pool(_) | ApiError::InternalError(_) => {
                tracing::error!(error = %self, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiErrorResponse {
                        error: "Internal server error".to_string(),
                    }),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    async fn render(error: ApiError) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_not_found_body() {
        let (status, body) = render(ApiError::NotFound("Restaurant")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Restaurant not found" }));
    }

    #[tokio::test]
    async fn test_validation_detail_is_not_exposed() {
        let (status, body) =
            render(ApiError::Validation("price must be an integer".to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "errors": ["validation errors"] }));
    }

    #[tokio::test]
    async fn test_database_error_is_generic() {
        let (status, body) = render(ApiError::Database(diesel::result::Error::NotFound)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Internal server error" }));
    }

    #[test]
    fn test_create_errors_collapse_to_validation() {
        let error = ApiError::from(CreateRestaurantPizzaError::UnknownPizza(Some(7)));
        assert!(matches!(error, ApiError::Validation(_)));

        let error = ApiError::from(CreateRestaurantPizzaError::Database(
            diesel::result::Error::RollbackTransaction,
        ));
        assert!(matches!(error, ApiError::Database(_)));
    }
}
