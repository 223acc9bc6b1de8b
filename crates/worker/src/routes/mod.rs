//! Operational control routes.

pub mod health;
pub mod recon;
pub mod worker;

use axum::{Json, Router, http::StatusCode};
use serde_json::json;

use saldo_shared::AppError;

use crate::AppState;

/// Assembles the API routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(worker::routes())
        .merge(recon::routes())
}

/// Maps an application error to its JSON error response.
pub(crate) fn error_response(err: &AppError) -> (StatusCode, Json<serde_json::Value>) {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(json!({
            "error_code": err.error_code(),
            "message": err.to_string(),
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_shape() {
        let (status, Json(body)) = error_response(&AppError::Database("boom".to_string()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error_code"], "DATABASE_ERROR");
        assert_eq!(body["message"], "Database error: boom");
    }

    #[test]
    fn test_error_response_validation_is_400() {
        let (status, _) = error_response(&AppError::Validation("bad".to_string()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
