//! Gateway errors and their HTTP mapping

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use netguard_core::DetectorError;
use serde_json::json;
use thiserror::Error;

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Error, Debug)]
pub enum GatewayError {
    /// Request body is not valid JSON for the endpoint
    #[error("invalid JSON body: {0}")]
    BadJson(String),

    /// Well-formed body with a rejected field
    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Detector(#[from] DetectorError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadJson(_) => StatusCode::BAD_REQUEST,
            Self::Validation(_) | Self::Detector(DetectorError::NonFiniteInput { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Detector(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "ok": false,
            "error": self.to_string(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netguard_core::TrainError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(GatewayError::BadJson("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            GatewayError::Validation("host".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );

        let training = GatewayError::from(DetectorError::Training {
            seen: 180,
            source: TrainError::EmptySnapshot,
        });
        assert_eq!(training.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(training.to_string().contains("180"));

        let input = GatewayError::from(DetectorError::NonFiniteInput { feature: "bps_in" });
        assert_eq!(input.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
