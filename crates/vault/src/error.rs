//! HTTP mapping for `KeepsakeError`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use keepsake_common::KeepsakeError;
use serde_json::json;

/// Error returned by route handlers
#[derive(Debug)]
pub struct ApiError(pub KeepsakeError);

impl From<KeepsakeError> for ApiError {
    fn from(err: KeepsakeError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = if self.0.is_internal() {
            tracing::error!(status = status.as_u16(), error = %self.0, "Request failed");
            match self.0 {
                KeepsakeError::OracleFailure(_) => {
                    json!({ "error": "The puzzle service is unavailable, please try again" })
                }
                _ => json!({ "error": "Internal server error" }),
            }
        } else {
            match self.0 {
                KeepsakeError::NotYetEligible {
                    unlock_date,
                    days_left,
                } => json!({
                    "error": "Capsule cannot be unlocked yet",
                    "unlockDate": unlock_date,
                    "daysLeft": days_left,
                }),
                KeepsakeError::ContentRejected(reason) => json!({
                    "error": "Content rejected",
                    "reason": reason,
                }),
                KeepsakeError::NotFound => json!({ "error": "Capsule not found" }),
                KeepsakeError::Forbidden(msg)
                | KeepsakeError::BadRequest(msg)
                | KeepsakeError::Unauthorized(msg)
                | KeepsakeError::Conflict(msg)
                | KeepsakeError::RateLimited(msg) => json!({ "error": msg }),
                other => json!({ "error": other.to_string() }),
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_internal_detail_is_hidden() {
        let response = ApiError(KeepsakeError::Store("connection refused at 10.0.0.3".into())).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!body_text(response).await.contains("10.0.0.3"));
    }

    #[tokio::test]
    async fn test_not_yet_eligible_carries_days_left() {
        let response = ApiError(KeepsakeError::NotYetEligible {
            unlock_date: chrono::Utc::now(),
            days_left: 6,
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["daysLeft"], 6);
        assert!(body["unlockDate"].is_string());
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (KeepsakeError::NotFound, StatusCode::NOT_FOUND),
            (KeepsakeError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (KeepsakeError::ContentRejected("thin".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (KeepsakeError::OracleFailure("down".into()), StatusCode::BAD_GATEWAY),
            (KeepsakeError::Conflict("dup".into()), StatusCode::CONFLICT),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).into_response().status(), status);
        }
    }

    #[tokio::test]
    async fn test_oracle_failure_detail_is_hidden() {
        let response = ApiError(KeepsakeError::OracleFailure("401 from api.example.com: bad key sk-123".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["error"], "The puzzle service is unavailable, please try again");
    }

    #[tokio::test]
    async fn test_client_errors_keep_their_message() {
        let response = ApiError(KeepsakeError::BadRequest("Please provide an answer".into())).into_response();
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["error"], "Please provide an answer");
    }
}
