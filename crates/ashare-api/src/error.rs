//! API 응답 봉투와 에러 매핑.
//!
//! 모든 응답은 다음 형식을 따릅니다. `code`는 HTTP 상태 코드와 같습니다.
//!
//! ```json
//! { "code": 200, "message": "success", "data": { ... } }
//! ```
//!
//! 내부 에러(500)는 상세 내용을 로그에만 남기고 본문에는 고정 메시지만 보냅니다.

use ashare_collector::CollectorError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::ValidationErrors;

/// 내부 에러 응답 메시지.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// 공통 응답 봉투.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// HTTP 상태 코드
    pub code: u16,
    /// 결과 메시지
    pub message: String,
    /// 응답 데이터 (에러 시 null)
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 성공 응답.
    pub fn success(data: T) -> Self {
        Self::success_with_message(data, "success")
    }

    /// 메시지를 지정한 200 성공 응답.
    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::OK.as_u16(),
            message: message.into(),
            data: Some(data),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

/// API 에러.
#[derive(Debug, Error)]
pub enum ApiError {
    /// 404
    #[error("{0}")]
    NotFound(String),

    /// 400 (잘못된 파라미터, 검증 실패)
    #[error("{0}")]
    BadRequest(String),

    /// 422 (본문 해석 실패)
    #[error("{0}")]
    Unprocessable(String),

    /// 500. 상세 내용은 로그 전용
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "요청 처리 중 내부 에러");
                INTERNAL_ERROR_MESSAGE.to_string()
            }
            other => other.to_string(),
        };

        let body = ApiResponse::<()> {
            code: status.as_u16(),
            message,
            data: None,
        };
        (status, Json(body)).into_response()
    }
}

impl From<CollectorError> for ApiError {
    fn from(err: CollectorError) -> Self {
        match err {
            CollectorError::NotFound(msg) => ApiError::NotFound(msg),
            CollectorError::InvalidInput(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{}: invalid value", field))
                })
            })
            .collect::<Vec<_>>()
            .join("; ");
        ApiError::BadRequest(message)
    }
}

/// API 핸들러 Result 타입 별칭.
pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let response =
            ApiError::from(CollectorError::Database("relation stock_basic does not exist".into()))
                .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["code"], 500);
        assert_eq!(json["message"], INTERNAL_ERROR_MESSAGE);
        assert!(json["data"].is_null());
    }

    #[tokio::test]
    async fn test_not_found_keeps_message() {
        let response = ApiError::from(CollectorError::NotFound("concept 7 not found".into()))
            .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["code"], 404);
        assert_eq!(json["message"], "concept 7 not found");
    }

    #[test]
    fn test_collector_error_mapping() {
        assert_eq!(
            ApiError::from(CollectorError::InvalidInput("bad".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(CollectorError::Timeout("unit".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_success_envelope() {
        let response = ApiResponse::success(vec![1, 2]).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["code"], 200);
        assert_eq!(json["message"], "success");
        assert_eq!(json["data"], serde_json::json!([1, 2]));
    }
}
