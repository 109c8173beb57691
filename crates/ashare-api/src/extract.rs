//! 요청 본문 추출기.

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::ApiError;

/// 선택적 JSON 본문.
///
/// 본문이 비어 있으면 `T::default()`, 해석할 수 없으면 422, 검증에 실패하면 400입니다.
#[derive(Debug, Clone, Default)]
pub struct OptionalJson<T>(pub T);

impl<S, T> FromRequest<S> for OptionalJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Default + Validate + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;

        let value = if bytes.iter().all(u8::is_ascii_whitespace) {
            T::default()
        } else {
            serde_json::from_slice::<T>(&bytes)
                .map_err(|e| ApiError::Unprocessable(format!("Invalid JSON body: {}", e)))?
        };

        value.validate()?;
        Ok(Self(value))
    }
}
