//! 동기화 시스템의 에러 타입.
//!
//! 외부 데이터 소스, 저장소, 설정 단계에서 발생하는 에러를 하나의 분류 체계로 묶습니다.

use thiserror::Error;

/// 동기화 작업 공통 에러.
#[derive(Debug, Error)]
pub enum SyncError {
    /// 외부 데이터 소스(Tushare, AKShare) 호출 또는 응답 파싱 실패
    #[error("외부 서비스 에러: {0}")]
    ExternalService(String),

    /// 대상 엔티티를 찾을 수 없음
    #[error("찾을 수 없음: {0}")]
    NotFound(String),

    /// 잘못된 입력
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),

    /// 데이터베이스 에러
    #[error("데이터베이스 에러: {0}")]
    Database(String),

    /// 단위 작업 시간 초과
    #[error("시간 초과: {0}")]
    Timeout(String),

    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 내부 에러
    #[error("내부 에러: {0}")]
    Internal(String),
}

/// 동기화 작업을 위한 Result 타입.
pub type SyncResult<T> = Result<T, SyncError>;

impl SyncError {
    /// 나중에 재시도할 가치가 있는 에러인지 확인합니다.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::ExternalService(_) | SyncError::Timeout(_) | SyncError::Database(_)
        )
    }

    /// 호출자 입력이 원인인 에러인지 확인합니다.
    pub fn is_client_error(&self) -> bool {
        matches!(self, SyncError::NotFound(_) | SyncError::InvalidInput(_))
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::ExternalService(err.to_string())
    }
}

impl From<config::ConfigError> for SyncError {
    fn from(err: config::ConfigError) -> Self {
        SyncError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_retryable() {
        assert!(SyncError::ExternalService("timeout".to_string()).is_retryable());
        assert!(SyncError::Timeout("unit".to_string()).is_retryable());
        assert!(!SyncError::InvalidInput("bad code".to_string()).is_retryable());
    }

    #[test]
    fn test_error_client() {
        assert!(SyncError::NotFound("concept 1".to_string()).is_client_error());
        assert!(!SyncError::Internal("boom".to_string()).is_client_error());
    }

    #[test]
    fn test_error_display() {
        let err = SyncError::ExternalService("Tushare API daily error".to_string());
        assert_eq!(err.to_string(), "외부 서비스 에러: Tushare API daily error");
    }
}
