//! 에러 타입 정의.

use ashare_core::SyncError;
use ashare_data::DataError;
use thiserror::Error;

/// Collector 에러 타입.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// 데이터베이스 에러
    #[error("Database error: {0}")]
    Database(String),

    /// 설정 에러
    #[error("Configuration error: {0}")]
    Config(String),

    /// 데이터 소스 에러 (Tushare, AKShare)
    #[error("Data source error: {0}")]
    DataSource(String),

    /// 대상이 없음
    #[error("Not found: {0}")]
    NotFound(String),

    /// 잘못된 입력
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// 단위 작업 시간 초과
    #[error("Timeout: {0}")]
    Timeout(String),

    /// 일반 에러
    #[error("Error: {0}")]
    Other(String),
}

impl From<DataError> for CollectorError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::FetchError(_)
            | DataError::ParseError(_)
            | DataError::InvalidData(_)
            | DataError::SerializationError(_) => Self::DataSource(err.to_string()),
            DataError::NotFound(msg) => Self::NotFound(msg),
            DataError::Timeout(msg) => Self::Timeout(msg),
            other => Self::Database(other.to_string()),
        }
    }
}

impl From<SyncError> for CollectorError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::ExternalService(msg) => Self::DataSource(msg),
            SyncError::NotFound(msg) => Self::NotFound(msg),
            SyncError::InvalidInput(msg) => Self::InvalidInput(msg),
            SyncError::Database(msg) => Self::Database(msg),
            SyncError::Timeout(msg) => Self::Timeout(msg),
            SyncError::Config(msg) => Self::Config(msg),
            SyncError::Internal(msg) => Self::Other(msg),
        }
    }
}

impl From<CollectorError> for SyncError {
    fn from(err: CollectorError) -> Self {
        match err {
            CollectorError::Database(msg) => SyncError::Database(msg),
            CollectorError::Config(msg) => SyncError::Config(msg),
            CollectorError::DataSource(msg) => SyncError::ExternalService(msg),
            CollectorError::NotFound(msg) => SyncError::NotFound(msg),
            CollectorError::InvalidInput(msg) => SyncError::InvalidInput(msg),
            CollectorError::Timeout(msg) => SyncError::Timeout(msg),
            CollectorError::Other(msg) => SyncError::Internal(msg),
        }
    }
}

impl From<sqlx::Error> for CollectorError {
    fn from(err: sqlx::Error) -> Self {
        DataError::from(err).into()
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, CollectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_error_mapping() {
        let err: CollectorError = DataError::FetchError("Tushare API daily error".into()).into();
        assert!(matches!(err, CollectorError::DataSource(_)));

        let err: CollectorError = DataError::PoolExhausted.into();
        assert!(matches!(err, CollectorError::Database(_)));
    }

    #[test]
    fn test_round_trip_to_sync_error() {
        let err: SyncError = CollectorError::NotFound("600000.SH".into()).into();
        assert!(err.is_client_error());

        let err: SyncError = CollectorError::Timeout("unit".into()).into();
        assert!(err.is_retryable());
    }
}
